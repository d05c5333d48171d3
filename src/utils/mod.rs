pub mod cache;
pub mod constants;
pub mod numeric;
