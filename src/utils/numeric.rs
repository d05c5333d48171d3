//! Decimal-safe numeric helpers
//!
//! Raw token amounts are arbitrary-precision integers (U256) end to end.
//! Floating point only appears at the display/USD boundary, and only when
//! the token's decimals are actually known.

use alloy_primitives::U256;

/// Parse a raw integer amount as returned by a provider.
///
/// Accepts decimal strings ("1000000000000000000") and 0x-hex strings
/// ("0xde0b6b3a7640000"). Never goes through f64.
pub fn parse_raw_amount(value: &str) -> Option<U256> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex_part) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        if hex_part.is_empty() {
            // "0x" alone means zero in several explorer responses
            return Some(U256::ZERO);
        }
        return U256::from_str_radix(hex_part, 16).ok();
    }
    U256::from_str_radix(trimmed, 10).ok()
}

/// Format a raw amount with the holding's own decimals, 6 fractional digits.
///
/// 1000000000000000000 @ 18 decimals -> "1.000000"
pub fn format_units(amount: U256, decimals: u8) -> String {
    let scale = U256::from(10).pow(U256::from(decimals as u64));
    if scale.is_zero() {
        return amount.to_string();
    }
    let whole = amount / scale;
    let frac = amount % scale;

    // Scale the remainder to 6 digits without leaving U256 arithmetic
    let micro = frac * U256::from(1_000_000u64) / scale;
    format!("{}.{:06}", whole, micro.to::<u64>())
}

/// Convert a raw amount to an approximate f64 token quantity.
///
/// Display-only. Returns None when decimals are unknown - callers must not
/// substitute a default of 18.
pub fn to_display_amount(amount: U256, decimals: Option<u8>) -> Option<f64> {
    let decimals = decimals?;
    let formatted = format_units(amount, decimals);
    formatted.parse::<f64>().ok()
}

/// USD value of a holding, gated on known decimals.
pub fn usd_value(amount: U256, decimals: Option<u8>, price_usd: Option<f64>) -> Option<f64> {
    let qty = to_display_amount(amount, decimals)?;
    let price = price_usd?;
    Some(qty * price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_amount() {
        assert_eq!(
            parse_raw_amount("1000000000000000000"),
            Some(U256::from(10).pow(U256::from(18)))
        );
        assert_eq!(parse_raw_amount("0"), Some(U256::ZERO));
    }

    #[test]
    fn test_parse_hex_amount() {
        assert_eq!(
            parse_raw_amount("0xde0b6b3a7640000"),
            Some(U256::from(10).pow(U256::from(18)))
        );
        assert_eq!(parse_raw_amount("0x"), Some(U256::ZERO));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_raw_amount(""), None);
        assert_eq!(parse_raw_amount("12.5"), None);
        assert_eq!(parse_raw_amount("0xzz"), None);
    }

    #[test]
    fn test_format_one_ether() {
        let one_eth = U256::from(10).pow(U256::from(18));
        assert_eq!(format_units(one_eth, 18), "1.000000");
    }

    #[test]
    fn test_format_non_standard_decimals() {
        // 1.5 USDC with 6 decimals
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.500000");
        // Same raw value read with 18 decimals would be wildly wrong
        assert_eq!(format_units(U256::from(1_500_000u64), 18), "0.000000");
    }

    #[test]
    fn test_format_huge_supply_no_precision_loss() {
        // 2^200 stays exact in the whole part
        let huge = U256::from(1) << 200usize;
        let formatted = format_units(huge, 18);
        assert!(formatted.ends_with(".993782"));
    }

    #[test]
    fn test_usd_requires_known_decimals() {
        let amount = U256::from(10).pow(U256::from(18));
        assert_eq!(usd_value(amount, None, Some(2000.0)), None);
        assert_eq!(usd_value(amount, Some(18), Some(2000.0)), Some(2000.0));
        assert_eq!(usd_value(amount, Some(18), None), None);
    }
}
