//! Aggregator - concurrent provider fan-out and fragment merge
//!
//! One resolution dispatches every provider relevant to the query kind in
//! parallel, each call wrapped in a per-call timeout and a bounded retry
//! (retryable failures only). An outer deadline caps the whole resolution:
//! slots that have not settled when it fires are recorded as timeouts and
//! the result is marked partial.
//!
//! Merge authority is per fragment kind, so two providers never fight over
//! the same field:
//! - indexer owns balances, holdings and approvals
//! - explorer owns transactions, receipts and bytecode facts
//! - registry owns verification status
//!
//! Resolution never returns an error. Every failure degrades the result to
//! `partial = true` with the failure recorded in `provider_errors`.

use chrono::Utc;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::errors::{ProviderError, ProviderErrorKind};
use crate::models::query::AnalysisQuery;
use crate::models::types::{AddressKind, AnalysisResult, SubjectAddress, TxStatus};
use crate::normalizer::{normalize, FragmentData, NormalizedFragment, RawProviderResponse};
use crate::providers::{ProviderId, ProviderSet};
use crate::utils::constants::{MAX_PROVIDER_RETRIES, RETRY_BASE_DELAY_MS, RETRY_JITTER_PERCENT};

/// What one provider slot produced: fragments from its successful calls
/// plus at most one error (the first failure)
struct SlotOutcome {
    provider: ProviderId,
    fragments: Vec<NormalizedFragment>,
    error: Option<ProviderError>,
}

impl SlotOutcome {
    fn ok(provider: ProviderId, fragments: Vec<NormalizedFragment>) -> Self {
        Self {
            provider,
            fragments,
            error: None,
        }
    }

    fn failed(provider: ProviderId, error: ProviderError) -> Self {
        Self {
            provider,
            fragments: Vec::new(),
            error: Some(error),
        }
    }
}

/// Fans one validated query out to its providers and merges the fragments
#[derive(Clone)]
pub struct Aggregator {
    providers: ProviderSet,
    call_timeout: Duration,
    deadline: Duration,
}

impl Aggregator {
    pub fn new(providers: ProviderSet, config: &EngineConfig) -> Self {
        Self {
            providers,
            call_timeout: config.provider_timeout,
            deadline: config.resolution_deadline,
        }
    }

    /// Resolve a query into an analysis result. Infallible by design:
    /// provider failures end up in `provider_errors`, not in a `Result`.
    pub async fn resolve(&self, query: &AnalysisQuery) -> AnalysisResult {
        let (tx, mut rx) = mpsc::channel::<SlotOutcome>(4);
        let mut pending: HashSet<ProviderId> = HashSet::new();

        match *query {
            AnalysisQuery::Address { address, chain_id } => {
                pending.insert(ProviderId::Explorer);
                pending.insert(ProviderId::Indexer);
                pending.insert(ProviderId::Registry);
                self.spawn_bytecode_slot(address, chain_id, tx.clone());
                self.spawn_indexer_slot(address, chain_id, tx.clone());
                self.spawn_registry_slot(address, chain_id, tx.clone());
            }
            AnalysisQuery::Transaction { hash, chain_id } => {
                pending.insert(ProviderId::Explorer);
                self.spawn_transaction_slot(hash, chain_id, tx.clone());
            }
            AnalysisQuery::Contract { address, chain_id } => {
                pending.insert(ProviderId::Explorer);
                pending.insert(ProviderId::Registry);
                self.spawn_bytecode_slot(address, chain_id, tx.clone());
                self.spawn_registry_slot(address, chain_id, tx.clone());
            }
        }
        drop(tx);

        let outcomes = self.collect(&mut rx, pending).await;
        merge(query, outcomes)
    }

    /// Collect slot outcomes until all settle or the outer deadline fires.
    /// Unsettled slots are recorded as timeouts; their detached tasks keep
    /// running but their sends land in a closed channel.
    async fn collect(
        &self,
        rx: &mut mpsc::Receiver<SlotOutcome>,
        mut pending: HashSet<ProviderId>,
    ) -> Vec<SlotOutcome> {
        let mut outcomes = Vec::with_capacity(pending.len());
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        while !pending.is_empty() {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Some(outcome) => {
                            pending.remove(&outcome.provider);
                            outcomes.push(outcome);
                        }
                        None => break,
                    }
                }
                _ = &mut deadline => {
                    warn!(
                        "resolution deadline ({}s) hit with {} slot(s) unsettled",
                        self.deadline.as_secs(),
                        pending.len()
                    );
                    for provider in pending.drain() {
                        outcomes.push(SlotOutcome::failed(
                            provider,
                            ProviderError::new(
                                provider,
                                ProviderErrorKind::Timeout,
                                "Resolution deadline exceeded",
                            ),
                        ));
                    }
                }
            }
        }

        outcomes
    }

    // ============================================
    // SLOT TASKS
    // ============================================

    fn spawn_bytecode_slot(&self, address: alloy_primitives::Address, chain_id: u64, tx: mpsc::Sender<SlotOutcome>) {
        let explorer = self.providers.explorer.clone();
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let provider = ProviderId::Explorer;
            let outcome = match call_with_retry(provider, timeout, || {
                explorer.get_code(address, chain_id)
            })
            .await
            {
                Ok(raw) => normalize_into_slot(provider, RawProviderResponse::Bytecode { raw }),
                Err(err) => SlotOutcome::failed(provider, err),
            };
            let _ = tx.send(outcome).await;
        });
    }

    /// One slot, three indexer calls: balance, holdings, approvals run
    /// concurrently; successes contribute fragments, the first failure
    /// becomes the slot error.
    fn spawn_indexer_slot(&self, address: alloy_primitives::Address, chain_id: u64, tx: mpsc::Sender<SlotOutcome>) {
        let indexer = self.providers.indexer.clone();
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let provider = ProviderId::Indexer;

            let (balance, holdings, approvals) = tokio::join!(
                call_with_retry(provider, timeout, || indexer
                    .get_native_balance(address, chain_id)),
                call_with_retry(provider, timeout, || indexer
                    .get_token_holdings(address, chain_id)),
                call_with_retry(provider, timeout, || indexer
                    .get_token_approvals(address, chain_id)),
            );

            let mut fragments = Vec::new();
            let mut error = None;
            let as_of = Utc::now();

            match balance {
                Ok(raw) => push_fragment(
                    &mut fragments,
                    provider,
                    RawProviderResponse::NativeBalance {
                        address,
                        chain_id,
                        raw,
                    },
                    as_of,
                ),
                Err(err) => error = error.or(Some(err)),
            }
            match holdings {
                Ok(raw) => push_fragment(
                    &mut fragments,
                    provider,
                    RawProviderResponse::TokenBalances { owner: address, raw },
                    as_of,
                ),
                Err(err) => error = error.or(Some(err)),
            }
            match approvals {
                Ok(raw) => push_fragment(
                    &mut fragments,
                    provider,
                    RawProviderResponse::Approvals { raw },
                    as_of,
                ),
                Err(err) => error = error.or(Some(err)),
            }

            let _ = tx
                .send(SlotOutcome {
                    provider,
                    fragments,
                    error,
                })
                .await;
        });
    }

    fn spawn_registry_slot(&self, address: alloy_primitives::Address, chain_id: u64, tx: mpsc::Sender<SlotOutcome>) {
        let registry = self.providers.registry.clone();
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let provider = ProviderId::Registry;
            let outcome = match call_with_retry(provider, timeout, || {
                registry.get_verification(address, chain_id)
            })
            .await
            {
                Ok(raw) => normalize_into_slot(
                    provider,
                    RawProviderResponse::Verification {
                        address,
                        chain_id,
                        raw,
                    },
                ),
                Err(err) => SlotOutcome::failed(provider, err),
            };
            let _ = tx.send(outcome).await;
        });
    }

    /// Transaction slot: envelope then receipt. A missing receipt on a
    /// known transaction means pending, not an error.
    fn spawn_transaction_slot(&self, hash: alloy_primitives::B256, chain_id: u64, tx: mpsc::Sender<SlotOutcome>) {
        let explorer = self.providers.explorer.clone();
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let provider = ProviderId::Explorer;
            let as_of = Utc::now();

            let envelope = call_with_retry(provider, timeout, || {
                explorer.get_transaction(hash, chain_id)
            })
            .await;

            let outcome = match envelope {
                Ok(raw_tx) => {
                    let mut fragments = Vec::new();
                    let mut error = None;
                    push_fragment(
                        &mut fragments,
                        provider,
                        RawProviderResponse::Transaction {
                            chain_id,
                            raw: raw_tx,
                        },
                        as_of,
                    );

                    match call_with_retry(provider, timeout, || {
                        explorer.get_transaction_receipt(hash, chain_id)
                    })
                    .await
                    {
                        Ok(raw) => push_fragment(
                            &mut fragments,
                            provider,
                            RawProviderResponse::Receipt { raw },
                            as_of,
                        ),
                        Err(err) if err.kind == ProviderErrorKind::NotFound => {
                            debug!("receipt not found for {:#x}: pending", hash);
                        }
                        Err(err) => error = Some(err),
                    }

                    SlotOutcome {
                        provider,
                        fragments,
                        error,
                    }
                }
                Err(err) => SlotOutcome::failed(provider, err),
            };
            let _ = tx.send(outcome).await;
        });
    }
}

/// Timeout + bounded-retry wrapper around one provider call. Retries only
/// retryable kinds, with exponential backoff and jitter so synchronized
/// callers don't re-slam a rate-limited provider in lockstep.
pub(crate) async fn call_with_retry<T, F, Fut>(
    provider: ProviderId,
    call_timeout: Duration,
    call: F,
) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match tokio::time::timeout(call_timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => err,
            Err(_) => ProviderError::timeout(provider),
        };

        if attempt >= MAX_PROVIDER_RETRIES || !err.is_retryable() {
            return Err(err);
        }
        attempt += 1;

        let base = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1);
        let jitter_span = base * RETRY_JITTER_PERCENT / 100;
        let delay = base - jitter_span + rand::thread_rng().gen_range(0..=2 * jitter_span);
        debug!(
            "retrying {} after {} (attempt {}/{}, backoff {}ms)",
            provider.as_str(),
            err,
            attempt,
            MAX_PROVIDER_RETRIES,
            delay
        );
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

fn normalize_into_slot(provider: ProviderId, response: RawProviderResponse) -> SlotOutcome {
    let mut fragments = Vec::new();
    push_fragment(&mut fragments, provider, response, Utc::now());
    SlotOutcome::ok(provider, fragments)
}

fn push_fragment(
    fragments: &mut Vec<NormalizedFragment>,
    provider: ProviderId,
    response: RawProviderResponse,
    as_of: chrono::DateTime<Utc>,
) {
    match normalize(provider, response, as_of) {
        Ok(fragment) => fragments.push(fragment),
        Err(err) => warn!("{}", err),
    }
}

// ============================================
// MERGE
// ============================================

/// Merge slot outcomes into one result. Fragment kinds have a single
/// authoritative provider, so merging is assignment. The subject of a
/// transaction query is its sender once the envelope is known.
fn merge(query: &AnalysisQuery, outcomes: Vec<SlotOutcome>) -> AnalysisResult {
    let subject = match *query {
        AnalysisQuery::Address { address, chain_id }
        | AnalysisQuery::Contract { address, chain_id } => SubjectAddress {
            value: address,
            chain_id,
            kind: AddressKind::Unknown,
        },
        AnalysisQuery::Transaction { chain_id, .. } => SubjectAddress {
            value: alloy_primitives::Address::ZERO,
            chain_id,
            kind: AddressKind::Unknown,
        },
    };

    let mut result = AnalysisResult::empty(subject);
    let mut receipt = None;

    for outcome in outcomes {
        if let Some(err) = outcome.error {
            warn!("provider slot failed: {}", err);
            result.provider_errors.push(err);
        }
        for fragment in outcome.fragments {
            match fragment.data {
                FragmentData::NativeBalance(balance) => result.native_balance = Some(balance),
                FragmentData::TokenHoldings(holdings) => result.token_holdings = holdings,
                FragmentData::Approvals(approvals) => result.approvals = approvals,
                FragmentData::Transaction(tx) => result.transaction = Some(tx),
                FragmentData::Receipt {
                    status,
                    gas_used,
                    transfers,
                } => receipt = Some((status, gas_used, transfers)),
                FragmentData::Bytecode { kind, delegation } => {
                    result.subject.kind = kind;
                    result.delegation = delegation;
                }
                FragmentData::Verification(verification) => {
                    result.verification = Some(verification)
                }
            }
        }
    }

    // Receipt facts override the envelope's optimistic status
    if let (Some(tx), Some((status, gas_used, transfers))) =
        (result.transaction.as_mut(), receipt)
    {
        tx.status = status;
        tx.gas_used = gas_used;
        tx.token_transfers = transfers;
    }

    if let Some(tx) = &result.transaction {
        result.subject.value = tx.from;
        // A pending tx keeps the subject unknown; senders of mined txs are
        // EOAs (or 7702-delegated EOAs), never contracts
        if tx.status != TxStatus::Pending {
            result.subject.kind = AddressKind::Wallet;
        }
    }

    result.partial = !result.provider_errors.is_empty();
    result.resolved_at = Utc::now();
    result
}
