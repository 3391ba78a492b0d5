//! Dispatcher - 1 回の pass で due なレコードを処理する
//!
//! # フロー（レコードごと）
//! 1. processor を registry で解決（未登録ならスキップ、試行に数えない）
//! 2. ストアで claim（lease 取得）。取れなければ他の pass に任せる
//! 3. processor 実行 → 成功なら delete / 失敗なら RetryPolicy に従う
//!
//! 試行は JoinSet で並行実行し、pass は全試行の完了を待ってから summary を返す。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::config::DispatchConfig;
use crate::domain::{
    AttemptOutcome, AttemptReport, PassId, PassSummary, ProcessingFailure, RetryDecision,
    RetryPolicy, StoredMessage,
};
use crate::ports::{Clock, IdGenerator, MessageStore};
use crate::processor::{Processor, ProcessorRegistry};

/// Runs worker passes over the due set.
pub struct Dispatcher {
    store: Arc<dyn MessageStore>,
    registry: Arc<ProcessorRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: RetryPolicy,
    lease_ms: u64,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn MessageStore>,
        registry: Arc<ProcessorRegistry>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            ids,
            policy: RetryPolicy::new(config.default_retry_limit),
            lease_ms: config.lease_ms,
            max_in_flight: config.max_in_flight.max(1),
        }
    }

    /// Run one pass over the records due now.
    ///
    /// Returns only after every attempt launched by this pass, including its
    /// store write, has finished.
    pub async fn run_pass(&self) -> PassSummary {
        let pass_id = self.ids.generate_pass_id();
        let span = tracing::info_span!("pass", pass = %pass_id);
        self.run_pass_as(pass_id).instrument(span).await
    }

    async fn run_pass_as(&self, pass_id: PassId) -> PassSummary {
        let now = self.clock.timestamp();
        let limiter = Arc::new(Semaphore::new(self.max_in_flight));
        let mut in_flight: JoinSet<AttemptReport> = JoinSet::new();
        let mut summary = PassSummary::default();

        let mut due = self.store.due(now);
        while let Some(item) = due.next().await {
            let record = match item {
                Ok(record) => record,
                Err(err) => {
                    tracing::error!(error = %err, "due-set query failed; ending selection");
                    summary.store_failures += 1;
                    break;
                }
            };

            let Some(processor) = self.registry.resolve(record.message.processor_name()) else {
                // Handler not deployed (yet): not an attempt, stays due.
                tracing::debug!(
                    record = %record.id,
                    processor = %record.message.processor,
                    "no processor registered; leaving message due"
                );
                summary.skipped += 1;
                continue;
            };

            let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                break;
            };
            while let Some(joined) = in_flight.try_join_next() {
                collect(&mut summary, joined);
            }

            let Some(claimed) = self.claim(pass_id, &record, &mut summary).await else {
                continue;
            };

            let attempt = Attempt {
                pass_id,
                record: claimed,
                processor,
                store: Arc::clone(&self.store),
                clock: Arc::clone(&self.clock),
                policy: self.policy,
            };
            in_flight.spawn(
                async move {
                    let _permit = permit;
                    attempt.run().await
                }
                .in_current_span(),
            );
        }
        drop(due);

        while let Some(joined) = in_flight.join_next().await {
            collect(&mut summary, joined);
        }

        tracing::info!(
            processed = summary.processed,
            errors = summary.errors,
            rescheduled = summary.rescheduled,
            dropped = summary.dropped,
            skipped = summary.skipped,
            contended = summary.contended,
            store_failures = summary.store_failures,
            "finished processing queue"
        );
        summary
    }

    /// Conditional claim; `None` means "do not attempt this record".
    async fn claim(
        &self,
        pass_id: PassId,
        record: &StoredMessage,
        summary: &mut PassSummary,
    ) -> Option<StoredMessage> {
        let now = self.clock.timestamp();
        let until = now.plus_millis(self.lease_ms);
        match self.store.claim(record.id, pass_id, now, until).await {
            Ok(Some(claimed)) => Some(claimed),
            Ok(None) => {
                tracing::debug!(record = %record.id, "message claimed elsewhere or gone");
                summary.contended += 1;
                None
            }
            Err(err) => {
                tracing::error!(record = %record.id, error = %err, "claim failed");
                summary.store_failures += 1;
                None
            }
        }
    }
}

fn collect(summary: &mut PassSummary, joined: Result<AttemptReport, JoinError>) {
    match joined {
        Ok(report) => summary.record(report),
        Err(err) => {
            // Outcome unknown; the record keeps its last committed state.
            tracing::error!(error = %err, "attempt task did not complete");
            summary.errors += 1;
        }
    }
}

/// One claimed record on its way through a processor.
struct Attempt {
    pass_id: PassId,
    record: StoredMessage,
    processor: Arc<dyn Processor>,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl Attempt {
    async fn run(self) -> AttemptReport {
        let Attempt {
            pass_id,
            record,
            processor,
            store,
            clock,
            policy,
        } = self;
        let id = record.id;
        let retry_limit = record.message.retry_limit;
        let attempt = record.message.next_attempt();
        let limit = policy.limit_for(retry_limit);

        tracing::debug!(
            record = %id,
            processor = %record.message.processor_name(),
            attempt,
            limit,
            "processing message"
        );

        // A panic inside the processor counts as a failed attempt.
        let result = AssertUnwindSafe(processor.process(record.message))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProcessingFailure::from_panic(&*panic)));

        let failure = match result {
            Ok(_) => {
                let store_failed = store
                    .delete(id, pass_id)
                    .await
                    .inspect_err(|err| {
                        tracing::error!(record = %id, error = %err, "ack delete failed")
                    })
                    .is_err();
                return AttemptReport {
                    outcome: AttemptOutcome::Completed,
                    store_failed,
                };
            }
            Err(failure) => failure,
        };

        match policy.decide(retry_limit, attempt) {
            RetryDecision::Reschedule { attempt_count } => {
                tracing::warn!(
                    record = %id,
                    error = %failure,
                    "retry {attempt_count}/{limit} failed; attempting again on next run"
                );
                let store_failed = store
                    .reschedule(id, pass_id, attempt_count, clock.timestamp())
                    .await
                    .inspect_err(|err| {
                        tracing::error!(record = %id, error = %err, "reschedule failed")
                    })
                    .is_err();
                AttemptReport {
                    outcome: AttemptOutcome::Rescheduled,
                    store_failed,
                }
            }
            RetryDecision::Drop => {
                tracing::error!(
                    record = %id,
                    error = %failure,
                    attempts = attempt,
                    "message exceeded the retry threshold; dropping"
                );
                let store_failed = store
                    .delete(id, pass_id)
                    .await
                    .inspect_err(|err| {
                        tracing::error!(record = %id, error = %err, "drop delete failed")
                    })
                    .is_err();
                AttemptReport {
                    outcome: AttemptOutcome::Dropped,
                    store_failed,
                }
            }
        }
    }
}
