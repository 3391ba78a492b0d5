use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::Dispatcher;
use crate::config::WorkerConfig;
use crate::domain::PassSummary;

/// What the worker has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerProgress {
    /// Passes started (finished or timed out).
    pub passes: u64,
    pub timed_out: u64,
    pub last: Option<PassSummary>,
}

/// Periodic trigger handle.
/// - `request_shutdown()` stops scheduling new passes
/// - `shutdown_and_join()` additionally waits for the running pass to end
pub struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    progress_rx: watch::Receiver<WorkerProgress>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn the trigger loop: one pass per `interval`, first one immediately.
    pub fn spawn(dispatcher: Arc<Dispatcher>, config: &WorkerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (progress_tx, progress_rx) = watch::channel(WorkerProgress::default());

        let interval = config.interval();
        let pass_timeout = config.pass_timeout();
        let join = tokio::spawn(async move {
            worker_loop(dispatcher, interval, pass_timeout, shutdown_rx, progress_tx).await;
        });

        Self {
            shutdown_tx,
            progress_rx,
            join,
        }
    }

    pub fn progress(&self) -> watch::Receiver<WorkerProgress> {
        self.progress_rx.clone()
    }

    /// Request shutdown. A pass already running is not interrupted.
    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for the loop (and its current pass) to finish.
    pub async fn shutdown_and_join(self) -> WorkerProgress {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "worker loop terminated abnormally");
        }
        *self.progress_rx.borrow()
    }
}

async fn worker_loop(
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    pass_timeout: Option<Duration>,
    mut shutdown_rx: watch::Receiver<bool>,
    progress_tx: watch::Sender<WorkerProgress>,
) {
    let mut ticker = tokio::time::interval(interval);
    // passes never overlap within one worker; late ticks are dropped
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        let pass = dispatcher.run_pass();
        let summary = match pass_timeout {
            Some(limit) => match tokio::time::timeout(limit, pass).await {
                Ok(summary) => Some(summary),
                Err(_) => {
                    // Dropping the pass aborts its attempts; their records
                    // come back once their leases expire.
                    tracing::warn!(
                        timeout_ms = limit.as_millis() as u64,
                        "pass exceeded its deadline"
                    );
                    None
                }
            },
            None => Some(pass.await),
        };

        progress_tx.send_modify(|progress| {
            progress.passes += 1;
            match summary {
                Some(summary) => progress.last = Some(summary),
                None => progress.timed_out += 1,
            }
        });
    }

    tracing::info!("worker stopped");
}
