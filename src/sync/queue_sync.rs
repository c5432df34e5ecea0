//! Queue synchronization loop: fetch → present → sleep, forever.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::FetchError;
use crate::queue::PendingQueue;
use crate::remote::TransactionSource;
use crate::triage::TriageEngine;

/// Summary of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Transactions returned by the source.
    pub fetched: usize,
    /// Transactions posted with a fresh machine.
    pub presented: usize,
    /// Still being triaged from an earlier cycle, or already committed.
    pub skipped: usize,
    /// Prompt could not be sent.
    pub failed: usize,
    /// Machines dropped because the source stopped listing their transaction.
    pub retired: usize,
}

pub struct QueueSync {
    source: Arc<dyn TransactionSource>,
    queue: Arc<PendingQueue>,
    engine: Arc<TriageEngine>,
    interval: Duration,
}

impl QueueSync {
    pub fn new(
        source: Arc<dyn TransactionSource>,
        queue: Arc<PendingQueue>,
        engine: Arc<TriageEngine>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            queue,
            engine,
            interval,
        }
    }

    /// Run a single cycle: fetch, replace the working copy, present in order.
    ///
    /// Each prompt send is awaited, but nothing waits on operator input.
    pub async fn run_cycle(&self) -> Result<CycleReport, FetchError> {
        let fetched = self.source.fetch_pending().await?;
        info!(count = fetched.len(), "Total transactions received from edge cache");

        let listed: HashSet<&str> = fetched.iter().map(|t| t.uuid.as_str()).collect();
        let retired = self.engine.retire_missing(&listed).await;

        let mut report = CycleReport {
            fetched: fetched.len(),
            retired,
            ..Default::default()
        };

        let pending = self.queue.replace(fetched).await;
        report.skipped = report.fetched - pending.len();

        for transaction in pending {
            if self.engine.has_live_machine(&transaction.uuid).await {
                debug!(uuid = %transaction.uuid, "Already awaiting operator; not re-presented");
                report.skipped += 1;
                continue;
            }

            let uuid = transaction.uuid.clone();
            match self.engine.present(transaction).await {
                Ok(_) => report.presented += 1,
                Err(e) => {
                    warn!(uuid = %uuid, "Failed to present transaction: {e}");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Spawn the loop. Returns a `JoinHandle` and a shutdown flag, checked
    /// before every cycle.
    pub fn spawn(self: Arc<Self>) -> (JoinHandle<()>, Arc<AtomicBool>) {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            info!(
                "Queue sync started, refreshing every {}s",
                self.interval.as_secs()
            );

            loop {
                if shutdown.load(Ordering::Relaxed) {
                    info!("Queue sync shutting down");
                    return;
                }

                match self.run_cycle().await {
                    Ok(report) => {
                        let machines = self.engine.machine_count().await;
                        debug!(?report, machines, "Sync cycle finished");
                    }
                    Err(e) => error!("Sync cycle aborted: {e}"),
                }

                tokio::time::sleep(self.interval).await;
            }
        });

        (handle, shutdown_flag)
    }
}
