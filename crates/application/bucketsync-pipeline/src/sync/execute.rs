use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bucketsync_core::{SyncAction, SyncPlan, TransferOutcome, TransferResult};
use bucketsync_infra::ObjectStore;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started { id: usize, path: String, bytes: u64 },
    Completed { id: usize, bytes: u64, success: bool },
    Skipped { id: usize, bytes: u64 },
}

/// Completion counters shared by every worker of a run. Each action bumps them
/// exactly once, when it reaches a terminal outcome.
#[derive(Debug, Default)]
pub struct TransferCounters {
    files_done: AtomicU64,
    bytes_done: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub files_done: u64,
    pub bytes_done: u64,
    pub failed: u64,
}

impl TransferCounters {
    fn record(&self, bytes: u64, success: bool) {
        self.files_done.fetch_add(1, Ordering::SeqCst);
        self.bytes_done.fetch_add(bytes, Ordering::SeqCst);
        if !success {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            files_done: self.files_done.load(Ordering::SeqCst),
            bytes_done: self.bytes_done.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug)]
pub struct ExecutionOutcome {
    /// One entry per non-skip action, in completion order.
    pub results: Vec<TransferResult>,
    pub counters: CounterSnapshot,
}

/// Runs the transfers of a plan with at most `max_workers` in flight.
///
/// A failed transfer is recorded and the rest keep going; `run` always drains
/// the whole plan.
pub struct TransferScheduler {
    store: Arc<dyn ObjectStore>,
    max_workers: usize,
    counters: Arc<TransferCounters>,
}

impl TransferScheduler {
    pub fn new(store: Arc<dyn ObjectStore>, max_workers: usize) -> Self {
        Self {
            store,
            max_workers: max_workers.max(1),
            counters: Arc::new(TransferCounters::default()),
        }
    }

    /// Live view of the counters, readable while `run` is in progress.
    pub fn counters(&self) -> Arc<TransferCounters> {
        self.counters.clone()
    }

    pub async fn run(
        &self,
        plan: &SyncPlan,
        progress_tx: Option<Sender<TransferEvent>>,
    ) -> ExecutionOutcome {
        // Skips need no I/O; account for them up front.
        for (id, action) in plan.actions.iter().enumerate() {
            if action.is_skip() {
                self.counters.record(action.size(), true);
                emit(
                    &progress_tx,
                    TransferEvent::Skipped {
                        id,
                        bytes: action.size(),
                    },
                )
                .await;
            }
        }

        debug!(
            "scheduling {} transfers with {} workers",
            plan.transfer_count(),
            self.max_workers
        );

        let jobs: Vec<(usize, SyncAction)> = plan
            .actions
            .iter()
            .enumerate()
            .filter(|(_, action)| !action.is_skip())
            .map(|(id, action)| (id, action.clone()))
            .collect();

        let results: Vec<TransferResult> = stream::iter(jobs)
            .map(|(id, action)| {
                let tx = progress_tx.clone();
                async move { self.transfer_one(id, action, tx).await }
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        ExecutionOutcome {
            results,
            counters: self.counters.snapshot(),
        }
    }

    async fn transfer_one(
        &self,
        id: usize,
        action: SyncAction,
        tx: Option<Sender<TransferEvent>>,
    ) -> TransferResult {
        let bytes = action.size();
        emit(
            &tx,
            TransferEvent::Started {
                id,
                path: action.path().to_string(),
                bytes,
            },
        )
        .await;

        let res = match &action {
            SyncAction::Upload { file, key } | SyncAction::Overwrite { file, key, .. } => {
                self.store.put(key, &file.abs_path).await
            }
            SyncAction::Download { object, target, .. } => {
                self.store.get(&object.key, target).await
            }
            SyncAction::Skip { .. } => Ok(0),
        };

        let outcome = match res {
            Ok(written) => {
                debug!("transferred {} ({written} bytes)", action.path());
                TransferOutcome::Success
            }
            Err(e) => {
                warn!("transfer failed for {}: {e}", action.path());
                TransferOutcome::Failed(e.to_string())
            }
        };

        let success = outcome == TransferOutcome::Success;
        self.counters.record(bytes, success);
        emit(&tx, TransferEvent::Completed { id, bytes, success }).await;

        TransferResult { action, outcome }
    }
}

async fn emit(tx: &Option<Sender<TransferEvent>>, event: TransferEvent) {
    if let Some(t) = tx {
        let _ = t.send(event).await;
    }
}
