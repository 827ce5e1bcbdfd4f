use bucketsync_core::{SyncAction, SyncDirection, SyncPlan, TransferOutcome, TransferResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub path: String,
    pub cause: String,
}

/// Final account of one run, printed as a summary and optionally saved as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub direction: SyncDirection,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Successful transfers, overwrites included.
    pub transferred: u64,
    pub overwritten: u64,
    pub skipped: u64,
    pub failed: u64,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub failures: Vec<TransferFailure>,
}

impl SyncReport {
    pub fn new(plan: &SyncPlan, results: &[TransferResult], started_at: DateTime<Utc>) -> Self {
        let mut transferred = 0;
        let mut overwritten = 0;
        let mut bytes_transferred = 0;
        let mut failures = Vec::new();

        for res in results {
            match &res.outcome {
                TransferOutcome::Success => {
                    transferred += 1;
                    bytes_transferred += res.action.size();
                    if matches!(res.action, SyncAction::Overwrite { .. }) {
                        overwritten += 1;
                    }
                }
                TransferOutcome::Failed(cause) => failures.push(TransferFailure {
                    path: res.action.path().to_string(),
                    cause: cause.clone(),
                }),
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            run_id: Uuid::new_v4(),
            direction: plan.direction,
            started_at,
            finished_at: Utc::now(),
            transferred,
            overwritten,
            skipped: plan.skip_count() as u64,
            failed: failures.len() as u64,
            bytes_transferred,
            total_bytes: plan.total_bytes(),
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// `"2 uploaded, 0 skipped, 0 failed"`
    pub fn summary_line(&self) -> String {
        format!(
            "{} {}, {} skipped, {} failed",
            self.transferred,
            self.direction.verb(),
            self.skipped,
            self.failed
        )
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary_line())?;
        for failure in &self.failures {
            write!(f, "\n  failed: {}: {}", failure.path, failure.cause)?;
        }
        Ok(())
    }
}
