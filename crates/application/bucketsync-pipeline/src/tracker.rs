use bucketsync_core::SyncPlan;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::sync::TransferEvent;

#[derive(Debug, Clone)]
pub struct ActiveTransfer {
    pub id: usize,
    pub path: String,
    pub total_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct TransferSnapshot {
    pub total_files: u64,
    pub completed_files: u64,
    pub total_bytes: u64,
    pub completed_bytes: u64,
    pub skipped_count: u64,
    pub failed_count: u64,
    pub speed_bps: u64,
    pub in_flight: Vec<ActiveTransfer>,
}

impl TransferSnapshot {
    pub fn is_done(&self) -> bool {
        self.completed_files >= self.total_files
    }
}

/// Folds scheduler events into cumulative totals against the plan's precomputed totals.
pub struct ProgressTracker {
    in_flight: HashMap<usize, ActiveTransfer>,
    completed_files: u64,
    completed_bytes: u64,
    skipped_count: u64,
    failed_count: u64,
    total_files: u64,
    total_bytes: u64,
    last_tick: Instant,
    bytes_since_last_tick: u64,
    speed_bps: u64,
    history: VecDeque<u64>,
}

impl ProgressTracker {
    pub fn new(plan: &SyncPlan) -> Self {
        Self {
            in_flight: HashMap::new(),
            completed_files: 0,
            completed_bytes: 0,
            skipped_count: 0,
            failed_count: 0,
            total_files: plan.total_files(),
            total_bytes: plan.total_bytes(),
            last_tick: Instant::now(),
            bytes_since_last_tick: 0,
            speed_bps: 0,
            history: VecDeque::new(),
        }
    }

    pub fn update(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Started { id, path, bytes } => {
                self.in_flight.insert(
                    id,
                    ActiveTransfer {
                        id,
                        path,
                        total_bytes: bytes,
                    },
                );
            }
            TransferEvent::Completed { id, bytes, success } => {
                self.in_flight.remove(&id);
                self.completed_files += 1;
                self.completed_bytes += bytes;
                if success {
                    self.bytes_since_last_tick += bytes;
                } else {
                    self.failed_count += 1;
                }
            }
            TransferEvent::Skipped { bytes, .. } => {
                self.completed_files += 1;
                self.completed_bytes += bytes;
                self.skipped_count += 1;
            }
        }
    }

    pub fn get_snapshot(&mut self) -> TransferSnapshot {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();

        if elapsed >= 0.5 {
            let current_bps = (self.bytes_since_last_tick as f64 / elapsed) as u64;
            self.history.push_back(current_bps);
            if self.history.len() > 5 {
                self.history.pop_front();
            }
            self.speed_bps =
                (self.history.iter().sum::<u64>() as f64 / self.history.len() as f64) as u64;
            self.last_tick = now;
            self.bytes_since_last_tick = 0;
        }

        let mut in_flight: Vec<ActiveTransfer> = self.in_flight.values().cloned().collect();
        in_flight.sort_by_key(|t| t.id);

        TransferSnapshot {
            total_files: self.total_files,
            completed_files: self.completed_files,
            total_bytes: self.total_bytes,
            completed_bytes: self.completed_bytes,
            skipped_count: self.skipped_count,
            failed_count: self.failed_count,
            speed_bps: self.speed_bps,
            in_flight,
        }
    }
}
