use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use fleet_core::ids::InvocationId;
use fleet_core::invocation::CompletionRecord;

use crate::registry::InvocationRegistry;

/// Outcome of [`InvocationRegistry::wait_for_all`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WaitOutcome {
    /// Nothing was running at call time; carries the most recent records.
    NoAgentsRunning { recent_results: Vec<CompletionRecord> },
    /// Every invocation running at call time completed within the budget.
    AllCompleted {
        elapsed_seconds: f64,
        results: Vec<CompletionRecord>,
    },
    /// The budget ran out first. Partial results are kept.
    Timeout {
        elapsed_seconds: f64,
        still_running: Vec<InvocationId>,
        completed_results: Vec<CompletionRecord>,
    },
}

impl WaitOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoAgentsRunning { .. } => "no_agents_running",
            Self::AllCompleted { .. } => "all_completed",
            Self::Timeout { .. } => "timeout",
        }
    }
}

impl InvocationRegistry {
    /// Block until every invocation running at call time has completed, or
    /// until `timeout` elapses.
    ///
    /// Signals are awaited one after another against a shrinking budget;
    /// once the budget is spent no further signal is awaited. The registry
    /// is then re-read so results reflect what actually completed.
    pub async fn wait_for_all(&self, timeout: Duration) -> WaitOutcome {
        let waiters = self.snapshot_waiters();
        if waiters.is_empty() {
            return WaitOutcome::NoAgentsRunning {
                recent_results: self.recent_completed(self.config().recent_results_limit),
            };
        }

        let start = Instant::now();
        let mut remaining = timeout;
        for (_, signal) in &waiters {
            if remaining.is_zero() {
                break;
            }
            let Some(signal) = signal else { continue };
            if signal.wait_timeout(remaining).await {
                remaining = timeout.saturating_sub(start.elapsed());
            } else {
                remaining = Duration::ZERO;
            }
        }
        let elapsed_seconds = round_millis(start.elapsed());

        let ids: Vec<InvocationId> = waiters.into_iter().map(|(id, _)| id).collect();
        let (completed, still_running, missing) = self.partition(&ids);
        if missing > 0 {
            debug!(missing, "awaited invocations already pruned from history");
        }

        if still_running.is_empty() {
            WaitOutcome::AllCompleted {
                elapsed_seconds,
                results: completed,
            }
        } else {
            WaitOutcome::Timeout {
                elapsed_seconds,
                still_running,
                completed_results: completed,
            }
        }
    }
}

fn round_millis(elapsed: Duration) -> f64 {
    elapsed.as_millis() as f64 / 1000.0
}
