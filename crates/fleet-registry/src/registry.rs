use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use fleet_core::ids::InvocationId;
use fleet_core::invocation::{CompletionPayload, CompletionRecord, Invocation};
use fleet_core::text::task_preview;

use crate::history::CompletedHistory;
use crate::signal::CompletionSignal;

/// Tunables for an [`InvocationRegistry`].
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Maximum number of completed records retained.
    pub max_completed: usize,
    /// Characters of the prompt kept as the task preview.
    pub task_preview_chars: usize,
    /// Completed ids reported alongside the running listing.
    pub recent_ids_limit: usize,
    /// Completed records returned by `wait_for_all` when nothing is running.
    pub recent_results_limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_completed: 100,
            task_preview_chars: 100,
            recent_ids_limit: 3,
            recent_results_limit: 5,
        }
    }
}

/// How a `register_complete` call was admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    /// The invocation was running and moved to completed.
    Tracked,
    /// The id was unknown; the record was admitted from the payload alone.
    Untracked,
    /// The id had already completed; its record was overwritten.
    Duplicate,
}

/// Point-in-time view of a running invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunningEntry {
    pub id: InvocationId,
    pub provider: String,
    pub model: String,
    pub task: String,
    pub elapsed_seconds: u64,
}

/// Result of looking an id up in both sets.
#[derive(Clone, Debug, PartialEq)]
pub enum InvocationStatus {
    Completed(CompletionRecord),
    Running(RunningEntry),
    NotFound,
}

struct RegistryState {
    running: HashMap<InvocationId, Invocation>,
    completed: CompletedHistory,
    signals: HashMap<InvocationId, CompletionSignal>,
}

/// Shared table of running and recently completed invocations.
///
/// Every operation takes one short critical section over in-memory maps;
/// nothing performs I/O or calls a provider while the lock is held.
pub struct InvocationRegistry {
    state: Mutex<RegistryState>,
    config: RegistryConfig,
}

impl InvocationRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                running: HashMap::new(),
                completed: CompletedHistory::new(config.max_completed),
                signals: HashMap::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Track a new invocation as running and return its fresh id.
    pub fn register_start(&self, provider: &str, model: &str, task: &str) -> InvocationId {
        let id = InvocationId::new();
        let invocation = Invocation {
            id: id.clone(),
            provider: provider.to_owned(),
            model: model.to_owned(),
            task: task_preview(task, self.config.task_preview_chars),
            started_at: Utc::now(),
        };

        {
            let mut state = self.state.lock();
            let _ = state.running.insert(id.clone(), invocation);
            let _ = state.signals.insert(id.clone(), CompletionSignal::new());
        }

        debug!(invocation_id = %id, provider, model, "invocation started");
        id
    }

    /// Move an invocation to completed and fire its completion signal.
    ///
    /// Within one critical section the record is admitted, the signal
    /// fires, then evicted signals are dropped, so a waiter that sees the signal will
    /// find the record on its next read. Completing an id twice overwrites
    /// the record without firing again.
    pub fn register_complete(&self, id: &InvocationId, payload: CompletionPayload) -> CompletionKind {
        let (kind, evicted) = {
            let mut state = self.state.lock();
            let running = state.running.remove(id);
            let kind = match (&running, state.completed.contains(id)) {
                (Some(_), _) => CompletionKind::Tracked,
                (None, true) => CompletionKind::Duplicate,
                (None, false) => CompletionKind::Untracked,
            };

            let record = CompletionRecord::assemble(id.clone(), payload, running, Utc::now());
            let evicted = state.completed.insert(record);
            // Fire before dropping evicted signals: with no history capacity
            // the new record evicts itself.
            if let Some(signal) = state.signals.get(id) {
                let _ = signal.fire();
            }
            for old in &evicted {
                let _ = state.signals.remove(old);
            }
            (kind, evicted)
        };

        match kind {
            CompletionKind::Tracked => debug!(invocation_id = %id, "invocation completed"),
            CompletionKind::Duplicate => {
                warn!(invocation_id = %id, "duplicate completion, record overwritten")
            }
            CompletionKind::Untracked => {
                warn!(invocation_id = %id, "completion for untracked invocation admitted")
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "pruned completed history");
        }
        kind
    }

    /// Copy of every running invocation with its elapsed time.
    pub fn get_running_snapshot(&self) -> Vec<RunningEntry> {
        let running: Vec<Invocation> = self.state.lock().running.values().cloned().collect();
        let now = Utc::now();
        let mut entries: Vec<RunningEntry> = running
            .into_iter()
            .map(|info| running_entry(info, now))
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn get_result(&self, id: &InvocationId) -> Option<CompletionRecord> {
        self.state.lock().completed.get(id).cloned()
    }

    pub fn get_running_info(&self, id: &InvocationId) -> Option<Invocation> {
        self.state.lock().running.get(id).cloned()
    }

    /// Look an id up in both sets with a single lock acquisition.
    pub fn status(&self, id: &InvocationId) -> InvocationStatus {
        let (completed, running) = {
            let state = self.state.lock();
            (state.completed.get(id).cloned(), state.running.get(id).cloned())
        };
        match (completed, running) {
            (Some(record), _) => InvocationStatus::Completed(record),
            (None, Some(info)) => InvocationStatus::Running(running_entry(info, Utc::now())),
            (None, None) => InvocationStatus::NotFound,
        }
    }

    /// The last `limit` completed ids in completion order.
    pub fn get_recent_completed_ids(&self, limit: usize) -> Vec<InvocationId> {
        self.state.lock().completed.recent_ids(limit)
    }

    /// The last `limit` completed records in completion order.
    pub fn recent_completed(&self, limit: usize) -> Vec<CompletionRecord> {
        self.state.lock().completed.recent(limit)
    }

    pub fn running_count(&self) -> usize {
        self.state.lock().running.len()
    }

    pub fn completed_count(&self) -> usize {
        self.state.lock().completed.len()
    }

    /// Atomically capture the running ids and their signals.
    pub(crate) fn snapshot_waiters(&self) -> Vec<(InvocationId, Option<CompletionSignal>)> {
        let state = self.state.lock();
        let mut waiters: Vec<_> = state
            .running
            .keys()
            .map(|id| (id.clone(), state.signals.get(id).cloned()))
            .collect();
        waiters.sort_by(|a, b| a.0.cmp(&b.0));
        waiters
    }

    /// Partition `ids` into completed records and ids still running. Ids
    /// found in neither set are omitted.
    pub(crate) fn partition(
        &self,
        ids: &[InvocationId],
    ) -> (Vec<CompletionRecord>, Vec<InvocationId>, usize) {
        let state = self.state.lock();
        let mut completed = Vec::new();
        let mut still_running = Vec::new();
        let mut missing = 0;
        for id in ids {
            if let Some(record) = state.completed.get(id) {
                completed.push(record.clone());
            } else if state.running.contains_key(id) {
                still_running.push(id.clone());
            } else {
                missing += 1;
            }
        }
        (completed, still_running, missing)
    }
}

impl Default for InvocationRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

fn running_entry(info: Invocation, now: chrono::DateTime<Utc>) -> RunningEntry {
    let elapsed_seconds = info.elapsed_seconds(now);
    RunningEntry {
        id: info.id,
        provider: info.provider,
        model: info.model,
        task: info.task,
        elapsed_seconds,
    }
}
