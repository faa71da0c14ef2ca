//! Invocation lifecycle types shared by the registry and its front-ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::ids::InvocationId;
use crate::provider::{ProviderOutput, Usage};

/// A tracked invocation that has been started and not yet completed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub id: InvocationId,
    /// Provider type tag, e.g. `claude` or `grok`.
    pub provider: String,
    pub model: String,
    /// Single-line, truncated preview of the prompt.
    pub task: String,
    pub started_at: DateTime<Utc>,
}

impl Invocation {
    /// Whole seconds elapsed between `started_at` and `now`, never negative.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }
}

/// Data handed to `register_complete`.
///
/// The optional descriptive fields are backfilled from the running entry
/// when the invocation is still tracked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub success: bool,
    pub text: String,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub usage: Usage,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub task: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl CompletionPayload {
    pub fn from_output(output: ProviderOutput) -> Self {
        Self {
            success: output.success,
            text: output.text,
            cost_usd: output.cost_usd,
            duration_ms: output.duration_ms,
            error: output.error,
            usage: output.usage,
            ..Default::default()
        }
    }

    /// Failed payload for a provider call that faulted instead of returning.
    pub fn from_fault(err: &ProviderError, duration_ms: u64) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            duration_ms,
            ..Default::default()
        }
    }
}

/// Final, immutable outcome of an invocation as retained in history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: InvocationId,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub task: Option<String>,
    pub success: bool,
    pub result: String,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub usage: Usage,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    /// Build a record from a payload, filling gaps from the running entry.
    pub fn assemble(
        id: InvocationId,
        mut payload: CompletionPayload,
        running: Option<Invocation>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        if let Some(info) = running {
            payload.provider.get_or_insert(info.provider);
            payload.model.get_or_insert(info.model);
            payload.task.get_or_insert(info.task);
            payload.started_at.get_or_insert(info.started_at);
        }
        Self {
            id,
            provider: payload.provider,
            model: payload.model,
            task: payload.task,
            success: payload.success,
            result: payload.text,
            cost_usd: round_cost(payload.cost_usd),
            duration_ms: payload.duration_ms,
            error: payload.error,
            usage: payload.usage,
            started_at: payload.started_at,
            completed_at,
        }
    }
}

fn round_cost(cost: f64) -> f64 {
    (cost * 10_000.0).round() / 10_000.0
}
