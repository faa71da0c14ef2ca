//! Tool-call wire shapes for registry data.
//!
//! Listing and waiting return compact objects so a calling agent spends
//! little context on them; full records are only returned by `result`.

use serde_json::{json, Value};

use fleet_core::ids::InvocationId;
use fleet_core::invocation::CompletionRecord;
use fleet_core::text::truncate_chars;
use fleet_registry::{InvocationStatus, RunningEntry, WaitOutcome};

use crate::orchestrator::SpawnAccepted;

pub fn spawn_accepted(accepted: &SpawnAccepted) -> Value {
    json!({
        "agent_id": accepted.id,
        "agent_type": accepted.provider,
        "model": accepted.model,
        "status": accepted.status,
        "message": "Agent spawned. Use 'list' to monitor, 'result' to get output.",
    })
}

pub fn listing(running: &[RunningEntry], completed_ids: &[InvocationId]) -> Value {
    let running: Vec<Value> = running
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "sec": entry.elapsed_seconds,
                "type": entry.provider,
            })
        })
        .collect();
    json!({
        "running": running,
        "completed_ids": completed_ids,
        "tip": "Use wait_for_agents() to block until done and get all results",
    })
}

pub fn status(id: &str, status: &InvocationStatus) -> Value {
    match status {
        InvocationStatus::Completed(record) => record_json(record),
        InvocationStatus::Running(entry) => json!({
            "agent_id": id,
            "status": "running",
            "elapsed_seconds": entry.elapsed_seconds,
            "message": "Agent still running. Check back later.",
        }),
        InvocationStatus::NotFound => json!({
            "agent_id": id,
            "status": "not_found",
            "message": "No agent found with this ID.",
        }),
    }
}

fn record_json(record: &CompletionRecord) -> Value {
    let mut value = serde_json::to_value(record).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut value {
        let _ = map.insert("agent_id".into(), json!(record.id));
        let _ = map.insert("agent_type".into(), json!(record.provider));
        let _ = map.insert("status".into(), json!("completed"));
    }
    value
}

/// Result excerpt used where many records are returned at once.
fn excerpt(record: &CompletionRecord, preview_chars: usize) -> Value {
    json!({
        "id": record.id,
        "success": record.success,
        "result": truncate_chars(&record.result, preview_chars),
    })
}

pub fn wait_outcome(outcome: &WaitOutcome, preview_chars: usize) -> Value {
    match outcome {
        WaitOutcome::NoAgentsRunning { recent_results } => json!({
            "status": outcome.status(),
            "recent_results": recent_results
                .iter()
                .map(|r| excerpt(r, preview_chars))
                .collect::<Vec<_>>(),
        }),
        WaitOutcome::AllCompleted {
            elapsed_seconds,
            results,
        } => json!({
            "status": outcome.status(),
            "elapsed_seconds": elapsed_seconds,
            "results": results
                .iter()
                .map(|r| json!({
                    "id": r.id,
                    "type": r.provider,
                    "success": r.success,
                    "result": r.result,
                    "error": r.error,
                    "cost_usd": r.cost_usd,
                }))
                .collect::<Vec<_>>(),
        }),
        WaitOutcome::Timeout {
            elapsed_seconds,
            still_running,
            completed_results,
        } => json!({
            "status": outcome.status(),
            "elapsed_seconds": elapsed_seconds,
            "still_running": still_running,
            "completed_results": completed_results
                .iter()
                .map(|r| excerpt(r, preview_chars))
                .collect::<Vec<_>>(),
        }),
    }
}
