//! RPC method handlers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use fleet_core::ids::InvocationId;

use crate::orchestrator::{Orchestrator, SpawnRequest};
use crate::rpc::{self, RpcResponse};
use crate::wire;

/// Shared state available to all RPC handlers.
pub struct HandlerState {
    pub orchestrator: Arc<Orchestrator>,
    /// Budget for `wait_for_agents` when the caller gives none.
    pub default_wait_timeout: Duration,
    /// Characters of result text kept in wait excerpts.
    pub result_preview_chars: usize,
}

impl HandlerState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            default_wait_timeout: Duration::from_secs(300),
            result_preview_chars: 500,
        }
    }

    pub fn with_wait_defaults(mut self, timeout: Duration, result_preview_chars: usize) -> Self {
        self.default_wait_timeout = timeout;
        self.result_preview_chars = result_preview_chars;
        self
    }
}

/// Dispatch an RPC method to the appropriate handler.
///
/// `spawn_<provider>` is accepted as shorthand for `spawn` with that provider.
pub async fn dispatch(
    state: &Arc<HandlerState>,
    method: &str,
    params: &Value,
    id: Option<Value>,
) -> RpcResponse {
    let params = rpc::normalize_params(params);

    match method {
        "spawn" => spawn(state, None, &params, id),
        "list" => list(state, id),
        "result" => result(state, &params, id),
        "wait_for_agents" => wait_for_agents(state, &params, id).await,
        "providers" => providers(state, id),
        "metrics" => metrics(state, id),
        "health" => health(state, id),
        _ => match method.strip_prefix("spawn_") {
            Some(provider) if state.orchestrator.catalog().contains(provider) => {
                spawn(state, Some(provider), &params, id)
            }
            _ => RpcResponse::method_not_found(id, method),
        },
    }
}

fn spawn(
    state: &Arc<HandlerState>,
    provider: Option<&str>,
    params: &Value,
    id: Option<Value>,
) -> RpcResponse {
    let provider = match provider {
        Some(p) => p,
        None => match rpc::require_str(params, "provider") {
            Ok(p) => p,
            Err(e) => return RpcResponse::invalid_params(id, e),
        },
    };
    let prompt = match rpc::require_str(params, "prompt") {
        Ok(p) => p,
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    let timeout = match rpc::optional_secs(params, "timeout_secs") {
        Ok(t) => t,
        Err(e) => return RpcResponse::invalid_params(id, e),
    };

    let request = SpawnRequest {
        provider: provider.to_owned(),
        prompt: prompt.to_owned(),
        model: rpc::optional_str(params, "model").map(str::to_owned),
        system_prompt: rpc::optional_str(params, "system_prompt").map(str::to_owned),
        timeout,
    };
    match state.orchestrator.start(request) {
        Ok(accepted) => RpcResponse::success(id, wire::spawn_accepted(&accepted)),
        Err(e) => RpcResponse::error(id, e.rpc_code(), e.to_string()),
    }
}

fn list(state: &Arc<HandlerState>, id: Option<Value>) -> RpcResponse {
    let (running, completed_ids) = state.orchestrator.list();
    RpcResponse::success(id, wire::listing(&running, &completed_ids))
}

fn result(state: &Arc<HandlerState>, params: &Value, id: Option<Value>) -> RpcResponse {
    let agent_id = match rpc::require_str(params, "agent_id") {
        Ok(s) => s,
        Err(e) => return RpcResponse::invalid_params(id, e),
    };
    let status = state.orchestrator.result(&InvocationId::from_raw(agent_id));
    RpcResponse::success(id, wire::status(agent_id, &status))
}

async fn wait_for_agents(state: &Arc<HandlerState>, params: &Value, id: Option<Value>) -> RpcResponse {
    let timeout = match rpc::optional_secs(params, "timeout") {
        Ok(t) => t.unwrap_or(state.default_wait_timeout),
        Err(e) => return RpcResponse::invalid_params(id, e),
    };

    let outcome = state.orchestrator.wait_for_all(timeout).await;
    RpcResponse::success(id, wire::wait_outcome(&outcome, state.result_preview_chars))
}

fn providers(state: &Arc<HandlerState>, id: Option<Value>) -> RpcResponse {
    let info = state.orchestrator.catalog().info();
    RpcResponse::success(id, json!({ "providers": info }))
}

fn metrics(state: &Arc<HandlerState>, id: Option<Value>) -> RpcResponse {
    let samples = state
        .orchestrator
        .metrics()
        .map(|m| m.snapshot())
        .unwrap_or_default();
    RpcResponse::success(id, json!({ "metrics": samples }))
}

fn health(state: &Arc<HandlerState>, id: Option<Value>) -> RpcResponse {
    let registry = state.orchestrator.registry();
    RpcResponse::success(
        id,
        json!({
            "status": "healthy",
            "running": registry.running_count(),
            "completed": registry.completed_count(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::test_support::orchestrator_with;
    use fleet_providers::{MockProvider, MockResponse};

    fn state(providers: Vec<MockProvider>) -> Arc<HandlerState> {
        Arc::new(HandlerState::new(Arc::new(orchestrator_with(providers))))
    }

    fn claude(responses: Vec<MockResponse>) -> MockProvider {
        MockProvider::named("claude", responses)
    }

    #[tokio::test]
    async fn unknown_method() {
        let state = state(vec![]);
        let resp = dispatch(&state, "spawn_llama", &json!({}), Some(json!(1))).await;
        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, "METHOD_NOT_FOUND");
    }

    #[tokio::test]
    async fn spawn_requires_prompt() {
        let state = state(vec![claude(vec![])]);
        let resp = dispatch(&state, "spawn", &json!({"provider": "claude"}), None).await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, "INVALID_PARAMS");
        assert!(err.message.contains("prompt"));
        assert_eq!(state.orchestrator.registry().running_count(), 0);
    }

    #[tokio::test]
    async fn spawn_unknown_provider_is_invalid_params() {
        let state = state(vec![]);
        let resp = dispatch(
            &state,
            "spawn",
            &json!({"provider": "mistral", "prompt": "hi"}),
            None,
        )
        .await;
        assert_eq!(resp.error.unwrap().code, "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn spawn_shorthand_then_result_then_wait() {
        let state = state(vec![claude(vec![MockResponse::delayed(
            Duration::from_millis(10),
            MockResponse::text("all good"),
        )])]);

        let resp = dispatch(&state, "spawn_claude", &json!({"prompt": "check"}), Some(json!(7))).await;
        assert!(resp.success);
        assert_eq!(resp.id, Some(json!(7)));
        let accepted = resp.result.unwrap();
        assert_eq!(accepted["status"], "running");
        assert_eq!(accepted["agent_type"], "claude");
        let agent_id = accepted["agent_id"].as_str().unwrap().to_owned();

        let resp = dispatch(&state, "result", &json!({"agentId": agent_id}), None).await;
        assert_eq!(resp.result.unwrap()["status"], "running");

        let resp = dispatch(&state, "wait_for_agents", &json!({"timeout": 5}), None).await;
        let body = resp.result.unwrap();
        assert_eq!(body["status"], "all_completed");
        assert_eq!(body["results"][0]["result"], "all good");

        let resp = dispatch(&state, "result", &json!({"agent_id": agent_id}), None).await;
        let body = resp.result.unwrap();
        assert_eq!(body["status"], "completed");
        assert_eq!(body["result"], "all good");
    }

    #[tokio::test]
    async fn result_not_found() {
        let state = state(vec![]);
        let resp = dispatch(&state, "result", &json!({"agent_id": "inv_nope"}), None).await;
        let body = resp.result.unwrap();
        assert_eq!(body["status"], "not_found");
        assert_eq!(body["agent_id"], "inv_nope");
    }

    #[tokio::test]
    async fn result_requires_agent_id() {
        let state = state(vec![]);
        let resp = dispatch(&state, "result", &json!({}), None).await;
        assert_eq!(resp.error.unwrap().code, "INVALID_PARAMS");
    }

    #[tokio::test]
    async fn wait_with_nothing_running() {
        let state = state(vec![]);
        let resp = dispatch(&state, "wait_for_agents", &json!({}), None).await;
        let body = resp.result.unwrap();
        assert_eq!(body["status"], "no_agents_running");
        assert_eq!(body["recent_results"], json!([]));
    }

    #[tokio::test]
    async fn wait_rejects_negative_timeout() {
        let state = state(vec![]);
        let resp = dispatch(&state, "wait_for_agents", &json!({"timeout": -3}), None).await;
        assert_eq!(resp.error.unwrap().code, "INVALID_PARAMS");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_with_partial_results() {
        let state = state(vec![claude(vec![
            MockResponse::text("quick"),
            MockResponse::delayed(Duration::from_secs(60), MockResponse::text("slow")),
        ])]);
        let _ = dispatch(&state, "spawn", &json!({"provider": "claude", "prompt": "a"}), None).await;
        let slow = dispatch(&state, "spawn", &json!({"provider": "claude", "prompt": "b"}), None)
            .await
            .result
            .unwrap();

        let resp = dispatch(&state, "wait_for_agents", &json!({"timeout": 1}), None).await;
        let body = resp.result.unwrap();
        assert_eq!(body["status"], "timeout");
        assert_eq!(body["still_running"], json!([slow["agent_id"]]));
        assert_eq!(body["completed_results"][0]["result"], "quick");
    }

    #[tokio::test]
    async fn list_and_providers() {
        let state = state(vec![claude(vec![MockResponse::delayed(
            Duration::from_secs(60),
            MockResponse::text("slow"),
        )])]);
        let _ = dispatch(&state, "spawn", &json!({"provider": "claude", "prompt": "p"}), None).await;

        let body = dispatch(&state, "list", &json!({}), None).await.result.unwrap();
        assert_eq!(body["running"].as_array().unwrap().len(), 1);
        assert_eq!(body["running"][0]["type"], "claude");
        assert_eq!(body["completed_ids"], json!([]));

        let body = dispatch(&state, "providers", &json!({}), None).await.result.unwrap();
        assert_eq!(body["providers"][0]["name"], "claude");
        assert_eq!(body["providers"][0]["default_model"], "mock-model");

        let body = dispatch(&state, "metrics", &json!({}), None).await.result.unwrap();
        assert!(body["metrics"]
            .as_array()
            .unwrap()
            .iter()
            .any(|m| m["name"] == "invocations_started_total"));
    }
}
