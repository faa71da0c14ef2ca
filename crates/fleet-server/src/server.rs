use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, HandlerState};
use crate::rpc;

/// HTTP transport configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9091".into(),
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<HandlerState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve in the background.
pub async fn start(
    config: ServerConfig,
    state: Arc<HandlerState>,
) -> Result<ServerHandle, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    let local_addr = listener.local_addr()?;
    let router = build_router(state);

    tracing::info!(addr = %local_addr, "HTTP transport listening");

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP transport stopped");
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        server,
    })
}

/// Handle returned by `start()`. Dropping it leaves the server running.
pub struct ServerHandle {
    pub addr: SocketAddr,
    server: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn shutdown(self) {
        self.server.abort();
    }
}

async fn rpc_handler(State(state): State<Arc<HandlerState>>, body: String) -> impl IntoResponse {
    let request = match rpc::parse_request(&body) {
        Ok(req) => req,
        Err(resp) => return (StatusCode::BAD_REQUEST, Json(resp)),
    };
    let params = request.params.unwrap_or_else(|| serde_json::json!({}));
    let response = handlers::dispatch(&state, &request.method, &params, request.id).await;
    (StatusCode::OK, Json(response))
}

async fn health_handler(State(state): State<Arc<HandlerState>>) -> impl IntoResponse {
    let resp = handlers::dispatch(&state, "health", &serde_json::json!({}), None).await;
    (StatusCode::OK, Json(resp.result.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use fleet_providers::{MockProvider, MockResponse};

    use crate::orchestrator::test_support::orchestrator_with;

    fn router() -> Router {
        let orchestrator =
            orchestrator_with(vec![MockProvider::named("claude", vec![MockResponse::text("hi")])]);
        build_router(Arc::new(HandlerState::new(Arc::new(orchestrator))))
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn rpc_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/rpc")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let resp = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["running"], 0);
    }

    #[tokio::test]
    async fn rpc_dispatches() {
        let resp = router()
            .oneshot(rpc_request(r#"{"method":"list","id":"a"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["id"], "a");
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["running"], json!([]));
    }

    #[tokio::test]
    async fn rpc_parse_error_is_bad_request() {
        let resp = router().oneshot(rpc_request("{oops")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["code"], "PARSE_ERROR");
    }

    #[tokio::test]
    async fn server_binds_ephemeral_port() {
        let orchestrator = orchestrator_with(vec![]);
        let state = Arc::new(HandlerState::new(Arc::new(orchestrator)));
        let handle = start(
            ServerConfig {
                addr: "127.0.0.1:0".into(),
            },
            state,
        )
        .await
        .unwrap();
        assert!(handle.addr.port() > 0);
        handle.shutdown();
    }
}
