//! Request/response envelope shared by the stdio and HTTP transports.
//!
//! Requests: `{ method, params?, id? }`.
//! Responses: `{ id, success, result?, error?: { code, message } }` where
//! `code` is a symbolic string such as `INVALID_PARAMS`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: String,
    pub message: String,
}

// JSON-RPC numeric codes, used internally for routing
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Map numeric error codes to the string codes on the wire.
pub fn error_code_to_string(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "PARSE_ERROR",
        INVALID_REQUEST => "INVALID_REQUEST",
        METHOD_NOT_FOUND => "METHOD_NOT_FOUND",
        INVALID_PARAMS => "INVALID_PARAMS",
        INTERNAL_ERROR => "INTERNAL_ERROR",
        _ => "UNKNOWN_ERROR",
    }
}

impl RpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(RpcError {
                code: error_code_to_string(code).to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, INVALID_PARAMS, msg)
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::error(None, PARSE_ERROR, format!("Parse error: {detail}"))
    }
}

/// Parse one raw request. Failures come back as a ready-to-send response.
pub fn parse_request(raw: &str) -> Result<RpcRequest, RpcResponse> {
    serde_json::from_str(raw).map_err(RpcResponse::parse_error)
}

/// camelCase spellings accepted for snake_case params.
const CAMEL_TO_SNAKE: &[(&str, &str)] = &[
    ("agentId", "agent_id"),
    ("systemPrompt", "system_prompt"),
    ("timeoutSecs", "timeout_secs"),
];

/// Rewrite camelCase keys to snake_case. An existing snake_case key wins.
pub fn normalize_params(params: &Value) -> Value {
    let Some(obj) = params.as_object() else {
        return params.clone();
    };
    let mut result = obj.clone();
    for &(camel, snake) in CAMEL_TO_SNAKE {
        if let Some(val) = result.remove(camel) {
            if !result.contains_key(snake) {
                let _ = result.insert(snake.to_string(), val);
            }
        }
    }
    Value::Object(result)
}

/// Extract a required, non-empty string param.
pub fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required parameter: {key}"))
}

/// Extract an optional string param. Empty strings count as absent.
pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// Extract an optional non-negative number. Present but invalid is an error.
pub fn optional_f64(params: &Value, key: &str) -> Result<Option<f64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(Some)
            .ok_or_else(|| format!("Parameter {key} must be a non-negative number")),
    }
}

/// Extract an optional duration given in (fractional) seconds.
pub fn optional_secs(params: &Value, key: &str) -> Result<Option<Duration>, String> {
    optional_f64(params, key)?
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(|e| format!("Parameter {key}: {e}")))
        .transpose()
}
