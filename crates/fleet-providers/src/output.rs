//! Interpreting provider stdout.

use fleet_core::errors::ProviderError;
use fleet_core::provider::{ProviderOutput, Usage};
use serde::Deserialize;

/// Result object printed by CLIs running in JSON mode.
#[derive(Debug, Deserialize)]
struct JsonResult {
    #[serde(alias = "text")]
    result: Option<String>,
    #[serde(alias = "cost_usd")]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    is_error: bool,
    subtype: Option<String>,
    error: Option<String>,
}

/// Parse a JSON result object from stdout.
///
/// Accepts either the whole stdout as one document or, for CLIs that emit
/// event lines, the last line that parses as a result object.
pub(crate) fn parse_json_result(stdout: &str) -> Result<ProviderOutput, ProviderError> {
    let parsed = serde_json::from_str::<JsonResult>(stdout.trim()).or_else(|first| {
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .find_map(|line| serde_json::from_str::<JsonResult>(line).ok())
            .ok_or(first)
    });
    let parsed = parsed.map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let success = !parsed.is_error
        && parsed.error.is_none()
        && parsed.subtype.as_deref().map_or(true, |s| s == "success");
    let text = parsed.result.unwrap_or_default();
    let error = match (success, parsed.error) {
        (true, _) => None,
        (false, Some(err)) => Some(err),
        (false, None) if !text.is_empty() => Some(text.clone()),
        (false, None) => Some(format!(
            "provider reported failure ({})",
            parsed.subtype.as_deref().unwrap_or("error")
        )),
    };

    Ok(ProviderOutput {
        success,
        text,
        cost_usd: parsed.total_cost_usd.unwrap_or(0.0),
        error,
        usage: parsed.usage,
        duration_ms: 0,
    })
}
