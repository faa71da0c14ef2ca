use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Token accounting reported by a provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Per-call options handed to [`Provider::spawn`].
#[derive(Clone, Debug, Default)]
pub struct SpawnOptions {
    /// Fully resolved model name.
    pub model: String,
    pub system_prompt: Option<String>,
    /// Overrides [`Provider::timeout`] for this call.
    pub timeout: Option<Duration>,
}

/// Normalized outcome of a provider call.
///
/// `success == false` is a failure the provider reported; faults are
/// returned as [`ProviderError`] instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOutput {
    pub success: bool,
    pub text: String,
    pub cost_usd: f64,
    pub error: Option<String>,
    pub usage: Usage,
    pub duration_ms: u64,
}

impl ProviderOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Anything that can run a prompt to completion: a CLI agent subprocess or
/// a remote API call.
///
/// Implementations must return (or fail) within [`Provider::timeout`]; the
/// registry relies on that to guarantee every invocation completes.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
    fn timeout(&self) -> Duration;

    async fn spawn(&self, prompt: &str, options: &SpawnOptions)
        -> Result<ProviderOutput, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn spawn(
            &self,
            prompt: &str,
            options: &SpawnOptions,
        ) -> Result<ProviderOutput, ProviderError> {
            Ok(ProviderOutput::ok(format!("{}:{prompt}", options.model)))
        }
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let provider: Box<dyn Provider> = Box::new(Echo);
        let options = SpawnOptions {
            model: "echo-1".into(),
            ..Default::default()
        };
        let out = provider.spawn("hi", &options).await.unwrap();
        assert!(out.success);
        assert_eq!(out.text, "echo-1:hi");
    }

    #[test]
    fn output_constructors() {
        let ok = ProviderOutput::ok("done");
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ProviderOutput::failed("exit status 2");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("exit status 2"));
        assert!(failed.text.is_empty());
    }

    #[test]
    fn usage_defaults_missing_fields() {
        let usage: Usage = serde_json::from_str(r#"{"input_tokens": 12}"#).unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 0);
    }
}
