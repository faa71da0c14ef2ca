use std::time::Duration;

/// Faults raised by a provider call, as opposed to failures the provider
/// reports in a well-formed [`ProviderOutput`](crate::provider::ProviderOutput).
#[derive(Clone, Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to launch provider process: {0}")]
    Spawn(String),
    #[error("provider i/o error: {0}")]
    Io(String),
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("provider panicked: {0}")]
    Panicked(String),
}

impl ProviderError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Spawn(_) => "spawn",
            Self::Io(_) => "io",
            Self::Timeout(_) => "timeout",
            Self::Network(_) => "network",
            Self::MalformedResponse(_) => "malformed_response",
            Self::NotConfigured(_) => "not_configured",
            Self::Panicked(_) => "panicked",
        }
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
