/// Errors surfaced by the orchestration front before an invocation is
/// registered. Once registered, every outcome is reported as a record.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl OrchestratorError {
    /// RPC error code for this error.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::UnknownProvider(_) | Self::InvalidRequest(_) => crate::rpc::INVALID_PARAMS,
        }
    }
}
