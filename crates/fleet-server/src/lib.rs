//! Orchestration front and transports for the invocation registry.

pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod rpc;
pub mod server;
pub mod stdio;
pub mod wire;

pub use error::OrchestratorError;
pub use handlers::HandlerState;
pub use orchestrator::{Orchestrator, SpawnAccepted, SpawnRequest};
pub use server::{ServerConfig, ServerHandle};
