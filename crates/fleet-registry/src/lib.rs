//! In-process invocation registry.
//!
//! Tracks every started invocation until it completes, keeps a bounded
//! history of completed records, and lets callers block until everything
//! currently running has finished.

pub mod history;
pub mod registry;
pub mod signal;
pub mod wait;

pub use history::CompletedHistory;
pub use registry::{
    CompletionKind, InvocationRegistry, InvocationStatus, RegistryConfig, RunningEntry,
};
pub use signal::CompletionSignal;
pub use wait::WaitOutcome;
