pub mod errors;
pub mod ids;
pub mod invocation;
pub mod provider;
pub mod text;
