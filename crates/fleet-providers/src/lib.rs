pub mod catalog;
pub mod command;
pub mod mock;
mod output;

pub use catalog::{ProviderCatalog, ProviderInfo};
pub use command::CommandProvider;
pub use mock::{MockCall, MockProvider, MockResponse};
