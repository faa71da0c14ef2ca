use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fleet_core::errors::ProviderError;
use fleet_core::provider::{Provider, ProviderOutput, SpawnOptions};

/// Pre-programmed responses for deterministic testing without processes.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Successful output with this text.
    Text(String),
    /// Reported failure with this error message.
    Fail(String),
    /// Return this error from `spawn`.
    Fault(ProviderError),
    /// Panic inside `spawn` with this message.
    Panic(String),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    /// Convenience: wrap any response with a delay.
    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// A call observed by the mock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockCall {
    pub prompt: String,
    pub model: String,
}

/// Mock provider that returns pre-programmed responses in sequence.
pub struct MockProvider {
    name: String,
    default_model: String,
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<MockCall>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self::named("mock", responses)
    }

    pub fn named(name: &str, responses: Vec<MockResponse>) -> Self {
        Self {
            name: name.to_string(),
            default_model: "mock-model".to_string(),
            responses,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = model.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(600)
    }

    async fn spawn(
        &self,
        prompt: &str,
        options: &SpawnOptions,
    ) -> Result<ProviderOutput, ProviderError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().push(MockCall {
            prompt: prompt.to_string(),
            model: options.model.clone(),
        });

        let Some(response) = self.responses.get(idx).cloned() else {
            return Err(ProviderError::NotConfigured(format!(
                "MockProvider: no response configured for call {idx}"
            )));
        };

        resolve_response(response).await
    }
}

/// Resolve a MockResponse, handling Delay by sleeping first.
/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: MockResponse) -> Result<ProviderOutput, ProviderError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => return Ok(ProviderOutput::ok(text)),
            MockResponse::Fail(error) => return Ok(ProviderOutput::failed(error)),
            MockResponse::Fault(e) => return Err(e),
            MockResponse::Panic(message) => panic!("{message}"),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
