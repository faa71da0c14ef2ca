//! Orchestration front: turns spawn requests into tracked background calls.
//!
//! `start` registers the invocation and returns at once; the provider call
//! runs on its own task and always ends in exactly one `register_complete`,
//! whether the provider returned, reported failure, faulted or panicked.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use tracing::{info, warn};

use fleet_core::errors::ProviderError;
use fleet_core::ids::InvocationId;
use fleet_core::invocation::CompletionPayload;
use fleet_core::provider::{Provider, SpawnOptions};
use fleet_providers::ProviderCatalog;
use fleet_registry::{InvocationRegistry, InvocationStatus, RunningEntry, WaitOutcome};
use fleet_telemetry::MetricsRecorder;

use crate::error::OrchestratorError;

/// Parameters for starting an invocation.
#[derive(Clone, Debug, Default)]
pub struct SpawnRequest {
    pub provider: String,
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub timeout: Option<Duration>,
}

/// Returned as soon as an invocation is registered.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpawnAccepted {
    pub id: InvocationId,
    pub provider: String,
    pub model: String,
    pub status: &'static str,
}

pub struct Orchestrator {
    registry: Arc<InvocationRegistry>,
    catalog: Arc<ProviderCatalog>,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<InvocationRegistry>,
        catalog: ProviderCatalog,
        metrics: Option<Arc<MetricsRecorder>>,
    ) -> Self {
        Self {
            registry,
            catalog: Arc::new(catalog),
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<InvocationRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsRecorder>> {
        self.metrics.as_ref()
    }

    /// Register an invocation and launch its provider call in the background.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&self, request: SpawnRequest) -> Result<SpawnAccepted, OrchestratorError> {
        let provider = self
            .catalog
            .get(&request.provider)
            .ok_or_else(|| OrchestratorError::UnknownProvider(request.provider.clone()))?;
        if request.prompt.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("prompt must not be empty".into()));
        }

        let model = self
            .catalog
            .resolve_model(&request.provider, request.model.as_deref())
            .unwrap_or_else(|| provider.default_model().to_owned());
        let id = self
            .registry
            .register_start(&request.provider, &model, &request.prompt);

        if let Some(metrics) = &self.metrics {
            metrics.counter_inc(
                "invocations_started_total",
                &[("provider", request.provider.as_str())],
                1,
            );
            metrics.gauge_inc("invocations_running", &[], 1.0);
        }

        let options = SpawnOptions {
            model: model.clone(),
            system_prompt: request.system_prompt,
            timeout: request.timeout,
        };
        let _ = tokio::spawn(run_invocation(
            Arc::clone(&self.registry),
            self.metrics.clone(),
            provider,
            id.clone(),
            request.prompt,
            options,
        ));

        info!(invocation_id = %id, provider = %request.provider, %model, "invocation accepted");
        Ok(SpawnAccepted {
            id,
            provider: request.provider,
            model,
            status: "running",
        })
    }

    pub fn list(&self) -> (Vec<RunningEntry>, Vec<InvocationId>) {
        let limit = self.registry.config().recent_ids_limit;
        (
            self.registry.get_running_snapshot(),
            self.registry.get_recent_completed_ids(limit),
        )
    }

    pub fn result(&self, id: &InvocationId) -> InvocationStatus {
        self.registry.status(id)
    }

    pub async fn wait_for_all(&self, timeout: Duration) -> WaitOutcome {
        self.registry.wait_for_all(timeout).await
    }
}

/// Body of the per-invocation worker task.
async fn run_invocation(
    registry: Arc<InvocationRegistry>,
    metrics: Option<Arc<MetricsRecorder>>,
    provider: Arc<dyn Provider>,
    id: InvocationId,
    prompt: String,
    options: SpawnOptions,
) {
    let started = Instant::now();
    let outcome = AssertUnwindSafe(provider.spawn(&prompt, &options))
        .catch_unwind()
        .await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let provider_name = provider.name().to_owned();

    let (payload, fault) = match outcome {
        Ok(Ok(mut output)) => {
            if output.duration_ms == 0 {
                output.duration_ms = elapsed_ms;
            }
            (CompletionPayload::from_output(output), None)
        }
        Ok(Err(err)) => (CompletionPayload::from_fault(&err, elapsed_ms), Some(err)),
        Err(panic) => {
            let err = ProviderError::Panicked(panic_message(panic.as_ref()));
            (CompletionPayload::from_fault(&err, elapsed_ms), Some(err))
        }
    };
    if let Some(err) = &fault {
        warn!(
            invocation_id = %id,
            provider = %provider_name,
            kind = err.error_kind(),
            error = %err,
            "provider call faulted"
        );
    }
    let success = payload.success;
    let duration_ms = payload.duration_ms;

    let _ = registry.register_complete(&id, payload);

    if let Some(metrics) = metrics {
        let provider_label = provider_name.as_str();
        match &fault {
            Some(err) => metrics.counter_inc(
                "invocations_faulted_total",
                &[("provider", provider_label), ("kind", err.error_kind())],
                1,
            ),
            None => metrics.counter_inc(
                "invocations_completed_total",
                &[
                    ("provider", provider_label),
                    ("success", if success { "true" } else { "false" }),
                ],
                1,
            ),
        }
        metrics.gauge_inc("invocations_running", &[], -1.0);
        metrics.histogram_observe(
            "invocation_duration_ms",
            &[("provider", provider_label)],
            duration_ms as f64,
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_owned()
    }
}
