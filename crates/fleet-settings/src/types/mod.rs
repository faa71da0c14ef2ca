//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial JSON file only needs the keys it changes.

mod providers;

pub use providers::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FleetSettings {
    pub registry: RegistrySettings,
    pub wait: WaitSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    /// Provider name → command template.
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl FleetSettings {
    /// Reject values the runtime cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_completed == 0 {
            return Err(SettingsError::InvalidValue(
                "registry.maxCompleted must be at least 1".into(),
            ));
        }
        for (name, provider) in &self.providers {
            if provider.command.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!(
                    "providers.{name}.command must not be empty"
                )));
            }
            if provider.timeout_secs == 0 {
                return Err(SettingsError::InvalidValue(format!(
                    "providers.{name}.timeoutSecs must be at least 1"
                )));
            }
        }
        Ok(())
    }
}

/// Invocation registry limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Completed records retained before the oldest are evicted.
    pub max_completed: usize,
    /// Completed ids reported by `list`.
    pub recent_ids_limit: usize,
    /// Completed records returned when `wait_for_agents` finds nothing running.
    pub recent_results_limit: usize,
    /// Characters of the prompt kept as the task preview.
    pub task_preview_chars: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_completed: 100,
            recent_ids_limit: 3,
            recent_results_limit: 5,
            task_preview_chars: 100,
        }
    }
}

/// `wait_for_agents` behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitSettings {
    /// Budget used when the caller does not pass a timeout.
    pub default_timeout_secs: u64,
    /// Result text kept per record in `no_agents_running` summaries.
    pub result_preview_chars: usize,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: 300,
            result_preview_chars: 500,
        }
    }
}

/// Transport settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address for the HTTP transport; stdio only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_addr: Option<String>,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level filter (`RUST_LOG` takes precedence).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: FleetSettings =
            serde_json::from_str(r#"{"registry": {"maxCompleted": 7}}"#).unwrap();
        assert_eq!(settings.registry.max_completed, 7);
        assert_eq!(settings.registry.recent_ids_limit, 3);
        assert_eq!(settings.wait.default_timeout_secs, 300);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(FleetSettings::default()).unwrap();
        assert_eq!(json["registry"]["maxCompleted"], 100);
        assert_eq!(json["wait"]["defaultTimeoutSecs"], 300);
        assert!(json["server"].get("httpAddr").is_none());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut settings = FleetSettings::default();
        settings.registry.max_completed = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn empty_provider_command_rejected() {
        let mut settings = FleetSettings::default();
        let _ = settings.providers.insert(
            "broken".into(),
            ProviderSettings {
                command: "  ".into(),
                ..Default::default()
            },
        );
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("providers.broken.command"));
    }
}
