use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a provider's stdout is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Stdout is the answer text.
    #[default]
    Text,
    /// Stdout is one JSON result object carrying text, cost and usage.
    Json,
}

/// A subprocess provider described as a command template.
///
/// `{model}` in `args` is replaced with the resolved model name. When an
/// argument contains `{prompt}` the prompt is substituted there; otherwise
/// it is written to the child's stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Hard limit for one call; the child is killed when it is exceeded.
    pub timeout_secs: u64,
    pub default_model: String,
    pub output: OutputFormat,
    /// Short alias → full model name.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            working_directory: None,
            timeout_secs: 600,
            default_model: String::new(),
            output: OutputFormat::Text,
            aliases: BTreeMap::new(),
        }
    }
}
