use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use fleet_core::errors::ProviderError;
use fleet_core::provider::{Provider, ProviderOutput, SpawnOptions};
use fleet_core::text::tail_chars;
use fleet_settings::{OutputFormat, ProviderSettings};

use crate::output::parse_json_result;

const MODEL_PLACEHOLDER: &str = "{model}";
const PROMPT_PLACEHOLDER: &str = "{prompt}";
const STDERR_TAIL_CHARS: usize = 2_000;

/// Runs one external CLI per call, configured by a [`ProviderSettings`]
/// command template.
pub struct CommandProvider {
    name: String,
    settings: ProviderSettings,
}

impl CommandProvider {
    pub fn new(name: impl Into<String>, settings: ProviderSettings) -> Self {
        Self {
            name: name.into(),
            settings,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Expand the argument template. Returns the arguments and the text to
    /// write on stdin, if the prompt was not placed in an argument.
    fn build_invocation(&self, prompt: &str, options: &SpawnOptions) -> (Vec<String>, Option<String>) {
        let full_prompt = match options.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_owned(),
        };
        let prompt_in_args = self
            .settings
            .args
            .iter()
            .any(|arg| arg.contains(PROMPT_PLACEHOLDER));

        let args = self
            .settings
            .args
            .iter()
            .map(|arg| {
                let arg = arg.replace(MODEL_PLACEHOLDER, &options.model);
                if prompt_in_args {
                    arg.replace(PROMPT_PLACEHOLDER, &full_prompt)
                } else {
                    arg
                }
            })
            .collect();

        (args, (!prompt_in_args).then_some(full_prompt))
    }
}

#[async_trait]
impl Provider for CommandProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.settings.default_model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }

    async fn spawn(
        &self,
        prompt: &str,
        options: &SpawnOptions,
    ) -> Result<ProviderOutput, ProviderError> {
        let start = Instant::now();
        let timeout = options.timeout.unwrap_or_else(|| self.timeout());
        let (args, stdin_text) = self.build_invocation(prompt, options);

        let mut command = tokio::process::Command::new(&self.settings.command);
        let _ = command
            .args(&args)
            .stdin(if stdin_text.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.settings.working_directory {
            let _ = command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ProviderError::Spawn(format!("{}: {e}", self.settings.command)))?;
        debug!(provider = %self.name, model = %options.model, pid = ?child.id(), "provider process started");

        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(mut stdin), Some(text)) = (stdin, stdin_text) {
                stdin.write_all(text.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let run = async move {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            if let Err(e) = fed {
                // The child may exit without reading its input.
                debug!(error = %e, "provider stdin closed early");
            }
            output
        };

        // Dropping `run` on timeout drops the child, which kills it.
        let output = tokio::time::timeout(timeout, run)
            .await
            .map_err(|_| ProviderError::Timeout(timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut result = if output.status.success() {
            match self.settings.output {
                OutputFormat::Text => ProviderOutput::ok(stdout.trim_end()),
                OutputFormat::Json => parse_json_result(&stdout)?,
            }
        } else {
            let exit = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let tail = tail_chars(stderr.trim_end(), STDERR_TAIL_CHARS);
            let mut failed = if tail.is_empty() {
                ProviderOutput::failed(format!("exit code {exit}"))
            } else {
                ProviderOutput::failed(format!("exit code {exit}: {tail}"))
            };
            failed.text = stdout.trim_end().to_owned();
            failed
        };
        result.duration_ms = duration_ms;
        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProviderSettings {
        ProviderSettings {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            timeout_secs: 10,
            default_model: "m1".into(),
            ..Default::default()
        }
    }

    fn opts(model: &str) -> SpawnOptions {
        SpawnOptions {
            model: model.into(),
            ..Default::default()
        }
    }

    #[test]
    fn placeholders_expanded() {
        let provider = CommandProvider::new(
            "cli",
            ProviderSettings {
                command: "cli".into(),
                args: vec!["-m".into(), "{model}".into(), "--ask={prompt}".into()],
                ..Default::default()
            },
        );
        let (args, stdin) = provider.build_invocation("hello", &opts("big"));
        assert_eq!(args, vec!["-m", "big", "--ask=hello"]);
        assert!(stdin.is_none());
    }

    #[test]
    fn prompt_goes_to_stdin_without_placeholder() {
        let provider = CommandProvider::new("cli", sh("cat"));
        let options = SpawnOptions {
            model: "m".into(),
            system_prompt: Some("be brief".into()),
            timeout: None,
        };
        let (args, stdin) = provider.build_invocation("hello", &options);
        assert_eq!(args, vec!["-c", "cat"]);
        assert_eq!(stdin.as_deref(), Some("be brief\n\nhello"));
    }

    #[tokio::test]
    async fn stdout_becomes_text() {
        let provider = CommandProvider::new("cli", sh("cat"));
        let out = provider.spawn("echo me", &opts("m1")).await.unwrap();
        assert!(out.success);
        assert_eq!(out.text, "echo me");
        assert!(out.error.is_none());
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_failure() {
        let provider = CommandProvider::new("cli", sh("echo partial; echo 'quota exceeded' >&2; exit 3"));
        let out = provider.spawn("x", &opts("m1")).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.text, "partial");
        assert_eq!(out.error.as_deref(), Some("exit code 3: quota exceeded"));
    }

    #[tokio::test]
    async fn json_output_parsed() {
        let mut settings = sh(r#"echo '{"result":"ok","total_cost_usd":0.25}'"#);
        settings.output = OutputFormat::Json;
        let provider = CommandProvider::new("cli", settings);
        let out = provider.spawn("x", &opts("m1")).await.unwrap();
        assert!(out.success);
        assert_eq!(out.text, "ok");
        assert_eq!(out.cost_usd, 0.25);
    }

    #[tokio::test]
    async fn timeout_kills_and_faults() {
        let provider = CommandProvider::new("cli", sh("sleep 30"));
        let options = SpawnOptions {
            model: "m1".into(),
            system_prompt: None,
            timeout: Some(Duration::from_millis(100)),
        };
        let started = Instant::now();
        let err = provider.spawn("x", &options).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(d) if d == Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_fault() {
        let provider = CommandProvider::new(
            "ghost",
            ProviderSettings {
                command: "/nonexistent/fleet-provider-binary".into(),
                ..Default::default()
            },
        );
        let err = provider.spawn("x", &opts("m1")).await.unwrap_err();
        assert_eq!(err.error_kind(), "spawn");
    }

    #[tokio::test]
    async fn working_directory_applied() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = sh("pwd");
        settings.working_directory = Some(dir.path().to_string_lossy().into_owned());
        let provider = CommandProvider::new("cli", settings);
        let out = provider.spawn("", &opts("m1")).await.unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(&out.text).canonicalize().unwrap(), expected);
    }
}
