use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use fleet_providers::ProviderCatalog;
use fleet_registry::{InvocationRegistry, RegistryConfig};
use fleet_server::{HandlerState, Orchestrator, ServerConfig};
use fleet_settings::{FleetSettings, LoadedSettings};
use fleet_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};

/// Run coding-agent CLIs in the background and collect their results.
#[derive(Debug, Parser)]
#[command(name = "fleet", version)]
struct Cli {
    /// Settings file (defaults to ~/.fleet/settings.json).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve requests on stdin/stdout and, optionally, over HTTP.
    Serve {
        /// Also listen for HTTP requests on this address.
        #[arg(long)]
        http: Option<String>,
        /// Do not read stdin; serve HTTP until interrupted.
        #[arg(long)]
        no_stdio: bool,
    },
    /// Print the configured providers as JSON.
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let LoadedSettings {
        settings,
        rejected_overrides,
    } = load_settings(cli.settings.as_deref())?;

    let telemetry = init_telemetry(TelemetryConfig::from_level_str(
        &settings.logging.level,
        settings.logging.json,
    ));
    // Overrides are parsed before a subscriber exists; report them now.
    for rejected in &rejected_overrides {
        rejected.warn();
    }

    match cli.command {
        Command::Serve { http, no_stdio } => serve(settings, telemetry, http, no_stdio).await,
        Command::Providers => {
            let catalog = ProviderCatalog::from_settings(&settings.providers);
            println!("{}", serde_json::to_string_pretty(&catalog.info())?);
            Ok(())
        }
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<LoadedSettings> {
    let path = path.map_or_else(fleet_settings::settings_path, PathBuf::from);
    fleet_settings::load_settings_with_report(&path)
        .with_context(|| format!("loading settings from {}", path.display()))
}

async fn serve(
    settings: FleetSettings,
    telemetry: TelemetryGuard,
    http: Option<String>,
    no_stdio: bool,
) -> Result<()> {
    let registry = Arc::new(InvocationRegistry::new(RegistryConfig {
        max_completed: settings.registry.max_completed,
        task_preview_chars: settings.registry.task_preview_chars,
        recent_ids_limit: settings.registry.recent_ids_limit,
        recent_results_limit: settings.registry.recent_results_limit,
    }));
    let catalog = ProviderCatalog::from_settings(&settings.providers);
    if catalog.is_empty() {
        tracing::warn!("no providers configured; every spawn will be rejected");
    }
    let orchestrator = Arc::new(Orchestrator::new(registry, catalog, telemetry.metrics()));
    let state = Arc::new(
        HandlerState::new(orchestrator).with_wait_defaults(
            Duration::from_secs(settings.wait.default_timeout_secs),
            settings.wait.result_preview_chars,
        ),
    );

    let http_addr = http.or(settings.server.http_addr);
    let http_handle = match http_addr {
        Some(addr) => Some(
            fleet_server::server::start(ServerConfig { addr: addr.clone() }, Arc::clone(&state))
                .await
                .with_context(|| format!("binding HTTP transport on {addr}"))?,
        ),
        None => None,
    };

    if no_stdio {
        if http_handle.is_none() {
            bail!("--no-stdio requires an HTTP address");
        }
        tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
        tracing::info!("shutting down");
        return Ok(());
    }

    tracing::info!("serving requests on stdio");
    tokio::select! {
        res = fleet_server::stdio::serve(state, tokio::io::stdin(), tokio::io::stdout()) => {
            res.context("stdio transport")?;
        }
        res = tokio::signal::ctrl_c() => {
            res.context("waiting for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
