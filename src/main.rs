//! # crisisdrill
//!
//! Crisis tabletop live session server. Wires settings, telemetry, the
//! interaction store and the outbound services into the HTTP/WebSocket
//! server, then runs until Ctrl+C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};

use drill_server::{Collaborators, DrillServer, ServerConfig};
use drill_services::{
    BuiltinScenarioGenerator, DisabledNotifier, LlmScenarioConfig, LlmScenarioGenerator,
    MailRelayConfig, MailRelayNotifier, Notifier, ScenarioGenerator,
};
use drill_settings::{DrillSettings, Secrets};
use drill_store::{Database, SqliteInteractionStore};
use drill_telemetry::TelemetryConfig;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Crisis drill live session server.
#[derive(Parser, Debug)]
#[command(name = "crisisdrill", about = "Crisis tabletop live session server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the interactions `SQLite` database. Settings paths are
    /// relative to `~/.crisisdrill`; this one is used as given.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default `~/.crisisdrill/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, settings: &mut DrillSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

fn telemetry_config(settings: &DrillSettings) -> TelemetryConfig {
    let log_level = settings
        .logging
        .level
        .as_filter_str()
        .parse::<Level>()
        .unwrap_or(Level::INFO);
    TelemetryConfig {
        log_level,
        module_levels: Vec::new(),
        json: settings.logging.json,
        log_to_sqlite: settings.logging.log_to_sqlite,
        log_db_path: drill_settings::resolve_path(
            &drill_settings::data_dir(),
            &settings.logging.log_db_path,
        ),
    }
}

fn scenario_generator(
    settings: &DrillSettings,
    secrets: &Secrets,
) -> Result<Arc<dyn ScenarioGenerator>> {
    let Some(api_key) = secrets.scenario_api_key.clone() else {
        info!("no scenario API key, using built-in scenarios");
        return Ok(Arc::new(BuiltinScenarioGenerator));
    };
    let generator = LlmScenarioGenerator::new(LlmScenarioConfig {
        api_url: settings.scenario.api_url.clone(),
        model: settings.scenario.model.clone(),
        max_tokens: settings.scenario.max_tokens,
        timeout: Duration::from_millis(settings.scenario.timeout_ms),
        api_key,
    })
    .context("Failed to build scenario generator")?;
    info!(model = %settings.scenario.model, "LLM scenario generation enabled");
    Ok(Arc::new(generator))
}

fn notifier(settings: &DrillSettings, secrets: &Secrets) -> Result<Arc<dyn Notifier>> {
    if !settings.mail.enabled {
        info!("mail disabled");
        return Ok(Arc::new(DisabledNotifier));
    }
    let notifier = MailRelayNotifier::new(MailRelayConfig {
        relay_url: settings.mail.relay_url.clone(),
        from_address: settings.mail.from_address.clone(),
        timeout: Duration::from_millis(settings.mail.timeout_ms),
        token: secrets.mail_relay_token.clone(),
    })
    .context("Failed to build mail notifier")?;
    info!(relay = %settings.mail.relay_url, "mail relay enabled");
    Ok(Arc::new(notifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(drill_settings::settings_path);
    let mut settings = drill_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);
    let secrets = Secrets::from_env();

    let _telemetry = drill_telemetry::init_telemetry(telemetry_config(&settings));
    info!(settings = %settings_path.display(), "starting crisisdrill");

    let db_path = args.db_path.clone().unwrap_or_else(|| {
        drill_settings::resolve_path(&drill_settings::data_dir(), &settings.database.path)
    });
    let db = Database::open(&db_path).context("Failed to open database")?;

    let metrics = match drill_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "metrics recorder unavailable");
            None
        }
    };

    let collaborators = Collaborators {
        repository: Arc::new(SqliteInteractionStore::new(db)),
        scenarios: scenario_generator(&settings, &secrets)?,
        notifier: notifier(&settings, &secrets)?,
    };

    let mut server = DrillServer::new(ServerConfig::from(&settings.server), collaborators);
    if let Some(handle) = metrics {
        server = server.with_metrics(handle);
    }

    let (addr, serve) = server.listen().await.context("Failed to bind server")?;
    info!(%addr, "crisisdrill ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    info!("shutting down");
    server
        .shutdown_coordinator()
        .graceful_shutdown(vec![serve], Some(SHUTDOWN_TIMEOUT))
        .await;
    Ok(())
}
