use clap::Parser;
use loginstress::engine::client::build_client;
use loginstress::error::StartupError;
use loginstress::{
    exit_codes, load_credentials, logging, metrics, Endpoints, Orchestrator, RunSettings, RunState,
    StopCause,
};
use loginstress_common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Concurrent login load test against a nonce-protected login form.
#[derive(Debug, Parser)]
#[command(name = "loginstress", version)]
struct Cli {
    /// Login URL for POST requests
    #[arg(long)]
    login_url: String,

    /// URL of the login page the nonce is extracted from
    #[arg(long)]
    login_page_url: String,

    /// Log page and response bodies for inspection
    #[arg(long)]
    debug: bool,

    /// Optional YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Credential file in username:password format (overrides the config)
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Maximum simultaneous login attempts (overrides the config)
    #[arg(long)]
    concurrency: Option<usize>,
}

fn resolve_config(cli: &Cli) -> Result<Config, StartupError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(path) = &cli.credentials {
        config.run.credentials_file = path.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.run.concurrency = concurrency;
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<i32, StartupError> {
    let config = resolve_config(&cli)?;
    logging::init(&config.logging, cli.debug);

    let endpoints = Endpoints::new(cli.login_url, cli.login_page_url)?;
    let client = build_client(&config.run)?;

    if config.metrics.enabled {
        let port = config.metrics.port;
        tokio::spawn(async move {
            metrics::run_metrics_server(port).await;
        });
    }

    let parsed = load_credentials(&config.run.credentials_file).await?;

    let state = Arc::new(RunState::new());
    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_state.request_stop(StopCause::Interrupted);
        }
    });

    let settings = RunSettings {
        concurrency: config.run.concurrency,
        drain_timeout: config.run.drain_timeout(),
        user_agent: config.run.user_agent.clone(),
        debug: cli.debug,
    };

    let mut orchestrator = Orchestrator::new(client, endpoints, settings, state);
    let report = orchestrator.run(parsed.credentials).await;

    if let Some(cause) = report.stop_cause {
        error!(cause = ?cause, "{}. Stopping execution.", cause);
    }

    Ok(report.exit_code())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("loginstress: {}", e);
            exit_codes::INVALID
        }
    };

    std::process::exit(code);
}
