//! Main entry point for the LFG matchmaking service
//!
//! Runs the service with its health endpoints until a shutdown signal, or
//! replays a scenario file and prints the resulting groups.

use anyhow::Result;
use clap::Parser;
use lfg_matchmaker::config::AppConfig;
use lfg_matchmaker::service::{AppState, Scenario};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{error, info, warn};

/// LFG Matchmaker - talent-aware looking-for-group matching
#[derive(Parser)]
#[command(
    name = "lfg-matchmaker",
    version,
    about = "Looking-for-group matchmaking with talent based role inference",
    long_about = "LFG Matchmaker forms dungeon parties automatically. It infers each \
                 character's role from its talents, keeps parties role-balanced and builds \
                 the listing clients browse."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Health port override
    #[arg(long, value_name = "PORT", help = "Override health and metrics port")]
    health_port: Option<u16>,

    /// Restrict the LFG channel
    #[arg(long, help = "Remove matched players from the LFG channel")]
    channel_restricted: bool,

    /// Scenario to replay
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Replay a TOML scenario, print the outcome and exit"
    )]
    scenario: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

fn display_startup_banner(config: &AppConfig) {
    info!("LFG Matchmaker {}", lfg_matchmaker::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Health port: {}", config.service.health_port);
    info!("   Channel restricted: {}", config.lfg.channel_restricted);
    info!("   Max group size: {}", config.lfg.max_group_size);
    info!("   Listing limit: {}", config.lfg.listing_display_limit);
}

/// Load configuration and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
    if let Some(port) = args.health_port {
        config.service.health_port = port;
    }
    if args.channel_restricted {
        config.lfg.channel_restricted = true;
    }

    lfg_matchmaker::config::validate_config(&config)?;
    Ok(config)
}

fn run_scenario(path: &Path, config: &AppConfig) -> Result<()> {
    info!("Replaying scenario {}", path.display());
    let scenario = Scenario::from_file(path)?;
    let report = scenario.run(config)?;
    print!("{}", report);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    if let Some(path) = &args.scenario {
        return run_scenario(path, &config);
    }

    display_startup_banner(&config);

    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("LFG Matchmaker is running, press Ctrl+C to stop");
    wait_for_shutdown_signal().await;
    info!("Shutdown signal received, beginning graceful shutdown");

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => info!("Graceful shutdown completed"),
        Ok(Err(e)) => warn!("Shutdown finished with errors: {}", e),
        Err(_) => warn!("Shutdown timeout exceeded, forcing exit"),
    }

    Ok(())
}
