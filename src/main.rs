//! Main entry point for the Pair Room matchmaking service
//!
//! This is the production entry point that loads configuration, logs in to
//! the fleet allocator, and runs the front door and matchmaker until a
//! shutdown signal arrives.

use anyhow::{anyhow, Result};
use clap::Parser;
use pair_room::config::AppConfig;
use pair_room::error::MatchmakingError;
use pair_room::fleet::{FleetClaimer, HttpFleetClient, StaticFleetClaimer};
use pair_room::server::HEALTH_PATH;
use pair_room::service::{login, AppState};
use pair_room::types::ServerAllocation;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Pair Room Matchmaking Service - pairs players and claims game servers
#[derive(Parser)]
#[command(
    name = "pair-room",
    version,
    about = "Pairs WebSocket clients and hands each pair a dedicated game server",
    long_about = "Pair Room accepts WebSocket clients, pairs them two at a time, claims a \
                 dedicated game server for each pair from the fleet allocator, and sends \
                 both players the server address before closing their sockets."
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

    /// Probe a running instance's liveness endpoint and exit
    #[arg(long, help = "Probe the liveness endpoint and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Listen host override
    #[arg(long, value_name = "HOST", help = "Override listen host")]
    host: Option<String>,

    /// Listen port override
    #[arg(short, long, value_name = "PORT", help = "Override listen port")]
    port: Option<u16>,

    /// Claim key override
    #[arg(long, value_name = "KEY", help = "Override the fleet claim key")]
    claim_key: Option<String>,

    /// Region override
    #[arg(long, value_name = "REGION", help = "Override the fleet region")]
    region: Option<String>,

    /// Serve a fixed address instead of claiming from the fleet
    #[arg(
        long,
        value_name = "HOST:PORT",
        help = "Skip the fleet allocator and hand every pair this address"
    )]
    fake_server: Option<String>,

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
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Probe the liveness endpoint of a running instance
async fn perform_health_check(config: &AppConfig) -> Result<()> {
    let url = format!("http://{}{}", config.listen_address(), HEALTH_PATH);
    info!("Probing {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            println!("Health Check: ✅ healthy");
            std::process::exit(0);
        }
        Ok(response) => {
            println!("Health Check: ❌ HTTP {}", response.status().as_u16());
            std::process::exit(1);
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
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

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig, fake_server: Option<&str>) {
    info!("🚀 Pair Room Matchmaking Service v{}", pair_room::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listen: ws://{}", config.listen_address());
    match fake_server {
        Some(address) => info!("   Fleet: fake server at {}", address),
        None => info!(
            "   Fleet: {} (namespace '{}')",
            config.fleet.base_url, config.fleet.namespace
        ),
    }
    info!(
        "   Claim: key '{}', region '{}', port '{}'",
        config.fleet.claim_key, config.fleet.region, config.fleet.port_name
    );
    info!("   Idle interval: {:?}", config.idle_interval());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(host) = &args.host {
        config.service.host = host.clone();
    }

    if let Some(port) = args.port {
        config.service.port = port;
    }

    if let Some(claim_key) = &args.claim_key {
        config.fleet.claim_key = claim_key.clone();
    }

    if let Some(region) = &args.region {
        config.fleet.region = region.clone();
    }

    pair_room::config::validate_config(&config)?;
    Ok(config)
}

/// Build an allocation for `--fake-server HOST:PORT`
fn parse_fake_server(address: &str, port_name: &str) -> Result<ServerAllocation> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| MatchmakingError::ConfigurationError {
            message: format!("Fake server must be HOST:PORT, got '{}'", address),
        })?;
    let port: u16 = port
        .parse()
        .map_err(|_| MatchmakingError::ConfigurationError {
            message: format!("Invalid fake server port '{}'", port),
        })?;

    Ok(ServerAllocation::new(host, port_name, port))
}

/// Log in to the allocator and return the claimer the matchmaker will use
async fn build_claimer(config: &AppConfig, args: &Args) -> Result<Arc<dyn FleetClaimer>> {
    if let Some(address) = &args.fake_server {
        let allocation = parse_fake_server(address, &config.fleet.port_name)?;
        warn!("Fake server enabled: every pair will be sent to {}", address);
        return Ok(Arc::new(StaticFleetClaimer::always(allocation)));
    }

    let client = Arc::new(HttpFleetClient::new(config.fleet.clone())?);
    login(client.as_ref()).await?;
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Handle special modes
    if args.health_check {
        return perform_health_check(&config).await;
    }

    display_startup_banner(&config, args.fake_server.as_deref());

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    // Login must succeed before any client is accepted
    let claimer = match build_claimer(&config, &args).await {
        Ok(claimer) => claimer,
        Err(e) => {
            error!("Failed to log in to fleet allocator: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize application state
    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone(), claimer) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // Start the service
    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Pair Room Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    // Wait for shutdown signal
    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    if let Err(e) = app_state.shutdown().await {
        warn!("⚠️  Shutdown finished with errors: {}", e);
    }

    info!("🛑 Pair Room Matchmaking Service stopped");
    Ok(())
}
