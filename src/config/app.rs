//! Main application configuration
//!
//! This module defines the primary configuration structures for the pair-room
//! matchmaking service, including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub fleet: FleetSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the WebSocket front door binds to
    pub host: String,
    /// Port the WebSocket front door binds to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Fleet allocator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSettings {
    /// Base URL of the allocator
    pub base_url: String,
    /// Namespace the fleet lives in
    pub namespace: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Claim key identifying the matchable game
    pub claim_key: String,
    /// Region to claim servers in
    pub region: String,
    /// Session id passed along with every claim
    pub session_id: String,
    /// Name of the port to hand to clients
    pub port_name: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Sleep between scheduling passes in milliseconds
    pub idle_interval_ms: u64,
    /// Delay between delivering the address and closing the pair
    pub flush_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pair-room".to_string(),
            log_level: "info".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for FleetSettings {
    fn default() -> Self {
        Self {
            base_url: "https://development.accelbyte.io".to_string(),
            namespace: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            claim_key: "pong".to_string(),
            region: "us-west-2".to_string(),
            session_id: "none".to_string(),
            port_name: "default".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            idle_interval_ms: 2000,
            flush_delay_ms: 100,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value)),
        Err(_) => Ok(None),
    }
}

impl FleetSettings {
    /// Get allocator request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text without validation
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse TOML configuration")
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("LISTEN_HOST") {
            self.service.host = host;
        }
        if let Some(port) = parse_env("LISTEN_PORT")? {
            self.service.port = port;
        }
        if let Some(timeout) = parse_env("SHUTDOWN_TIMEOUT_SECONDS")? {
            self.service.shutdown_timeout_seconds = timeout;
        }

        // Fleet allocator settings
        if let Ok(url) = env::var("AB_BASE_URL") {
            self.fleet.base_url = url;
        }
        if let Ok(namespace) = env::var("AB_NAMESPACE") {
            self.fleet.namespace = namespace;
        }
        if let Ok(client_id) = env::var("AB_CLIENT_ID") {
            self.fleet.client_id = client_id;
        }
        if let Ok(client_secret) = env::var("AB_CLIENT_SECRET") {
            self.fleet.client_secret = client_secret;
        }
        if let Ok(claim_key) = env::var("FLEET_CLAIM_KEY") {
            self.fleet.claim_key = claim_key;
        }
        if let Ok(region) = env::var("FLEET_REGION") {
            self.fleet.region = region;
        }
        if let Ok(session_id) = env::var("FLEET_SESSION_ID") {
            self.fleet.session_id = session_id;
        }
        if let Ok(port_name) = env::var("FLEET_PORT_NAME") {
            self.fleet.port_name = port_name;
        }
        if let Some(timeout) = parse_env("FLEET_REQUEST_TIMEOUT_SECONDS")? {
            self.fleet.request_timeout_seconds = timeout;
        }

        // Matchmaking settings
        if let Some(idle) = parse_env("IDLE_INTERVAL_MS")? {
            self.matchmaking.idle_interval_ms = idle;
        }
        if let Some(flush) = parse_env("FLUSH_DELAY_MS")? {
            self.matchmaking.flush_delay_ms = flush;
        }

        Ok(())
    }

    /// Address the front door binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.service.host, self.service.port)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get idle interval as Duration
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.matchmaking.idle_interval_ms)
    }

    /// Get pre-close flush delay as Duration
    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.matchmaking.flush_delay_ms)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.host.is_empty() {
        return Err(anyhow!("Listen host cannot be empty"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.fleet.base_url.is_empty() {
        return Err(anyhow!("Fleet base URL cannot be empty"));
    }
    if config.fleet.claim_key.is_empty() {
        return Err(anyhow!("Fleet claim key cannot be empty"));
    }
    if config.fleet.region.is_empty() {
        return Err(anyhow!("Fleet region cannot be empty"));
    }
    if config.fleet.port_name.is_empty() {
        return Err(anyhow!("Fleet port name cannot be empty"));
    }
    if config.fleet.request_timeout_seconds == 0 {
        return Err(anyhow!("Fleet request timeout must be greater than 0"));
    }

    if config.matchmaking.idle_interval_ms == 0 {
        return Err(anyhow!("Idle interval must be greater than 0"));
    }

    Ok(())
}
