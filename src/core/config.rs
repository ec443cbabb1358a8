//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.tutor/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::animation::{DEFAULT_BATCH_SIZE, DEFAULT_TICK, Pacing};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TutorConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub query_path: Option<String>,
    pub health_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AnimationConfig {
    /// Characters revealed per tick.
    pub batch_size: Option<usize>,
    /// Milliseconds between ticks.
    pub tick_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_QUERY_PATH: &str = "/api/query";
pub const DEFAULT_HEALTH_PATH: &str = "/health";

/// Env var overriding `[api] base_url`.
pub const API_URL_ENV: &str = "TUTOR_API_URL";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub query_path: String,
    pub health_path: String,
    pub pacing: Pacing,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.tutor/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tutor").join("config.toml"))
}

/// Load config from `~/.tutor/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `TutorConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<TutorConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(TutorConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<TutorConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(TutorConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: TutorConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Tutor Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [api]
# base_url = "http://localhost:8000"   # Or set TUTOR_API_URL, or pass --api-url
# query_path = "/api/query"
# health_path = "/health"

# [animation]
# batch_size = 3                       # Characters revealed per tick
# tick_ms = 30                         # Milliseconds between ticks
"#;

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, DEFAULT_CONFIG_TEMPLATE) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_api_url` is the `--api-url` flag (None = not specified).
pub fn resolve(config: &TutorConfig, cli_api_url: Option<&str>) -> ResolvedConfig {
    resolve_with_env(config, cli_api_url, std::env::var(API_URL_ENV).ok())
}

/// Same as [`resolve`], with the environment value passed in.
pub fn resolve_with_env(
    config: &TutorConfig,
    cli_api_url: Option<&str>,
    env_api_url: Option<String>,
) -> ResolvedConfig {
    // API URL: CLI → env → config → default
    let api_url = cli_api_url
        .map(|s| s.to_string())
        .or(env_api_url)
        .or_else(|| config.api.base_url.clone())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let query_path = config
        .api
        .query_path
        .clone()
        .unwrap_or_else(|| DEFAULT_QUERY_PATH.to_string());
    let health_path = config
        .api
        .health_path
        .clone()
        .unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string());

    let tick = config
        .animation
        .tick_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TICK);
    if tick.is_zero() {
        warn!("animation.tick_ms = 0 reveals everything at once");
    }
    let pacing = Pacing::new(
        config.animation.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        tick,
    );

    ResolvedConfig {
        api_url,
        query_path,
        health_path,
        pacing,
    }
}
