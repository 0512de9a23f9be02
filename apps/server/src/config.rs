//! # Server Configuration
//!
//! Loaded once at start-up from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TALLY_BIND_ADDR` | `0.0.0.0:8080` |
//! | `TALLY_DB_PATH` | platform data dir + `tally.db` |
//! | `TALLY_DB_MAX_CONNECTIONS` | `5` |
//! | `TALLY_STORE_NAME` | `Tally Store` |
//! | `TALLY_STOCK_POLICY` | `strict` |
//! | `TALLY_OVERPAYMENT_POLICY` | `strict` |
//! | `TALLY_ALLOW_PRICE_OVERRIDE` | `false` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use directories::ProjectDirs;
use tally_core::{FloorPolicy, LedgerPolicy};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STORE_NAME: &str = "Tally Store";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub db_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Shown on the health endpoint
    pub store_name: String,

    /// Floors and price rules handed to every ledger operation
    pub policy: LedgerPolicy,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. `load()` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("TALLY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TALLY_BIND_ADDR".to_string()))?;

        let db_path = match lookup("TALLY_DB_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_db_path()?,
        };

        let db_max_connections = match lookup("TALLY_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let store_name = lookup("TALLY_STORE_NAME")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string());

        let policy = LedgerPolicy {
            stock_floor: floor_policy(&lookup, "TALLY_STOCK_POLICY")?,
            overpayment: floor_policy(&lookup, "TALLY_OVERPAYMENT_POLICY")?,
            allow_price_override: match lookup("TALLY_ALLOW_PRICE_OVERRIDE") {
                Some(raw) => parse_bool(&raw)
                    .ok_or_else(|| ConfigError::InvalidValue("TALLY_ALLOW_PRICE_OVERRIDE".to_string()))?,
                None => false,
            },
        };

        Ok(ServerConfig {
            bind_addr,
            db_path,
            db_max_connections,
            store_name,
            policy,
        })
    }
}

fn floor_policy<F>(lookup: &F, key: &str) -> Result<FloorPolicy, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(FloorPolicy::default()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Platform data directory, created if missing.
///
/// - **macOS**: `~/Library/Application Support/com.tally.ledger/tally.db`
/// - **Windows**: `%APPDATA%\tally\ledger\data\tally.db`
/// - **Linux**: `~/.local/share/ledger/tally.db`
fn default_db_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("com", "tally", "ledger").ok_or(ConfigError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir();

    std::fs::create_dir_all(data_dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;

    Ok(data_dir.join("tally.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine app data directory; set TALLY_DB_PATH")]
    NoDataDir,

    #[error("Could not create data directory: {0}")]
    DataDir(String),
}
