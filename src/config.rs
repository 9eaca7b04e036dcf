//! Process configuration from environment variables
//!
//! A `.env` file in the working directory is loaded first when present.

use crate::runtime::SessionSettings;
use crate::state_machine::state::DEFAULT_ODOMETER_FLOOR;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RECENT_LIMIT: usize = 10;
const DEFAULT_IDLE_SECS: u64 = 30 * 60;
const DEFAULT_ROSTER: [&str; 4] = ["Amos", "David", "Ngee Feng", "Guo Jun"];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },

    #[error("CARSHARE_ROSTER lists no names")]
    EmptyRoster,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub port: u16,
    pub roster: Vec<String>,
    pub odometer_floor: i64,
    pub recent_limit: usize,
    pub session_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("CARSHARE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.carshare-ledger/ledger.db"))
            },
            PathBuf::from,
        );

        let port = parse_var(&lookup, "CARSHARE_PORT", DEFAULT_PORT)?;

        let roster = match lookup("CARSHARE_ROSTER") {
            Some(raw) => parse_roster(&raw)?,
            None => DEFAULT_ROSTER.iter().map(ToString::to_string).collect(),
        };

        let odometer_floor = parse_var(&lookup, "CARSHARE_ODOMETER_FLOOR", DEFAULT_ODOMETER_FLOOR)?;

        let recent_limit = parse_var(&lookup, "CARSHARE_RECENT_LIMIT", DEFAULT_RECENT_LIMIT)?;
        if recent_limit == 0 {
            return Err(ConfigError::Zero {
                key: "CARSHARE_RECENT_LIMIT",
            });
        }

        let idle_secs = parse_var(&lookup, "CARSHARE_SESSION_IDLE_SECS", DEFAULT_IDLE_SECS)?;
        if idle_secs == 0 {
            return Err(ConfigError::Zero {
                key: "CARSHARE_SESSION_IDLE_SECS",
            });
        }

        Ok(Self {
            db_path,
            port,
            roster,
            odometer_floor,
            recent_limit,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            roster: self.roster.clone(),
            odometer_floor: self.odometer_floor,
            recent_limit: self.recent_limit,
            idle_timeout: self.session_idle_timeout,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

fn parse_roster(raw: &str) -> Result<Vec<String>, ConfigError> {
    let roster: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect();
    if roster.is_empty() {
        return Err(ConfigError::EmptyRoster);
    }
    Ok(roster)
}
