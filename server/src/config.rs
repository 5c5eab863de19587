//! Server configuration parsed from environment variables.
//!
//! Optional (all have defaults):
//! - `PORT`: listen port, default 3000
//! - `STATIC_DIR`: front-end shell and assets, default `<crate>/static`
//! - `BOARD_GEOMETRY_PATH`: board geometry JSON served by `/api/new-board`
//! - `MAX_LOBBIES`: cap on concurrently existing lobbies, default 256
//! - `BOARD_DIR`: map directory (`cities.txt`, `connections.txt`,
//!   `tickets.txt`) games are dealt from; without it games start without a board
//! - `ABANDONED_GAME_SECS`: how long a started game with nobody connected
//!   is kept, default 300

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_LOBBIES: usize = 256;
pub const DEFAULT_GAME_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
    pub board_geometry_path: Option<PathBuf>,
    pub map_dir: Option<PathBuf>,
    pub max_lobbies: usize,
    pub game_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: default_static_dir(),
            board_geometry_path: None,
            map_dir: None,
            max_lobbies: DEFAULT_MAX_LOBBIES,
            game_ttl: DEFAULT_GAME_TTL,
        }
    }
}

impl Config {
    /// Build config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let max_lobbies = parse_or("MAX_LOBBIES", lookup("MAX_LOBBIES"), DEFAULT_MAX_LOBBIES)?;
        if max_lobbies == 0 {
            return Err(ConfigError::Invalid { key: "MAX_LOBBIES", value: "0".into() });
        }
        let static_dir = non_empty(lookup("STATIC_DIR")).map_or_else(default_static_dir, PathBuf::from);
        let board_geometry_path = non_empty(lookup("BOARD_GEOMETRY_PATH")).map(PathBuf::from);
        let map_dir = non_empty(lookup("BOARD_DIR")).map(PathBuf::from);
        let game_ttl = Duration::from_secs(parse_or(
            "ABANDONED_GAME_SECS",
            lookup("ABANDONED_GAME_SECS"),
            DEFAULT_GAME_TTL.as_secs(),
        )?);

        Ok(Self { port, static_dir, board_geometry_path, map_dir, max_lobbies, game_ttl })
    }
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static")
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match non_empty(raw) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
