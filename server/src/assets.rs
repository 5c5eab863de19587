//! Game assets loaded once at startup.
//!
//! The map (`BOARD_DIR`) is what new games are dealt from. The geometry
//! (`BOARD_GEOMETRY_PATH`) is opaque drawing data handed to the game view
//! inside `game_started`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::services::board::{BoardError, GameMap};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("read {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parse {}: {source}", .path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, Default)]
pub struct GameAssets {
    pub map: Option<GameMap>,
    pub geometry: Option<Value>,
}

impl GameAssets {
    /// Load whatever the configuration points at. Unset paths stay `None`.
    ///
    /// # Errors
    ///
    /// [`AssetError`] when a configured file is missing or malformed.
    pub async fn load(config: &Config) -> Result<Self, AssetError> {
        let map = match &config.map_dir {
            Some(dir) => Some(load_map(dir).await?),
            None => None,
        };
        let geometry = match &config.board_geometry_path {
            Some(path) => {
                let text = read(path).await?;
                let value = serde_json::from_str(&text).map_err(|source| AssetError::Json { path: path.clone(), source })?;
                Some(value)
            }
            None => None,
        };

        if let Some(map) = &map {
            info!(
                cities = map.board.cities.len(),
                routes = map.board.routes.len(),
                tickets = map.tickets.len(),
                long_tickets = map.long_tickets.len(),
                "assets: map loaded"
            );
        }
        Ok(Self { map, geometry })
    }
}

async fn load_map(dir: &Path) -> Result<GameMap, AssetError> {
    let cities = read(&dir.join("cities.txt")).await?;
    let connections = read(&dir.join("connections.txt")).await?;
    let tickets = read(&dir.join("tickets.txt")).await?;
    Ok(GameMap::parse(&cities, &connections, &tickets)?)
}

async fn read(path: &Path) -> Result<String, AssetError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AssetError::Io { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
