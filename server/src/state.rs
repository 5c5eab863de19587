//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the loaded configuration and the lobby registry: every live
//! websocket connection and every open or running lobby. One write lock
//! covers the whole registry so a lobby operation (which may touch the
//! actor, the lobby and every member) is applied atomically.
//!
//! A started lobby outlives its members' connections: the front end
//! navigates to the game page and reattaches with `rejoin_game`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use frames::{Frame, Lobby};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::assets::GameAssets;
use crate::config::Config;
use crate::services::game::GameState;

// =============================================================================
// CONNECTED CLIENT
// =============================================================================

/// One live websocket connection.
pub struct ConnectedClient {
    /// Sender for frames addressed to this connection.
    pub tx: mpsc::Sender<Frame>,
    /// Display name, once `set_username` succeeded.
    pub username: Option<String>,
    /// Lobby this connection is seated in.
    pub lobby_id: Option<String>,
    /// Started lobby whose game this connection follows from the game view.
    pub watching: Option<String>,
    /// Player ID this watcher plays as, claimed through `rejoin_game`.
    pub seat: Option<String>,
}

impl ConnectedClient {
    #[must_use]
    pub fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx, username: None, lobby_id: None, watching: None, seat: None }
    }
}

// =============================================================================
// LOBBY STATE
// =============================================================================

/// Server-side record of one lobby.
pub struct LobbyState {
    /// The snapshot pushed to clients.
    pub lobby: Lobby,
    /// Set once the host starts the game; started lobbies leave the browser list.
    pub started: bool,
    /// Creation order, used to sort the browser list.
    pub seq: u64,
    /// Dealt at start when a map is loaded.
    pub game: Option<GameState>,
    /// Connections following the started game, in rejoin order.
    pub watchers: Vec<Uuid>,
    /// When the last live connection of a started lobby went away.
    pub abandoned_since: Option<Instant>,
}

impl LobbyState {
    #[must_use]
    pub fn new(lobby: Lobby, seq: u64) -> Self {
        Self { lobby, started: false, seq, game: None, watchers: Vec::new(), abandoned_since: None }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// All connections and lobbies. Mutated only through `services::lobby`.
pub struct Registry {
    pub clients: HashMap<Uuid, ConnectedClient>,
    pub lobbies: HashMap<String, LobbyState>,
    /// Upper bound on concurrently existing lobbies.
    pub max_lobbies: usize,
    /// How long a started lobby with nobody connected is kept.
    pub game_ttl: Duration,
    pub assets: Arc<GameAssets>,
    next_seq: u64,
}

impl Registry {
    #[must_use]
    pub fn new(max_lobbies: usize) -> Self {
        Self {
            clients: HashMap::new(),
            lobbies: HashMap::new(),
            max_lobbies,
            game_ttl: crate::config::DEFAULT_GAME_TTL,
            assets: Arc::new(GameAssets::default()),
            next_seq: 0,
        }
    }

    #[must_use]
    pub fn with_assets(mut self, assets: Arc<GameAssets>) -> Self {
        self.assets = assets;
        self
    }

    #[must_use]
    pub fn with_game_ttl(mut self, game_ttl: Duration) -> Self {
        self.game_ttl = game_ttl;
        self
    }

    /// Next creation sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RwLock<Registry>>,
}

impl AppState {
    /// State without a map: games start with no board to play on.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_assets(config, GameAssets::default())
    }

    #[must_use]
    pub fn with_assets(config: Config, assets: GameAssets) -> Self {
        let registry = Registry::new(config.max_lobbies)
            .with_game_ttl(config.game_ttl)
            .with_assets(Arc::new(assets));
        Self { config: Arc::new(config), registry: Arc::new(RwLock::new(registry)) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// `AppState` with default configuration.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(Config::default())
    }

    /// Register a connection and return its ID with the receiving end of its channel.
    pub fn connect(registry: &mut Registry) -> (Uuid, mpsc::Receiver<Frame>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(64);
        registry.clients.insert(client_id, ConnectedClient::new(tx));
        (client_id, rx)
    }

    /// Register a connection that already has a username.
    pub fn connect_named(registry: &mut Registry, username: &str) -> Uuid {
        let (client_id, _rx) = connect(registry);
        if let Some(client) = registry.clients.get_mut(&client_id) {
            client.username = Some(username.to_owned());
        }
        client_id
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
