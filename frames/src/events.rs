//! Typed views over [`Frame`]s.
//!
//! `ClientEvent` is everything a client may send; `ServerEvent` is everything
//! the server may push. Both convert to and from the untyped envelope so the
//! transport layer never has to look inside `data`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::Frame;
use crate::game::{CardColor, GameView, optional_count};
use crate::lobby::{Lobby, LobbySummary, Player, count};

/// Capacity used when a `create_lobby` payload does not name one.
pub const DEFAULT_MAX_PLAYERS: u8 = 4;

/// Error returned when a frame cannot be read as a typed event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("unknown event: {0}")]
    Unknown(String),
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Messages a client sends. All are fire-and-forget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    SetUsername { username: String },
    CreateLobby { name: String, max_players: u8 },
    JoinLobby { lobby_id: String },
    LeaveLobby,
    GetLobbyList,
    StartGame { lobby_id: String },
    /// Sent by the game view on its fresh connection to follow a started
    /// lobby. Naming a seated `player_id` takes that seat back; without one
    /// the connection only watches.
    RejoinGame { lobby_id: String, player_id: Option<String> },
    /// Take a face-up card (`slot` 0..5) or, with no slot, one from the deck.
    DrawCard { lobby_id: String, slot: Option<u8> },
    /// Pay `cards` to claim the route between `from` and `to`.
    ClaimRoute { lobby_id: String, from: String, to: String, cards: Vec<CardColor> },
}

impl ClientEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetUsername { .. } => "set_username",
            Self::CreateLobby { .. } => "create_lobby",
            Self::JoinLobby { .. } => "join_lobby",
            Self::LeaveLobby => "leave_lobby",
            Self::GetLobbyList => "get_lobby_list",
            Self::StartGame { .. } => "start_game",
            Self::RejoinGame { .. } => "rejoin_game",
            Self::DrawCard { .. } => "draw_card",
            Self::ClaimRoute { .. } => "claim_route",
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::SetUsername { username } => json!({ "username": username }),
            Self::CreateLobby { name, max_players } => json!({ "name": name, "max_players": max_players }),
            Self::JoinLobby { lobby_id } | Self::StartGame { lobby_id } => json!({ "lobby_id": lobby_id }),
            Self::RejoinGame { lobby_id, player_id } => json!({ "lobby_id": lobby_id, "player_id": player_id }),
            Self::DrawCard { lobby_id, slot } => json!({ "lobby_id": lobby_id, "slot": slot }),
            Self::ClaimRoute { lobby_id, from, to, cards } => {
                json!({ "lobby_id": lobby_id, "from": from, "to": to, "cards": cards })
            }
            Self::LeaveLobby | Self::GetLobbyList => json!({}),
        };
        Frame::new(self.name(), data)
    }

    /// Read a client frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Unknown`] for unrecognised event names and
    /// [`EventError::InvalidPayload`] when required fields are missing or mistyped.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.event.as_str() {
            "set_username" => {
                let p: UsernamePayload = payload(frame)?;
                Ok(Self::SetUsername { username: p.username })
            }
            "create_lobby" => {
                let p: CreateLobbyPayload = payload(frame)?;
                Ok(Self::CreateLobby { name: p.name, max_players: p.max_players })
            }
            "join_lobby" => Ok(Self::JoinLobby { lobby_id: payload::<LobbyIdPayload>(frame)?.lobby_id }),
            "leave_lobby" => Ok(Self::LeaveLobby),
            "get_lobby_list" => Ok(Self::GetLobbyList),
            "start_game" => Ok(Self::StartGame { lobby_id: payload::<LobbyIdPayload>(frame)?.lobby_id }),
            "rejoin_game" => {
                let p: RejoinPayload = payload(frame)?;
                Ok(Self::RejoinGame { lobby_id: p.lobby_id, player_id: p.player_id })
            }
            "draw_card" => {
                let p: DrawCardPayload = payload(frame)?;
                Ok(Self::DrawCard { lobby_id: p.lobby_id, slot: p.slot })
            }
            "claim_route" => {
                let p: ClaimRoutePayload = payload(frame)?;
                Ok(Self::ClaimRoute { lobby_id: p.lobby_id, from: p.from, to: p.to, cards: p.cards })
            }
            other => Err(EventError::Unknown(other.to_owned())),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Messages the server pushes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerEvent {
    UsernameSet { username: String },
    LobbyListUpdate { lobbies: Vec<LobbySummary> },
    LobbyCreated { lobby_id: Option<String> },
    LobbyJoined { lobby: Lobby, player_id: String },
    PlayerJoined { lobby: Lobby, player: Player },
    PlayerLeft { lobby: Lobby },
    NewHost { host_id: String },
    LeftLobby,
    /// `board` is the drawable board geometry; `game` is the recipient's view
    /// of the dealt game. Both are absent when the server has no map loaded.
    GameStarted { lobby: Lobby, board: Option<Value>, game: Option<GameView> },
    GameUpdate { lobby_id: String, game: GameView },
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UsernameSet { .. } => "username_set",
            Self::LobbyListUpdate { .. } => "lobby_list_update",
            Self::LobbyCreated { .. } => "lobby_created",
            Self::LobbyJoined { .. } => "lobby_joined",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerLeft { .. } => "player_left",
            Self::NewHost { .. } => "new_host",
            Self::LeftLobby => "left_lobby",
            Self::GameStarted { .. } => "game_started",
            Self::GameUpdate { .. } => "game_update",
            Self::Error { .. } => "error",
        }
    }

    /// Lobby snapshot carried by this event, if any.
    #[must_use]
    pub fn lobby(&self) -> Option<&Lobby> {
        match self {
            Self::LobbyJoined { lobby, .. }
            | Self::PlayerJoined { lobby, .. }
            | Self::PlayerLeft { lobby }
            | Self::GameStarted { lobby, .. } => Some(lobby),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Self::UsernameSet { username } => json!({ "username": username }),
            Self::LobbyListUpdate { lobbies } => json!({ "lobbies": lobbies }),
            Self::LobbyCreated { lobby_id: Some(id) } => json!({ "lobby_id": id }),
            Self::LobbyCreated { lobby_id: None } | Self::LeftLobby => json!({}),
            Self::LobbyJoined { lobby, player_id } => json!({ "lobby": lobby, "player_id": player_id }),
            Self::PlayerJoined { lobby, player } => json!({ "lobby": lobby, "player": player }),
            Self::PlayerLeft { lobby } => json!({ "lobby": lobby }),
            Self::GameStarted { lobby, board, game } => json!({ "lobby": lobby, "board": board, "game": game }),
            Self::GameUpdate { lobby_id, game } => json!({ "lobby_id": lobby_id, "game": game }),
            Self::NewHost { host_id } => json!({ "host_id": host_id }),
            Self::Error { message } => json!({ "message": message }),
        };
        Frame::new(self.name(), data)
    }

    /// Read a server frame.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Unknown`] for unrecognised event names and
    /// [`EventError::InvalidPayload`] when required fields are missing or mistyped.
    pub fn from_frame(frame: &Frame) -> Result<Self, EventError> {
        match frame.event.as_str() {
            "username_set" => Ok(Self::UsernameSet { username: payload::<UsernamePayload>(frame)?.username }),
            "lobby_list_update" => {
                let p: LobbyListPayload = payload(frame)?;
                Ok(Self::LobbyListUpdate { lobbies: p.lobbies })
            }
            "lobby_created" => {
                let p: LobbyCreatedPayload = payload(frame)?;
                Ok(Self::LobbyCreated { lobby_id: p.lobby_id })
            }
            "lobby_joined" => {
                let p: LobbyJoinedPayload = payload(frame)?;
                Ok(Self::LobbyJoined { lobby: p.lobby, player_id: p.player_id })
            }
            "player_joined" => {
                let p: PlayerJoinedPayload = payload(frame)?;
                Ok(Self::PlayerJoined { lobby: p.lobby, player: p.player })
            }
            "player_left" => Ok(Self::PlayerLeft { lobby: payload::<LobbyPayload>(frame)?.lobby }),
            "new_host" => Ok(Self::NewHost { host_id: payload::<NewHostPayload>(frame)?.host_id }),
            "left_lobby" => Ok(Self::LeftLobby),
            "game_started" => {
                let p: GameStartedPayload = payload(frame)?;
                Ok(Self::GameStarted { lobby: p.lobby, board: p.board, game: p.game })
            }
            "game_update" => {
                let p: GameUpdatePayload = payload(frame)?;
                Ok(Self::GameUpdate { lobby_id: p.lobby_id, game: p.game })
            }
            "error" => {
                let p: ErrorPayload = payload(frame)?;
                Ok(Self::Error { message: p.message })
            }
            other => Err(EventError::Unknown(other.to_owned())),
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

fn payload<T: DeserializeOwned>(frame: &Frame) -> Result<T, EventError> {
    let data = match &frame.data {
        Value::Null => json!({}),
        other => other.clone(),
    };
    serde_json::from_value(data).map_err(|source| EventError::InvalidPayload { event: frame.event.clone(), source })
}

fn default_max_players() -> u8 {
    DEFAULT_MAX_PLAYERS
}

#[derive(Deserialize)]
struct UsernamePayload {
    username: String,
}

#[derive(Deserialize)]
struct CreateLobbyPayload {
    #[serde(default)]
    name: String,
    #[serde(default = "default_max_players", deserialize_with = "count")]
    max_players: u8,
}

#[derive(Deserialize)]
struct LobbyIdPayload {
    lobby_id: String,
}

#[derive(Deserialize)]
struct RejoinPayload {
    lobby_id: String,
    #[serde(default)]
    player_id: Option<String>,
}

#[derive(Deserialize)]
struct DrawCardPayload {
    lobby_id: String,
    #[serde(default, deserialize_with = "optional_count")]
    slot: Option<u8>,
}

#[derive(Deserialize)]
struct ClaimRoutePayload {
    lobby_id: String,
    from: String,
    to: String,
    #[serde(default)]
    cards: Vec<CardColor>,
}

#[derive(Deserialize)]
struct LobbyListPayload {
    #[serde(default)]
    lobbies: Vec<LobbySummary>,
}

#[derive(Deserialize)]
struct LobbyCreatedPayload {
    #[serde(default)]
    lobby_id: Option<String>,
}

#[derive(Deserialize)]
struct LobbyJoinedPayload {
    lobby: Lobby,
    player_id: String,
}

#[derive(Deserialize)]
struct PlayerJoinedPayload {
    lobby: Lobby,
    player: Player,
}

#[derive(Deserialize)]
struct LobbyPayload {
    lobby: Lobby,
}

#[derive(Deserialize)]
struct GameStartedPayload {
    lobby: Lobby,
    #[serde(default)]
    board: Option<Value>,
    #[serde(default)]
    game: Option<GameView>,
}

#[derive(Deserialize)]
struct GameUpdatePayload {
    lobby_id: String,
    game: GameView,
}

#[derive(Deserialize)]
struct NewHostPayload {
    host_id: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
