//! Lobby service: registry rules for usernames, lobbies, game start and play.
//!
//! DESIGN
//! ======
//! Every operation takes the registry by `&mut` (the caller holds the write
//! lock) and returns the pushes it produced, in delivery order. Nothing here
//! sends frames or awaits, so each operation is applied atomically and can be
//! tested without sockets.
//!
//! A connection's player ID is its connection UUID rendered as a string.
//! Whenever the set of open lobbies changes, every registered connection
//! receives a fresh `lobby_list_update`.
//!
//! STARTED LOBBIES
//! ===============
//! Starting a game sends every member to the game page, which closes their
//! lobby-page sockets. A dropped socket therefore keeps its seat in a
//! started lobby; only `leave_lobby` gives it up. The game page attaches a
//! fresh connection with `rejoin_game`, naming the seat it plays as. That
//! connection becomes a watcher and receives the lobby's pushes alongside
//! any still-connected members. A started lobby with nobody connected is
//! marked abandoned and closed by the reaper after `game_ttl`.

use std::sync::Arc;
use std::time::Instant;

use frames::{CardColor, ClientEvent, Frame, Lobby, LobbySummary, Player, ServerEvent};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use super::game::{GameError, GameState};
use super::{ErrorCode, Push};
use crate::state::{ConnectedClient, LobbyState, Registry};

pub const MIN_USERNAME_CHARS: usize = 2;
pub const MAX_USERNAME_CHARS: usize = 32;
pub const MIN_PLAYERS: u8 = 2;
/// One per player colour.
pub const MAX_PLAYERS: u8 = 5;

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("Username must be between 2 and 32 characters")]
    InvalidUsername,
    #[error("Set a username first")]
    UsernameRequired,
    #[error("Lobbies hold between 2 and 5 players, got {0}")]
    InvalidMaxPlayers(u8),
    #[error("Too many open lobbies, try again later")]
    TooManyLobbies,
    #[error("Lobby {0} not found")]
    NotFound(String),
    #[error("Lobby is full")]
    Full,
    #[error("Game already started")]
    GameStarted,
    #[error("Game has not started yet")]
    GameNotStarted,
    #[error("You are not in this lobby")]
    NotInLobby,
    #[error("Only the host can start the game")]
    NotHost,
    #[error("At least 2 players are needed to start")]
    NotEnoughPlayers,
    #[error("This game has no board to play on")]
    NoGame,
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("unknown connection: {0}")]
    UnknownClient(Uuid),
}

impl ErrorCode for LobbyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUsername => "E_USERNAME_INVALID",
            Self::UsernameRequired => "E_USERNAME_REQUIRED",
            Self::InvalidMaxPlayers(_) => "E_INVALID_MAX_PLAYERS",
            Self::TooManyLobbies => "E_TOO_MANY_LOBBIES",
            Self::NotFound(_) => "E_LOBBY_NOT_FOUND",
            Self::Full => "E_LOBBY_FULL",
            Self::GameStarted => "E_GAME_STARTED",
            Self::GameNotStarted => "E_GAME_NOT_STARTED",
            Self::NotInLobby => "E_NOT_IN_LOBBY",
            Self::NotHost => "E_NOT_HOST",
            Self::NotEnoughPlayers => "E_NOT_ENOUGH_PLAYERS",
            Self::NoGame => "E_NO_GAME",
            Self::Game(e) => e.error_code(),
            Self::UnknownClient(_) => "E_UNKNOWN_CLIENT",
        }
    }

    /// Diagnostic only: a later identical request may succeed.
    fn retryable(&self) -> bool {
        matches!(self, Self::TooManyLobbies | Self::Full)
    }
}

/// How a connection leaves its lobby.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Departure {
    /// `leave_lobby`, or moving on to another lobby.
    Quit,
    /// The socket closed.
    Dropped,
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Register a new connection.
pub fn connect(registry: &mut Registry, client_id: Uuid, tx: mpsc::Sender<Frame>) {
    registry.clients.insert(client_id, ConnectedClient::new(tx));
    info!(%client_id, clients = registry.clients.len(), "lobby: client connected");
}

/// Drop a connection. An open lobby is left as if the connection had sent
/// `leave_lobby`; a seat in a started lobby is kept for `rejoin_game`.
pub fn disconnect(registry: &mut Registry, client_id: Uuid) -> Vec<Push> {
    let seated = seated_in(registry, client_id);
    let (watching, seat) = registry
        .clients
        .get(&client_id)
        .map(|c| (c.watching.clone(), c.seat.clone()))
        .unwrap_or_default();
    let mut pushes = detach(registry, client_id, Departure::Dropped);
    registry.clients.remove(&client_id);
    if seated.is_some() {
        pushes.extend(broadcast_list(registry));
    }
    info!(%client_id, ?seated, ?watching, ?seat, clients = registry.clients.len(), "lobby: client disconnected");
    pushes
}

/// Apply one client event.
///
/// # Errors
///
/// Returns the [`LobbyError`] of whichever operation the event maps to.
pub fn dispatch(registry: &mut Registry, client_id: Uuid, event: ClientEvent) -> Result<Vec<Push>, LobbyError> {
    match event {
        ClientEvent::SetUsername { username } => set_username(registry, client_id, &username),
        ClientEvent::CreateLobby { name, max_players } => create_lobby(registry, client_id, &name, max_players),
        ClientEvent::JoinLobby { lobby_id } => join_lobby(registry, client_id, &lobby_id),
        ClientEvent::LeaveLobby => leave_lobby(registry, client_id),
        ClientEvent::GetLobbyList => get_lobby_list(registry, client_id),
        ClientEvent::StartGame { lobby_id } => start_game(registry, client_id, &lobby_id),
        ClientEvent::RejoinGame { lobby_id, player_id } => {
            rejoin_game(registry, client_id, &lobby_id, player_id.as_deref())
        }
        ClientEvent::DrawCard { lobby_id, slot } => draw_card(registry, client_id, &lobby_id, slot),
        ClientEvent::ClaimRoute { lobby_id, from, to, cards } => {
            claim_route(registry, client_id, &lobby_id, &from, &to, &cards)
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a display name. Replies `username_set` then the current list.
///
/// # Errors
///
/// [`LobbyError::InvalidUsername`] when the trimmed name is outside 2..=32 chars.
pub fn set_username(registry: &mut Registry, client_id: Uuid, username: &str) -> Result<Vec<Push>, LobbyError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&len) {
        return Err(LobbyError::InvalidUsername);
    }

    client_mut(registry, client_id)?.username = Some(username.to_owned());
    info!(%client_id, username, "lobby: username set");

    Ok(vec![
        Push::new(client_id, ServerEvent::UsernameSet { username: username.to_owned() }),
        Push::new(client_id, list_update(registry)),
    ])
}

/// Open a new lobby hosted by the caller.
///
/// # Errors
///
/// Fails without a username, with a capacity outside 2..=5, or when the
/// registry already holds `max_lobbies` lobbies.
pub fn create_lobby(
    registry: &mut Registry,
    client_id: Uuid,
    name: &str,
    max_players: u8,
) -> Result<Vec<Push>, LobbyError> {
    let username = require_username(registry, client_id)?;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
        return Err(LobbyError::InvalidMaxPlayers(max_players));
    }
    // Leaving a lobby the caller sits in alone frees its slot.
    let freed = usize::from(sole_member(registry, client_id));
    if registry.lobbies.len() - freed >= registry.max_lobbies {
        return Err(LobbyError::TooManyLobbies);
    }

    let mut pushes = detach(registry, client_id, Departure::Quit);

    let lobby_id = generate_code(registry);
    let name = match name.trim() {
        "" => format!("{username}'s Game"),
        given => given.to_owned(),
    };
    let player_id = client_id.to_string();
    let lobby = Lobby {
        id: lobby_id.clone(),
        name,
        host: player_id.clone(),
        max_players,
        players: vec![Player { id: player_id.clone(), username }],
    };
    let seq = registry.next_seq();
    registry.lobbies.insert(lobby_id.clone(), LobbyState::new(lobby.clone(), seq));
    seat(registry, client_id, &lobby_id);
    info!(%client_id, %lobby_id, max_players, lobbies = registry.lobbies.len(), "lobby: created");

    pushes.push(Push::new(client_id, ServerEvent::LobbyCreated { lobby_id: Some(lobby_id) }));
    pushes.push(Push::new(client_id, ServerEvent::LobbyJoined { lobby, player_id }));
    pushes.extend(broadcast_list(registry));
    Ok(pushes)
}

/// Take a seat in an open lobby, leaving any other lobby first.
///
/// # Errors
///
/// Fails without a username, or when the lobby is unknown, full or started.
pub fn join_lobby(registry: &mut Registry, client_id: Uuid, lobby_id: &str) -> Result<Vec<Push>, LobbyError> {
    let username = require_username(registry, client_id)?;
    let lobby_id = normalize_code(lobby_id);
    let player_id = client_id.to_string();

    let state = registry
        .lobbies
        .get(&lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;
    if state.lobby.has_player(&player_id) {
        let lobby = state.lobby.clone();
        return Ok(vec![Push::new(client_id, ServerEvent::LobbyJoined { lobby, player_id })]);
    }
    if state.started {
        return Err(LobbyError::GameStarted);
    }
    if state.lobby.is_full() {
        return Err(LobbyError::Full);
    }

    let mut pushes = detach(registry, client_id, Departure::Quit);

    let player = Player { id: player_id.clone(), username };
    let state = registry
        .lobbies
        .get_mut(&lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;
    state.lobby.players.push(player.clone());
    let lobby = state.lobby.clone();
    seat(registry, client_id, &lobby_id);
    info!(%client_id, %lobby_id, players = lobby.players.len(), "lobby: joined");

    pushes.push(Push::new(client_id, ServerEvent::LobbyJoined { lobby: lobby.clone(), player_id }));
    for member in members(&lobby).filter(|id| *id != client_id) {
        pushes.push(Push::new(member, ServerEvent::PlayerJoined { lobby: lobby.clone(), player: player.clone() }));
    }
    pushes.extend(broadcast_list(registry));
    Ok(pushes)
}

/// Give up the caller's seat, or stop watching. In a started game the seat
/// is retired and its routes stay claimed. Always replies `left_lobby`.
///
/// # Errors
///
/// [`LobbyError::UnknownClient`] for an unregistered connection.
pub fn leave_lobby(registry: &mut Registry, client_id: Uuid) -> Result<Vec<Push>, LobbyError> {
    client_mut(registry, client_id)?;
    let seated = seated_in(registry, client_id);

    let mut pushes = vec![Push::new(client_id, ServerEvent::LeftLobby)];
    pushes.extend(detach(registry, client_id, Departure::Quit));
    if let Some(lobby_id) = seated {
        info!(%client_id, %lobby_id, "lobby: left");
        pushes.extend(broadcast_list(registry));
    }
    Ok(pushes)
}

/// Reply with the open lobbies.
///
/// # Errors
///
/// [`LobbyError::UnknownClient`] for an unregistered connection.
pub fn get_lobby_list(registry: &mut Registry, client_id: Uuid) -> Result<Vec<Push>, LobbyError> {
    client_mut(registry, client_id)?;
    Ok(vec![Push::new(client_id, list_update(registry))])
}

/// Start the game in the caller's lobby and push `game_started` to every
/// member. With a map loaded, a game is dealt and each member's push carries
/// their own view of it.
///
/// # Errors
///
/// Fails unless the caller hosts the open lobby and at least 2 players are seated.
pub fn start_game(registry: &mut Registry, client_id: Uuid, lobby_id: &str) -> Result<Vec<Push>, LobbyError> {
    let lobby_id = normalize_code(lobby_id);
    let player_id = client_id.to_string();
    let assets = Arc::clone(&registry.assets);

    let state = registry
        .lobbies
        .get_mut(&lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;
    if !state.lobby.has_player(&player_id) {
        return Err(LobbyError::NotInLobby);
    }
    if state.lobby.host != player_id {
        return Err(LobbyError::NotHost);
    }
    if state.started {
        return Err(LobbyError::GameStarted);
    }
    if state.lobby.players.len() < usize::from(MIN_PLAYERS) {
        return Err(LobbyError::NotEnoughPlayers);
    }

    let player_ids: Vec<String> = state.lobby.players.iter().map(|p| p.id.clone()).collect();
    state.game = assets
        .map
        .as_ref()
        .map(|map| GameState::deal(map, &player_ids, &mut rand::rng()));
    state.started = true;
    let lobby = state.lobby.clone();
    let game = state.game.as_ref();
    info!(%client_id, %lobby_id, players = lobby.players.len(), dealt = game.is_some(), "lobby: game started");

    let mut pushes: Vec<Push> = player_ids
        .iter()
        .filter_map(|id| id.parse::<Uuid>().ok().map(|member| (member, id)))
        .map(|(member, id)| {
            let event = ServerEvent::GameStarted {
                lobby: lobby.clone(),
                board: assets.geometry.clone(),
                game: game.map(|g| g.view(Some(id))),
            };
            Push::new(member, event)
        })
        .collect();
    pushes.extend(broadcast_list(registry));
    Ok(pushes)
}

/// Attach the caller to a started game, as the seat `player_id` or as a
/// plain watcher. Replies `game_started` with the board and the caller's view.
///
/// A seat is held by the last connection that claimed it. A connection
/// already seated in the lobby just gets the reply.
///
/// # Errors
///
/// Fails when the lobby is unknown, its game has not started, or
/// `player_id` is not one of its seats.
pub fn rejoin_game(
    registry: &mut Registry,
    client_id: Uuid,
    lobby_id: &str,
    player_id: Option<&str>,
) -> Result<Vec<Push>, LobbyError> {
    let lobby_id = normalize_code(lobby_id);
    client_mut(registry, client_id)?;
    let state = registry
        .lobbies
        .get(&lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;
    if !state.started {
        return Err(LobbyError::GameNotStarted);
    }
    if player_id.is_some_and(|id| !state.lobby.has_player(id)) {
        return Err(LobbyError::NotInLobby);
    }

    let mut pushes = Vec::new();
    if seated_in(registry, client_id).as_deref() != Some(lobby_id.as_str()) {
        let watching_here = registry
            .clients
            .get(&client_id)
            .is_some_and(|c| c.watching.as_deref() == Some(lobby_id.as_str()));
        if !watching_here {
            let left = seated_in(registry, client_id);
            pushes.extend(detach(registry, client_id, Departure::Quit));
            if left.is_some() {
                pushes.extend(broadcast_list(registry));
            }
            if let Some(state) = registry.lobbies.get_mut(&lobby_id) {
                state.watchers.push(client_id);
            }
        }

        if let Some(id) = player_id {
            for (other_id, other) in &mut registry.clients {
                if *other_id != client_id && other.seat.as_deref() == Some(id) {
                    other.seat = None;
                }
            }
        }
        let client = client_mut(registry, client_id)?;
        client.watching = Some(lobby_id.clone());
        client.seat = player_id.map(str::to_owned);
    }
    refresh_abandoned(registry, &lobby_id);

    let viewer = viewer_of(registry, client_id);
    let state = registry
        .lobbies
        .get(&lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.clone()))?;
    let event = ServerEvent::GameStarted {
        lobby: state.lobby.clone(),
        board: registry.assets.geometry.clone(),
        game: state.game.as_ref().map(|g| g.view(viewer.as_deref())),
    };
    info!(%client_id, %lobby_id, seat = ?viewer, watchers = state.watchers.len(), "lobby: rejoined game");
    pushes.push(Push::new(client_id, event));
    Ok(pushes)
}

/// Draw a face-up card (`slot`) or a deck card for the caller's seat.
/// Pushes `game_update` to everyone following the lobby.
///
/// # Errors
///
/// Fails when the caller holds no seat in the started game, or with the
/// [`GameError`] of an illegal draw.
pub fn draw_card(
    registry: &mut Registry,
    client_id: Uuid,
    lobby_id: &str,
    slot: Option<u8>,
) -> Result<Vec<Push>, LobbyError> {
    let lobby_id = normalize_code(lobby_id);
    let player_id = acting_player(registry, client_id, &lobby_id)?;

    let card = game_mut(registry, &lobby_id)?.draw_card(&player_id, slot, &mut rand::rng())?;
    info!(%client_id, %lobby_id, %player_id, ?slot, %card, "lobby: card drawn");
    Ok(game_updates(registry, &lobby_id))
}

/// Claim a route between `from` and `to` for the caller's seat, paying `cards`.
/// Pushes `game_update` to everyone following the lobby.
///
/// # Errors
///
/// Fails when the caller holds no seat in the started game, or with the
/// [`GameError`] of an illegal claim.
pub fn claim_route(
    registry: &mut Registry,
    client_id: Uuid,
    lobby_id: &str,
    from: &str,
    to: &str,
    cards: &[CardColor],
) -> Result<Vec<Push>, LobbyError> {
    let lobby_id = normalize_code(lobby_id);
    let player_id = acting_player(registry, client_id, &lobby_id)?;

    let score = game_mut(registry, &lobby_id)?.claim_route(&player_id, from, to, cards)?;
    info!(%client_id, %lobby_id, %player_id, from, to, score, "lobby: route claimed");
    Ok(game_updates(registry, &lobby_id))
}

/// Close started lobbies that have had nobody connected for `game_ttl`.
/// Returns how many were closed.
pub fn reap_abandoned(registry: &mut Registry, now: Instant) -> usize {
    let ttl = registry.game_ttl;
    let expired: Vec<String> = registry
        .lobbies
        .iter()
        .filter(|(_, s)| s.abandoned_since.is_some_and(|since| now.saturating_duration_since(since) >= ttl))
        .map(|(id, _)| id.clone())
        .collect();
    for lobby_id in &expired {
        registry.lobbies.remove(lobby_id);
        info!(%lobby_id, lobbies = registry.lobbies.len(), "lobby: abandoned game closed");
    }
    expired.len()
}

/// Open lobbies in creation order.
#[must_use]
pub fn lobby_list(registry: &Registry) -> Vec<LobbySummary> {
    let mut open: Vec<&LobbyState> = registry.lobbies.values().filter(|s| !s.started).collect();
    open.sort_by_key(|s| s.seq);
    open.into_iter().map(|s| LobbySummary::from(&s.lobby)).collect()
}

// =============================================================================
// HELPERS
// =============================================================================

/// Take the caller out of whatever lobby it sits in or watches.
///
/// Quitting gives the seat up (a watcher gives up its claimed seat). A
/// dropped connection gives up an open lobby seat but keeps a started one.
fn detach(registry: &mut Registry, client_id: Uuid, departure: Departure) -> Vec<Push> {
    let Some(client) = registry.clients.get_mut(&client_id) else {
        return Vec::new();
    };
    let watching = client.watching.take();
    let claimed = client.seat.take();
    let seated = client.lobby_id.take();

    let mut pushes = Vec::new();
    if let Some(lobby_id) = watching {
        if let Some(state) = registry.lobbies.get_mut(&lobby_id) {
            state.watchers.retain(|id| *id != client_id);
        }
        match (departure, claimed) {
            (Departure::Quit, Some(player_id)) => pushes.extend(vacate(registry, &lobby_id, &player_id)),
            _ => refresh_abandoned(registry, &lobby_id),
        }
    }
    if let Some(lobby_id) = seated {
        let started = registry.lobbies.get(&lobby_id).is_some_and(|s| s.started);
        if started && departure == Departure::Dropped {
            refresh_abandoned(registry, &lobby_id);
        } else {
            pushes.extend(vacate(registry, &lobby_id, &client_id.to_string()));
        }
    }
    pushes
}

/// Remove a player from a lobby. Everyone following it gets `new_host` (when
/// the host left), `player_left` and, with a game running, `game_update`.
/// An emptied lobby is closed.
fn vacate(registry: &mut Registry, lobby_id: &str, player_id: &str) -> Vec<Push> {
    let Some(state) = registry.lobbies.get_mut(lobby_id) else {
        return Vec::new();
    };
    if !state.lobby.has_player(player_id) {
        return Vec::new();
    }
    state.lobby.players.retain(|p| p.id != player_id);
    if let Some(game) = state.game.as_mut() {
        game.retire(player_id);
    }

    let mut events = Vec::new();
    if let Some(first) = state.lobby.players.first() {
        if state.lobby.host == player_id {
            state.lobby.host = first.id.clone();
            events.push(ServerEvent::NewHost { host_id: first.id.clone() });
        }
        events.push(ServerEvent::PlayerLeft { lobby: state.lobby.clone() });
    }
    let emptied = state.lobby.players.is_empty();

    for client in registry.clients.values_mut() {
        if client.seat.as_deref() == Some(player_id) {
            client.seat = None;
        }
    }
    if emptied {
        return close_lobby(registry, lobby_id);
    }

    let audience = audience(registry, lobby_id);
    let mut pushes = Vec::new();
    for event in events {
        for to in &audience {
            pushes.push(Push::new(*to, event.clone()));
        }
    }
    pushes.extend(game_updates(registry, lobby_id));
    refresh_abandoned(registry, lobby_id);
    pushes
}

/// Delete a lobby. Its watchers are detached and told with `left_lobby`.
fn close_lobby(registry: &mut Registry, lobby_id: &str) -> Vec<Push> {
    let Some(state) = registry.lobbies.remove(lobby_id) else {
        return Vec::new();
    };
    info!(%lobby_id, lobbies = registry.lobbies.len(), "lobby: closed");

    let mut pushes = Vec::new();
    for watcher in state.watchers {
        if let Some(client) = registry.clients.get_mut(&watcher) {
            client.watching = None;
            client.seat = None;
            pushes.push(Push::new(watcher, ServerEvent::LeftLobby));
        }
    }
    pushes
}

/// Live connections following a lobby: seated members in join order, then
/// watchers in rejoin order.
fn audience(registry: &Registry, lobby_id: &str) -> Vec<Uuid> {
    let Some(state) = registry.lobbies.get(lobby_id) else {
        return Vec::new();
    };
    members(&state.lobby)
        .filter(|id| {
            registry
                .clients
                .get(id)
                .is_some_and(|c| c.lobby_id.as_deref() == Some(lobby_id))
        })
        .chain(state.watchers.iter().copied())
        .collect()
}

/// Start or stop the abandonment clock of a started lobby.
fn refresh_abandoned(registry: &mut Registry, lobby_id: &str) {
    let live = !audience(registry, lobby_id).is_empty();
    let Some(state) = registry.lobbies.get_mut(lobby_id) else {
        return;
    };
    if !state.started {
        return;
    }
    if live {
        state.abandoned_since = None;
    } else if state.abandoned_since.is_none() {
        state.abandoned_since = Some(Instant::now());
        info!(%lobby_id, "lobby: game abandoned");
    }
}

/// `game_update` for everyone following the lobby, each with their own hand.
fn game_updates(registry: &Registry, lobby_id: &str) -> Vec<Push> {
    let Some(game) = registry.lobbies.get(lobby_id).and_then(|s| s.game.as_ref()) else {
        return Vec::new();
    };
    audience(registry, lobby_id)
        .into_iter()
        .map(|to| {
            let viewer = viewer_of(registry, to);
            let event = ServerEvent::GameUpdate { lobby_id: lobby_id.to_owned(), game: game.view(viewer.as_deref()) };
            Push::new(to, event)
        })
        .collect()
}

/// Player ID a connection plays as: its own when seated, its claim when watching.
fn viewer_of(registry: &Registry, client_id: Uuid) -> Option<String> {
    let client = registry.clients.get(&client_id)?;
    if client.lobby_id.is_some() {
        Some(client_id.to_string())
    } else {
        client.seat.clone()
    }
}

/// The seat the caller acts for in `lobby_id`.
fn acting_player(registry: &Registry, client_id: Uuid, lobby_id: &str) -> Result<String, LobbyError> {
    if !registry.lobbies.contains_key(lobby_id) {
        return Err(LobbyError::NotFound(lobby_id.to_owned()));
    }
    let client = registry
        .clients
        .get(&client_id)
        .ok_or(LobbyError::UnknownClient(client_id))?;
    if client.lobby_id.as_deref() == Some(lobby_id) {
        return Ok(client_id.to_string());
    }
    match (&client.watching, &client.seat) {
        (Some(watching), Some(seat)) if watching == lobby_id => Ok(seat.clone()),
        _ => Err(LobbyError::NotInLobby),
    }
}

fn game_mut<'a>(registry: &'a mut Registry, lobby_id: &str) -> Result<&'a mut GameState, LobbyError> {
    let state = registry
        .lobbies
        .get_mut(lobby_id)
        .ok_or_else(|| LobbyError::NotFound(lobby_id.to_owned()))?;
    if !state.started {
        return Err(LobbyError::GameNotStarted);
    }
    state.game.as_mut().ok_or(LobbyError::NoGame)
}

/// `lobby_list_update` for every registered connection.
fn broadcast_list(registry: &Registry) -> Vec<Push> {
    let event = list_update(registry);
    registry
        .clients
        .iter()
        .filter(|(_, client)| client.username.is_some())
        .map(|(id, _)| Push::new(*id, event.clone()))
        .collect()
}

fn list_update(registry: &Registry) -> ServerEvent {
    ServerEvent::LobbyListUpdate { lobbies: lobby_list(registry) }
}

fn members(lobby: &Lobby) -> impl Iterator<Item = Uuid> + '_ {
    lobby.players.iter().filter_map(|p| p.id.parse().ok())
}

fn client_mut(registry: &mut Registry, client_id: Uuid) -> Result<&mut ConnectedClient, LobbyError> {
    registry
        .clients
        .get_mut(&client_id)
        .ok_or(LobbyError::UnknownClient(client_id))
}

fn require_username(registry: &mut Registry, client_id: Uuid) -> Result<String, LobbyError> {
    client_mut(registry, client_id)?
        .username
        .clone()
        .ok_or(LobbyError::UsernameRequired)
}

fn seated_in(registry: &Registry, client_id: Uuid) -> Option<String> {
    registry.clients.get(&client_id).and_then(|c| c.lobby_id.clone())
}

fn sole_member(registry: &Registry, client_id: Uuid) -> bool {
    seated_in(registry, client_id)
        .and_then(|id| registry.lobbies.get(&id))
        .is_some_and(|s| s.lobby.players.len() == 1)
}

fn seat(registry: &mut Registry, client_id: Uuid, lobby_id: &str) {
    if let Some(client) = registry.clients.get_mut(&client_id) {
        client.lobby_id = Some(lobby_id.to_owned());
        client.watching = None;
        client.seat = None;
    }
}

fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Fresh lobby code not already in use.
fn generate_code(registry: &Registry) -> String {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..CODE_LEN)
            .map(|_| {
                let idx = rng.random_range(0..CODE_ALPHABET.len());
                CODE_ALPHABET[idx] as char
            })
            .collect();
        if !registry.lobbies.contains_key(&code) {
            return code;
        }
    }
}

#[cfg(test)]
#[path = "lobby_test.rs"]
mod tests;
