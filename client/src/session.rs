//! Lobby session: the local view of which screen is active and which
//! lobby/player this client represents.
//!
//! DESIGN
//! ======
//! `Session` is a one-way reducer over two inputs:
//! - user actions (`set_username`, `join_lobby`, ...) which validate locally
//!   and return the events to send;
//! - server pushes (`apply`) which replace local state wholesale.
//!
//! Sends are fire-and-forget. An action never changes the mirrored lobby
//! itself; state only moves when the matching push arrives. A request that
//! never gets a push leaves the session where it was.
//!
//! DEEP LINKS
//! ==========
//! The visible URL follows lobby membership (`/lobby/<id>` while in a room,
//! `/` otherwise). A `/lobby/<id>` location seen before the username is
//! registered becomes a pending auto-join that fires once, right after
//! registration, and is then discarded.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use frames::{ClientEvent, Lobby, LobbySummary, ServerEvent};
use tracing::debug;

use crate::effect::Effect;
use crate::error::{MAX_PLAYERS, MIN_PLAYERS, MIN_USERNAME_CHARS, ValidationError};
use crate::route::Route;

/// Where the session is in the lobby lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No username registered yet.
    #[default]
    NoUsername,
    /// Registered and looking at the lobby list.
    Browsing,
    /// Registered; the deep-link auto-join has been sent and not yet answered.
    JoiningFromLink,
    /// Seated in a lobby room.
    InLobbyRoom,
    /// The lobby's game has started and the host navigated to the game view.
    InGame,
}

/// Screen the host should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Username,
    Browser,
    LobbyRoom,
    Game,
}

impl Phase {
    #[must_use]
    pub fn screen(self) -> Screen {
        match self {
            Self::NoUsername => Screen::Username,
            Self::Browsing | Self::JoiningFromLink => Screen::Browser,
            Self::InLobbyRoom => Screen::LobbyRoom,
            Self::InGame => Screen::Game,
        }
    }
}

/// Client-side lobby session.
#[derive(Clone, Debug)]
pub struct Session {
    phase: Phase,
    username: Option<String>,
    /// A `set_username` has been sent and not yet answered.
    registration_pending: bool,
    lobby: Option<Lobby>,
    player_id: Option<String>,
    pending_lobby_id: Option<String>,
    location: Route,
    lobbies: Vec<LobbySummary>,
}

impl Session {
    /// Start a session at the location the page was loaded from.
    #[must_use]
    pub fn new(location: Route) -> Self {
        let pending_lobby_id = location.lobby_id().map(str::to_owned);
        Self {
            phase: Phase::NoUsername,
            username: None,
            registration_pending: false,
            lobby: None,
            player_id: None,
            pending_lobby_id,
            location,
            lobbies: Vec::new(),
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn screen(&self) -> Screen {
        self.phase.screen()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.username.is_some()
    }

    /// The mirrored lobby, exactly as last pushed.
    #[must_use]
    pub fn lobby(&self) -> Option<&Lobby> {
        self.lobby.as_ref()
    }

    #[must_use]
    pub fn current_lobby_id(&self) -> Option<&str> {
        self.lobby.as_ref().map(|l| l.id.as_str())
    }

    #[must_use]
    pub fn player_id(&self) -> Option<&str> {
        self.player_id.as_deref()
    }

    #[must_use]
    pub fn pending_lobby_id(&self) -> Option<&str> {
        self.pending_lobby_id.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> &Route {
        &self.location
    }

    #[must_use]
    pub fn lobbies(&self) -> &[LobbySummary] {
        &self.lobbies
    }

    /// True when this session's player hosts the mirrored lobby.
    #[must_use]
    pub fn is_host(&self) -> bool {
        match (&self.lobby, &self.player_id) {
            (Some(lobby), Some(player_id)) => lobby.host == *player_id,
            _ => false,
        }
    }

    /// Shareable deep link to the current lobby.
    #[must_use]
    pub fn share_url(&self, origin: &str) -> Option<String> {
        let id = self.current_lobby_id()?;
        Some(Route::Lobby(id.to_owned()).url(origin))
    }

    // =========================================================================
    // USER ACTIONS
    // =========================================================================

    /// Register a username. Sends exactly one `set_username` per session
    /// unless the server rejects it.
    ///
    /// # Errors
    ///
    /// `UsernameTooShort` for fewer than two characters after trimming,
    /// `AlreadyRegistered` once registered or while a registration is in flight.
    pub fn set_username(&mut self, raw: &str) -> Result<Vec<Effect>, ValidationError> {
        let username = raw.trim();
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(ValidationError::UsernameTooShort);
        }
        if self.username.is_some() || self.registration_pending {
            return Err(ValidationError::AlreadyRegistered);
        }
        self.registration_pending = true;
        Ok(vec![Effect::Send(ClientEvent::SetUsername { username: username.to_owned() })])
    }

    /// Ask the server to create a lobby. A blank name becomes `"<username>'s Game"`.
    ///
    /// # Errors
    ///
    /// `NotRegistered` before registration, `InvalidMaxPlayers` outside 2..=5.
    pub fn create_lobby(&mut self, name: &str, max_players: u8) -> Result<Vec<Effect>, ValidationError> {
        let username = self.require_registered()?;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
            return Err(ValidationError::InvalidMaxPlayers);
        }
        let name = match name.trim() {
            "" => format!("{username}'s Game"),
            trimmed => trimmed.to_owned(),
        };
        Ok(vec![Effect::Send(ClientEvent::CreateLobby { name, max_players })])
    }

    /// # Errors
    ///
    /// `NotRegistered` before registration, `EmptyLobbyId` for a blank code.
    pub fn join_lobby(&mut self, lobby_id: &str) -> Result<Vec<Effect>, ValidationError> {
        self.require_registered()?;
        let lobby_id = lobby_id.trim();
        if lobby_id.is_empty() {
            return Err(ValidationError::EmptyLobbyId);
        }
        Ok(vec![Effect::Send(ClientEvent::JoinLobby { lobby_id: lobby_id.to_owned() })])
    }

    /// # Errors
    ///
    /// `NotInLobby` when no lobby is mirrored.
    pub fn leave_lobby(&mut self) -> Result<Vec<Effect>, ValidationError> {
        if self.lobby.is_none() {
            return Err(ValidationError::NotInLobby);
        }
        Ok(vec![Effect::Send(ClientEvent::LeaveLobby)])
    }

    /// # Errors
    ///
    /// `NotRegistered` before registration.
    pub fn refresh_lobbies(&mut self) -> Result<Vec<Effect>, ValidationError> {
        self.require_registered()?;
        Ok(vec![
            Effect::Send(ClientEvent::GetLobbyList),
            Effect::success("Refreshing lobbies..."),
        ])
    }

    /// # Errors
    ///
    /// `NotInLobby` without a mirrored lobby, `NotHost` when another player hosts it.
    pub fn start_game(&mut self) -> Result<Vec<Effect>, ValidationError> {
        let Some(lobby) = &self.lobby else {
            return Err(ValidationError::NotInLobby);
        };
        if !self.is_host() {
            return Err(ValidationError::NotHost);
        }
        Ok(vec![Effect::Send(ClientEvent::StartGame { lobby_id: lobby.id.clone() })])
    }

    /// Return from the game view (or a room) to the lobby browser.
    ///
    /// # Errors
    ///
    /// `NotRegistered` before registration.
    pub fn back_to_browser(&mut self) -> Result<Vec<Effect>, ValidationError> {
        self.require_registered()?;
        let mut effects = Vec::new();
        if self.lobby.is_some() {
            effects.push(Effect::Send(ClientEvent::LeaveLobby));
        }
        self.phase = Phase::Browsing;
        effects.push(Effect::Send(ClientEvent::GetLobbyList));
        effects.extend(self.push_url(Route::Home));
        Ok(effects)
    }

    /// Browser back/forward landed on `route`. Re-derive the intended state
    /// from it and reconcile against the mirrored lobby.
    pub fn navigate(&mut self, route: Route) -> Vec<Effect> {
        self.location = route.clone();
        match route {
            Route::Lobby(id) => {
                if self.current_lobby_id() == Some(id.as_str()) {
                    self.phase = Phase::InLobbyRoom;
                    Vec::new()
                } else if self.is_registered() {
                    vec![Effect::Send(ClientEvent::JoinLobby { lobby_id: id })]
                } else {
                    self.pending_lobby_id = Some(id);
                    Vec::new()
                }
            }
            Route::Home => {
                let mut effects = Vec::new();
                if self.lobby.is_some() {
                    effects.push(Effect::Send(ClientEvent::LeaveLobby));
                }
                if self.is_registered() {
                    self.phase = Phase::Browsing;
                }
                effects
            }
            Route::Game(_) | Route::Other(_) => Vec::new(),
        }
    }

    // =========================================================================
    // PUSH EVENTS
    // =========================================================================

    /// Fold one server push into the session.
    pub fn apply(&mut self, event: ServerEvent) -> Vec<Effect> {
        debug!(event = event.name(), phase = ?self.phase, "session: apply");
        match event {
            ServerEvent::UsernameSet { username } => self.on_username_set(username),
            ServerEvent::LobbyListUpdate { lobbies } => {
                self.lobbies = lobbies;
                Vec::new()
            }
            ServerEvent::LobbyCreated { .. } => vec![Effect::success("Lobby created successfully!")],
            ServerEvent::LobbyJoined { lobby, player_id } => {
                let route = Route::Lobby(lobby.id.clone());
                self.lobby = Some(lobby);
                self.player_id = Some(player_id);
                self.phase = Phase::InLobbyRoom;
                self.push_url(route)
            }
            ServerEvent::PlayerJoined { lobby, player } => {
                if !self.replace_current(lobby) {
                    return Vec::new();
                }
                vec![Effect::success(format!("{} joined the lobby", player.username))]
            }
            ServerEvent::PlayerLeft { lobby } => {
                if !self.replace_current(lobby) {
                    return Vec::new();
                }
                vec![Effect::error("A player left the lobby")]
            }
            ServerEvent::NewHost { host_id } => {
                if self.player_id.as_deref() == Some(host_id.as_str()) {
                    vec![Effect::success("You are now the host!")]
                } else {
                    Vec::new()
                }
            }
            ServerEvent::LeftLobby => {
                self.lobby = None;
                self.player_id = None;
                if self.is_registered() {
                    self.phase = Phase::Browsing;
                }
                let mut effects = vec![Effect::success("Left the lobby")];
                effects.extend(self.push_url(Route::Home));
                effects
            }
            ServerEvent::GameStarted { lobby, .. } => {
                let route = Route::Game(lobby.id.clone());
                if !self.replace_current(lobby) {
                    return Vec::new();
                }
                self.phase = Phase::InGame;
                self.location = route.clone();
                vec![Effect::Navigate(route)]
            }
            // Board and hands belong to the game view.
            ServerEvent::GameUpdate { .. } => Vec::new(),
            ServerEvent::Error { message } => {
                self.registration_pending = false;
                if self.phase == Phase::JoiningFromLink {
                    self.phase = Phase::Browsing;
                }
                vec![Effect::error(message)]
            }
        }
    }

    fn on_username_set(&mut self, username: String) -> Vec<Effect> {
        self.registration_pending = false;
        let first = self.username.is_none();
        self.username = Some(username);
        if !first {
            return Vec::new();
        }

        self.phase = Phase::Browsing;
        match self.pending_lobby_id.take() {
            Some(lobby_id) => {
                debug!(%lobby_id, "session: auto-joining deep-linked lobby");
                self.phase = Phase::JoiningFromLink;
                vec![Effect::Send(ClientEvent::JoinLobby { lobby_id })]
            }
            None => Vec::new(),
        }
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn require_registered(&self) -> Result<&str, ValidationError> {
        self.username.as_deref().ok_or(ValidationError::NotRegistered)
    }

    /// Replace the mirrored lobby if `lobby` is a newer snapshot of it.
    fn replace_current(&mut self, lobby: Lobby) -> bool {
        if self.current_lobby_id() != Some(lobby.id.as_str()) {
            debug!(lobby_id = %lobby.id, "session: ignoring push for another lobby");
            return false;
        }
        self.lobby = Some(lobby);
        true
    }

    fn push_url(&mut self, route: Route) -> Vec<Effect> {
        if self.location == route {
            return Vec::new();
        }
        self.location = route.clone();
        vec![Effect::PushUrl(route)]
    }
}
