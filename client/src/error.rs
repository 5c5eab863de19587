//! Local validation failures.
//!
//! A `ValidationError` blocks the action before anything is sent. Server
//! rejections arrive separately as `error` push events.

/// Minimum username length, in characters, after trimming.
pub const MIN_USERNAME_CHARS: usize = 2;

/// Smallest and largest lobby capacity a client may request.
pub const MIN_PLAYERS: u8 = 2;
pub const MAX_PLAYERS: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username must be at least 2 characters")]
    UsernameTooShort,
    #[error("Username is already set")]
    AlreadyRegistered,
    #[error("Set a username first")]
    NotRegistered,
    #[error("Lobbies hold between 2 and 5 players")]
    InvalidMaxPlayers,
    #[error("Lobby code is empty")]
    EmptyLobbyId,
    #[error("You are not in a lobby")]
    NotInLobby,
    #[error("Only the host can start the game")]
    NotHost,
}
