//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the lobby rules so route handlers can stay focused on
//! protocol translation. Services never touch sockets: they return the
//! [`Push`]es to deliver and the transport layer sends them.

pub mod board;
pub mod game;
pub mod lobby;
pub mod reaper;

use frames::ServerEvent;
use uuid::Uuid;

/// Stable, grepable code attached to every service error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Diagnostic only: logged with the failure, nothing retries on it.
    fn retryable(&self) -> bool {
        false
    }
}

/// One event addressed to one connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Push {
    pub to: Uuid,
    pub event: ServerEvent,
}

impl Push {
    #[must_use]
    pub fn new(to: Uuid, event: ServerEvent) -> Self {
        Self { to, event }
    }
}
