//! Side effects requested by the session.
//!
//! The session never touches the socket, history or screen itself. Each
//! operation returns the effects to carry out, in order, and the host (a
//! browser shell or the terminal client) performs them.

use frames::ClientEvent;

use crate::route::Route;

/// One side effect for the host to perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Send an event to the server.
    Send(ClientEvent),
    /// Replace the visible URL without reloading (history push).
    PushUrl(Route),
    /// Leave the lobby front-end entirely and load another page.
    Navigate(Route),
    /// Show a transient notice.
    Notify(Notice),
}

/// Tone of a transient notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient, human-readable notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }
}

impl Effect {
    pub(crate) fn success(message: impl Into<String>) -> Self {
        Self::Notify(Notice::success(message))
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::Notify(Notice::error(message))
    }
}
