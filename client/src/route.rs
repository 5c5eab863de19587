//! URL surface of the front-end.
//!
//! `/` is the lobby browser, `/lobby/<id>` deep-links into a room and
//! `/game/<id>` is the game view. Anything else is kept verbatim so that
//! navigation can round-trip it.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use std::fmt;

/// A parsed location path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Lobby(String),
    Game(String),
    Other(String),
}

impl Route {
    /// Parse a location path. Query strings and fragments are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut parts = path.split('/').skip(1);
        match (parts.next(), parts.next()) {
            (None | Some(""), _) => Self::Home,
            (Some("lobby"), Some(id)) if !id.is_empty() => Self::Lobby(id.to_owned()),
            (Some("game"), Some(id)) if !id.is_empty() => Self::Game(id.to_owned()),
            _ => Self::Other(path.to_owned()),
        }
    }

    /// Lobby ID named by a room deep link.
    #[must_use]
    pub fn lobby_id(&self) -> Option<&str> {
        match self {
            Self::Lobby(id) => Some(id),
            _ => None,
        }
    }

    /// Absolute URL for this route under `origin` (e.g. `http://host:3000`).
    #[must_use]
    pub fn url(&self, origin: &str) -> String {
        format!("{}{self}", origin.trim_end_matches('/'))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Lobby(id) => write!(f, "/lobby/{id}"),
            Self::Game(id) => write!(f, "/game/{id}"),
            Self::Other(path) => f.write_str(path),
        }
    }
}

impl From<&str> for Route {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}
