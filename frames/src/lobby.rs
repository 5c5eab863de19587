//! Lobby records as they appear on the wire.
//!
//! The server owns these; clients only ever hold whole copies taken from the
//! most recent push.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One seat in a lobby.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
}

/// A named, capacity-bounded pre-game room with one host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    pub id: String,
    pub name: String,
    /// Player ID of the current host.
    pub host: String,
    #[serde(deserialize_with = "count")]
    pub max_players: u8,
    /// Players in join order.
    #[serde(default)]
    pub players: Vec<Player>,
}

impl Lobby {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= usize::from(self.max_players)
    }

    #[must_use]
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    #[must_use]
    pub fn host_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.id == self.host)
    }
}

/// A row in the lobby browser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: String,
    pub name: String,
    /// Display name of the host (not the player ID).
    pub host: String,
    #[serde(deserialize_with = "count")]
    pub player_count: u8,
    #[serde(deserialize_with = "count")]
    pub max_players: u8,
}

impl LobbySummary {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.player_count >= self.max_players
    }
}

impl From<&Lobby> for LobbySummary {
    fn from(lobby: &Lobby) -> Self {
        let host = lobby
            .host_player()
            .map_or_else(|| lobby.host.clone(), |p| p.username.clone());
        Self {
            id: lobby.id.clone(),
            name: lobby.name.clone(),
            host,
            player_count: u8::try_from(lobby.players.len()).unwrap_or(u8::MAX),
            max_players: lobby.max_players,
        }
    }
}

/// Read a count from an integer, an integral float (protobuf carries every
/// number as a double) or a numeric string (HTML form values).
pub(crate) fn count<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    parse_count(&value).ok_or_else(|| serde::de::Error::custom(format!("expected a count, got {value}")))
}

/// Largest integer a double holds exactly.
const MAX_EXACT: f64 = 9_007_199_254_740_991.0;

pub(crate) fn parse_count<T: TryFrom<u64>>(value: &Value) -> Option<T> {
    let whole = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || !(0.0..=MAX_EXACT).contains(&f) {
                    return None;
                }
                whole_float(f)
            }
        },
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    T::try_from(whole).ok()
}

/// Caller checks `f` is a whole number in `0..=MAX_EXACT`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_float(f: f64) -> u64 {
    f as u64
}
