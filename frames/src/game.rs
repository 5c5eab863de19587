//! Game records as they appear on the wire.
//!
//! `GameView` is always addressed to one recipient: public state is the same
//! for everyone, `hand` is only filled in for the player it belongs to.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::lobby::{count, parse_count};

/// Train card colours. `Joker` is the locomotive wildcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Pink,
    Black,
    White,
    Joker,
}

impl CardColor {
    pub const ALL: [Self; 9] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Pink,
        Self::Black,
        Self::White,
        Self::Joker,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Pink => "pink",
            Self::Black => "black",
            Self::White => "white",
            Self::Joker => "joker",
        }
    }

    /// Case-insensitive lookup by name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }
}

impl std::fmt::Display for CardColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Train colours, one per seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Black,
}

impl PlayerColor {
    /// Assignment order.
    pub const ALL: [Self; 5] = [Self::Red, Self::Blue, Self::Green, Self::Yellow, Self::Black];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Black => "black",
        }
    }
}

/// Destination ticket: connect `from` and `to` for `points`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub from: String,
    pub to: String,
    #[serde(deserialize_with = "count")]
    pub points: u32,
}

/// One route on the board, with its claim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub from: String,
    pub to: String,
    #[serde(deserialize_with = "count")]
    pub length: u8,
    /// `None` for grey routes, which take any single colour.
    #[serde(default)]
    pub color: Option<CardColor>,
    /// Jokers a ferry route demands.
    #[serde(default, deserialize_with = "optional_count")]
    pub joker_cost: Option<u8>,
    #[serde(default)]
    pub tunnel: bool,
    /// Player ID of whoever claimed it.
    #[serde(default)]
    pub owner: Option<String>,
}

/// Public state of one seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player_id: String,
    pub color: PlayerColor,
    #[serde(deserialize_with = "count")]
    pub trains_left: u32,
    #[serde(deserialize_with = "count")]
    pub score: u32,
    /// Cards in hand.
    #[serde(deserialize_with = "count")]
    pub cards: u32,
    /// Tickets held.
    #[serde(deserialize_with = "count")]
    pub tickets: u32,
}

/// Private state of the recipient's own seat.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    #[serde(default, deserialize_with = "card_counts")]
    pub cards: BTreeMap<CardColor, u32>,
    #[serde(default)]
    pub tickets: Vec<Ticket>,
}

impl Hand {
    #[must_use]
    pub fn held(&self, color: CardColor) -> u32 {
        self.cards.get(&color).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.cards.values().sum()
    }
}

/// A running game as seen by one recipient.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameView {
    #[serde(default)]
    pub cities: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Track>,
    /// Seats in turn order.
    #[serde(default)]
    pub seats: Vec<Seat>,
    #[serde(default)]
    pub face_up: Vec<CardColor>,
    /// Player ID whose turn it is.
    #[serde(default)]
    pub turn: Option<String>,
    #[serde(default)]
    pub hand: Option<Hand>,
}

impl GameView {
    #[must_use]
    pub fn seat(&self, player_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.player_id == player_id)
    }
}

pub(crate) fn optional_count<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => parse_count(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a count, got {value}"))),
    }
}

fn card_counts<'de, D>(deserializer: D) -> Result<BTreeMap<CardColor, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<CardColor, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(color, value)| {
            parse_count(&value)
                .map(|n| (color, n))
                .ok_or_else(|| serde::de::Error::custom(format!("expected a card count, got {value}")))
        })
        .collect()
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
