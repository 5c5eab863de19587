//! Board graph: cities, the routes between them and the ticket decks.
//!
//! DESIGN
//! ======
//! A map is three plain-text files:
//! - `cities.txt`: one city name per line
//! - `connections.txt`: `<from> <to> <length> [COLOR [TUNNEL] | FERRY <jokers> | TUNNEL]`
//! - `tickets.txt`: `<from> <to> <points> [LONG]`
//!
//! City names never contain spaces. Blank lines are skipped everywhere.
//! Two cities may be joined by more than one route (double routes), so
//! routes are kept as a list and looked up in either orientation.

use frames::{CardColor, Ticket};
use tracing::warn;

/// Points scored for claiming a route, by length.
pub const ROUTE_SCORES: [(u8, u32); 6] = [(1, 1), (2, 2), (3, 4), (4, 7), (6, 15), (8, 21)];

#[must_use]
pub fn route_score(length: u8) -> Option<u32> {
    ROUTE_SCORES.iter().find(|(l, _)| *l == length).map(|(_, score)| *score)
}

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("{file} line {line}: {reason}")]
    Malformed { file: &'static str, line: usize, reason: String },
    #[error("{file} line {line}: no score for route length {length}")]
    UnscoredLength { file: &'static str, line: usize, length: u8 },
}

/// What a route costs beyond its length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    /// Any single colour.
    Grey,
    Colored(CardColor),
    /// Any single colour, with at least `joker_cost` of the cards being jokers.
    Ferry { joker_cost: u8 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoardRoute {
    pub from: String,
    pub to: String,
    pub length: u8,
    pub kind: RouteKind,
    pub tunnel: bool,
    /// Player ID of the claimant.
    pub owner: Option<String>,
}

impl BoardRoute {
    #[must_use]
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        route_score(self.length).unwrap_or(0)
    }

    #[must_use]
    pub fn to_track(&self) -> frames::Track {
        let (color, joker_cost) = match self.kind {
            RouteKind::Grey => (None, None),
            RouteKind::Colored(color) => (Some(color), None),
            RouteKind::Ferry { joker_cost } => (None, Some(joker_cost)),
        };
        frames::Track {
            from: self.from.clone(),
            to: self.to.clone(),
            length: self.length,
            color,
            joker_cost,
            tunnel: self.tunnel,
            owner: self.owner.clone(),
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Board {
    pub cities: Vec<String>,
    pub routes: Vec<BoardRoute>,
}

impl Board {
    /// Parse the city list and the connection list.
    ///
    /// A connection naming a city missing from the list is kept and the
    /// city is added, with a warning.
    ///
    /// # Errors
    ///
    /// [`BoardError`] for a line that does not follow the connection format or
    /// a route length with no score.
    pub fn parse(cities: &str, connections: &str) -> Result<Self, BoardError> {
        let mut board = Self {
            cities: lines(cities).map(|(_, name)| name.to_owned()).collect(),
            routes: Vec::new(),
        };

        for (line, text) in lines(connections) {
            let route = parse_connection(line, text)?;
            for city in [&route.from, &route.to] {
                if !board.has_city(city) {
                    warn!(line, city = %city, "board: connection names an unlisted city");
                    board.cities.push(city.clone());
                }
            }
            board.routes.push(route);
        }

        Ok(board)
    }

    #[must_use]
    pub fn has_city(&self, name: &str) -> bool {
        self.cities.iter().any(|c| c == name)
    }

    /// Every route joining `a` and `b`.
    pub fn routes_between<'a>(&'a self, a: &'a str, b: &'a str) -> impl Iterator<Item = (usize, &'a BoardRoute)> + 'a {
        self.routes.iter().enumerate().filter(move |(_, r)| r.joins(a, b))
    }

    #[must_use]
    pub fn tracks(&self) -> Vec<frames::Track> {
        self.routes.iter().map(BoardRoute::to_track).collect()
    }
}

fn parse_connection(line: usize, text: &str) -> Result<BoardRoute, BoardError> {
    const FILE: &str = "connections.txt";
    let malformed = |reason: String| BoardError::Malformed { file: FILE, line, reason };

    let parts: Vec<&str> = text.split_whitespace().collect();
    let [from, to, length, rest @ ..] = parts.as_slice() else {
        return Err(malformed(format!("expected `<from> <to> <length>`, got {text:?}")));
    };
    let length: u8 = length
        .parse()
        .map_err(|_| malformed(format!("bad length {length:?}")))?;
    if route_score(length).is_none() {
        return Err(BoardError::UnscoredLength { file: FILE, line, length });
    }

    let (kind, tunnel) = match rest {
        [] => (RouteKind::Grey, false),
        ["TUNNEL"] => (RouteKind::Grey, true),
        ["FERRY", jokers] => {
            let joker_cost: u8 = jokers
                .parse()
                .map_err(|_| malformed(format!("bad ferry joker cost {jokers:?}")))?;
            if joker_cost > length {
                return Err(malformed(format!("ferry needs {joker_cost} jokers on a length {length} route")));
            }
            (RouteKind::Ferry { joker_cost }, false)
        }
        [color, tail @ ..] => {
            let color = CardColor::parse(color)
                .filter(|c| *c != CardColor::Joker)
                .ok_or_else(|| malformed(format!("unknown route colour {color:?}")))?;
            let tunnel = match tail {
                [] => false,
                ["TUNNEL"] => true,
                _ => return Err(malformed(format!("unexpected trailing fields {tail:?}"))),
            };
            (RouteKind::Colored(color), tunnel)
        }
    };

    Ok(BoardRoute { from: (*from).to_owned(), to: (*to).to_owned(), length, kind, tunnel, owner: None })
}

// =============================================================================
// MAP
// =============================================================================

/// A board plus its ticket decks: everything a new game is dealt from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GameMap {
    pub board: Board,
    pub tickets: Vec<Ticket>,
    pub long_tickets: Vec<Ticket>,
}

impl GameMap {
    /// Parse all three map files. Tickets naming a city the board does not
    /// know are skipped with a warning.
    ///
    /// # Errors
    ///
    /// [`BoardError`] for malformed connection or ticket lines.
    pub fn parse(cities: &str, connections: &str, tickets: &str) -> Result<Self, BoardError> {
        const FILE: &str = "tickets.txt";
        let board = Board::parse(cities, connections)?;
        let mut map = Self { board, tickets: Vec::new(), long_tickets: Vec::new() };

        for (line, text) in lines(tickets) {
            let malformed = |reason: String| BoardError::Malformed { file: FILE, line, reason };
            let parts: Vec<&str> = text.split_whitespace().collect();
            let (from, to, points, long) = match parts.as_slice() {
                [from, to, points] => (*from, *to, *points, false),
                [from, to, points, "LONG"] => (*from, *to, *points, true),
                _ => return Err(malformed(format!("expected `<from> <to> <points> [LONG]`, got {text:?}"))),
            };
            let points: u32 = points
                .parse()
                .map_err(|_| malformed(format!("bad points {points:?}")))?;
            if !map.board.has_city(from) || !map.board.has_city(to) {
                warn!(line, from, to, "board: ticket names an unknown city, skipped");
                continue;
            }

            let ticket = Ticket { from: from.to_owned(), to: to.to_owned(), points };
            if long {
                map.long_tickets.push(ticket);
            } else {
                map.tickets.push(ticket);
            }
        }

        Ok(map)
    }
}

/// Non-blank trimmed lines with 1-based line numbers.
fn lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
