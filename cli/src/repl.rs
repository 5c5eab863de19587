//! Line commands for `play` and `watch`.

use client::Route;
use frames::{CardColor, ClientEvent, DEFAULT_MAX_PLAYERS};

pub const HELP: &str = "\
commands:
  name <username>            register a username
  create [--max N] [name...] create a lobby (N players, default 4)
  join <code>                join a lobby by code
  leave                      leave the current lobby
  list                       refresh the lobby list
  start                      start the game (host only)
  back                       return to the lobby browser
  go <path>                  navigate to a path, e.g. /lobby/ABC123
  link                       print the invite link for the current lobby
  board                      show the running game
  draw [slot]                draw face-up card 0-4, or from the deck
  claim <from> <to> <cards>  claim a route, e.g. `claim Paris Dieppe pink`
  status                     show the session state
  quit                       exit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Name(String),
    Create { name: String, max_players: u8 },
    Join(String),
    Leave,
    List,
    Start,
    Back,
    Go(Route),
    Link,
    Board,
    Draw(Option<u8>),
    Claim { from: String, to: String, cards: Vec<CardColor> },
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ReplError {
    #[error("unknown command `{0}` (try `help`)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid player count `{0}`")]
    InvalidCount(String),
    #[error("invalid face-up slot `{0}`")]
    InvalidSlot(String),
    #[error("unknown card colour `{0}`")]
    UnknownCard(String),
}

/// Parse one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns [`ReplError`] for unknown commands and missing or malformed arguments.
pub fn parse(line: &str) -> Result<Option<ReplCommand>, ReplError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "name" => {
            if rest.is_empty() {
                return Err(ReplError::Usage("name <username>"));
            }
            ReplCommand::Name(rest.join(" "))
        }
        "create" => parse_create(&rest)?,
        "join" => match rest.as_slice() {
            [code] => ReplCommand::Join((*code).to_owned()),
            _ => return Err(ReplError::Usage("join <code>")),
        },
        "go" => match rest.as_slice() {
            [path] => ReplCommand::Go(Route::parse(path)),
            _ => return Err(ReplError::Usage("go <path>")),
        },
        "leave" => ReplCommand::Leave,
        "list" | "ls" => ReplCommand::List,
        "start" => ReplCommand::Start,
        "back" => ReplCommand::Back,
        "link" => ReplCommand::Link,
        "board" => ReplCommand::Board,
        "draw" => match rest.as_slice() {
            [] => ReplCommand::Draw(None),
            [slot] => ReplCommand::Draw(Some(slot.parse().map_err(|_| ReplError::InvalidSlot((*slot).to_owned()))?)),
            _ => return Err(ReplError::Usage("draw [slot]")),
        },
        "claim" => parse_claim(&rest)?,
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(ReplError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

fn parse_create(args: &[&str]) -> Result<ReplCommand, ReplError> {
    let (max_players, name) = match args {
        ["--max", count, name @ ..] => {
            let max_players = count
                .parse()
                .map_err(|_| ReplError::InvalidCount((*count).to_owned()))?;
            (max_players, name)
        }
        ["--max"] => return Err(ReplError::Usage("create [--max N] [name...]")),
        name => (DEFAULT_MAX_PLAYERS, name),
    };
    Ok(ReplCommand::Create { name: name.join(" "), max_players })
}

fn parse_claim(args: &[&str]) -> Result<ReplCommand, ReplError> {
    let [from, to, cards @ ..] = args else {
        return Err(ReplError::Usage("claim <from> <to> <cards...>"));
    };
    if cards.is_empty() {
        return Err(ReplError::Usage("claim <from> <to> <cards...>"));
    }
    let cards = cards
        .iter()
        .map(|c| CardColor::parse(c).ok_or_else(|| ReplError::UnknownCard((*c).to_owned())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReplCommand::Claim { from: (*from).to_owned(), to: (*to).to_owned(), cards })
}

/// The event a game move sends for `lobby_id`. Other commands send nothing.
#[must_use]
pub fn game_event(command: &ReplCommand, lobby_id: &str) -> Option<ClientEvent> {
    let lobby_id = lobby_id.to_owned();
    match command {
        ReplCommand::Draw(slot) => Some(ClientEvent::DrawCard { lobby_id, slot: *slot }),
        ReplCommand::Claim { from, to, cards } => Some(ClientEvent::ClaimRoute {
            lobby_id,
            from: from.clone(),
            to: to.clone(),
            cards: cards.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;
