//! Plain-text rendering of the active screen.

use std::fmt::Write as _;

use client::{Screen, Session};
use frames::{GameView, Lobby};

/// Text for the screen the session is on.
#[must_use]
pub fn render(session: &Session, origin: &str) -> String {
    let mut out = String::new();
    match session.screen() {
        Screen::Username => {
            out.push_str("== choose a username ==\n");
            if let Some(id) = session.pending_lobby_id() {
                let _ = writeln!(out, "you were invited to lobby {id}; it will be joined once you pick a name");
            }
            out.push_str("type `name <username>`\n");
        }
        Screen::Browser => {
            let _ = writeln!(out, "== lobbies ({}) ==", session.username().unwrap_or("?"));
            if session.lobbies().is_empty() {
                out.push_str("  no open lobbies; `create` one\n");
            }
            for lobby in session.lobbies() {
                let full = if lobby.is_full() { "  [full]" } else { "" };
                let _ = writeln!(
                    out,
                    "  {}  {} (host {})  {}/{}{full}",
                    lobby.id, lobby.name, lobby.host, lobby.player_count, lobby.max_players
                );
            }
        }
        Screen::LobbyRoom => {
            if let Some(lobby) = session.lobby() {
                let _ = writeln!(out, "== {} [{}] ==", lobby.name, lobby.id);
                for player in &lobby.players {
                    let host = if player.id == lobby.host { " (host)" } else { "" };
                    let you = if session.player_id() == Some(player.id.as_str()) { " (you)" } else { "" };
                    let _ = writeln!(out, "  {}{host}{you}", player.username);
                }
                let _ = writeln!(out, "  {}/{} players", lobby.players.len(), lobby.max_players);
                if let Some(link) = session.share_url(origin) {
                    let _ = writeln!(out, "invite: {link}");
                }
                if session.is_host() {
                    out.push_str("`start` when everyone is here\n");
                }
            }
        }
        Screen::Game => {
            let id = session.current_lobby_id().unwrap_or("?");
            let _ = writeln!(out, "== game {id} started ==");
            out.push_str("`board` shows the game, `draw`/`claim` play a turn\n");
            out.push_str("`back` returns to the lobby browser\n");
        }
    }
    out
}

/// Text for a running game. Seats are named from `lobby` when known.
#[must_use]
pub fn game(view: &GameView, lobby: Option<&Lobby>) -> String {
    let name = |player_id: &str| -> String {
        lobby
            .and_then(|l| l.players.iter().find(|p| p.id == player_id))
            .map_or_else(|| player_id.to_owned(), |p| p.username.clone())
    };

    let mut out = String::new();
    let claimed = view.routes.iter().filter(|r| r.owner.is_some()).count();
    let _ = writeln!(out, "== board: {} cities, {claimed}/{} routes claimed ==", view.cities.len(), view.routes.len());
    for seat in &view.seats {
        let turn = if view.turn.as_deref() == Some(seat.player_id.as_str()) { "  <- to play" } else { "" };
        let _ = writeln!(
            out,
            "  {:<12} {:<6} score {:>3}  trains {:>2}  cards {:>2}  tickets {}{turn}",
            name(&seat.player_id),
            seat.color.as_str(),
            seat.score,
            seat.trains_left,
            seat.cards,
            seat.tickets,
        );
    }

    let face_up: Vec<String> = view.face_up.iter().enumerate().map(|(i, c)| format!("{i}:{c}")).collect();
    let _ = writeln!(out, "face-up: {}", face_up.join(" "));

    if let Some(hand) = &view.hand {
        let cards: Vec<String> = hand
            .cards
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(color, n)| format!("{color} x{n}"))
            .collect();
        let _ = writeln!(out, "hand: {}", if cards.is_empty() { "-".to_owned() } else { cards.join(", ") });
        for ticket in &hand.tickets {
            let _ = writeln!(out, "  ticket {} - {} ({})", ticket.from, ticket.to, ticket.points);
        }
    }
    out
}

/// One-line summary for `status`.
#[must_use]
pub fn status(session: &Session) -> String {
    format!(
        "phase={:?} user={} lobby={} location={}",
        session.phase(),
        session.username().unwrap_or("-"),
        session.current_lobby_id().unwrap_or("-"),
        session.location()
    )
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
