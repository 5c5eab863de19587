//! Game state for a started lobby: hands, face-up cards, tickets, claims, turns.
//!
//! DESIGN
//! ======
//! A `GameState` is dealt from a [`GameMap`] when the host starts the game
//! and lives beside the lobby until it is closed. Every operation is
//! synchronous and validates before mutating, so a rejected move leaves the
//! game untouched.
//!
//! TURNS
//! =====
//! Seats act in lobby join order. A turn is either two card draws or one
//! route claim; a claim is refused once the first draw of a turn is taken.

use std::collections::BTreeMap;

use frames::{CardColor, GameView, Hand, PlayerColor, Seat, Ticket};
use rand::Rng;

use super::ErrorCode;
use super::board::{Board, GameMap, RouteKind};

pub const STARTING_TRAINS: u32 = 45;
pub const STARTING_CARDS: usize = 4;
pub const FACE_UP_SLOTS: usize = 5;
pub const DRAWS_PER_TURN: u8 = 2;
/// Initial deal: short tickets, then long ones.
pub const STARTING_TICKETS: usize = 3;
pub const STARTING_LONG_TICKETS: usize = 1;

/// Relative draw weights in `CardColor::ALL` order. Jokers are slightly more common.
const CARD_WEIGHTS: [u32; 9] = [6, 6, 6, 6, 6, 6, 6, 6, 7];

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("You are not playing in this game")]
    UnknownPlayer,
    #[error("Face-up slot {0} does not exist")]
    InvalidSlot(u8),
    #[error("Finish drawing cards before claiming a route")]
    DrawInProgress,
    #[error("No route between {from} and {to}")]
    NoSuchRoute { from: String, to: String },
    #[error("Every route between {from} and {to} is taken")]
    RouteTaken { from: String, to: String },
    #[error("Not enough trains left")]
    NotEnoughTrains,
    #[error("Those cards do not pay for this route")]
    CardsDoNotMatch,
    #[error("You do not hold those cards")]
    CardsNotHeld,
}

impl ErrorCode for GameError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "E_NOT_YOUR_TURN",
            Self::UnknownPlayer => "E_UNKNOWN_PLAYER",
            Self::InvalidSlot(_) => "E_INVALID_SLOT",
            Self::DrawInProgress => "E_DRAW_IN_PROGRESS",
            Self::NoSuchRoute { .. } => "E_NO_SUCH_ROUTE",
            Self::RouteTaken { .. } => "E_ROUTE_TAKEN",
            Self::NotEnoughTrains => "E_NOT_ENOUGH_TRAINS",
            Self::CardsDoNotMatch => "E_CARDS_DO_NOT_MATCH",
            Self::CardsNotHeld => "E_CARDS_NOT_HELD",
        }
    }
}

// =============================================================================
// PLAYERS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamePlayer {
    pub player_id: String,
    pub color: PlayerColor,
    pub cards: BTreeMap<CardColor, u32>,
    pub trains_left: u32,
    pub tickets: Vec<Ticket>,
    pub score: u32,
}

impl GamePlayer {
    #[must_use]
    pub fn new(player_id: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            player_id: player_id.into(),
            color,
            cards: BTreeMap::new(),
            trains_left: STARTING_TRAINS,
            tickets: Vec::new(),
            score: 0,
        }
    }

    #[must_use]
    pub fn held(&self, color: CardColor) -> u32 {
        self.cards.get(&color).copied().unwrap_or(0)
    }

    fn add_card(&mut self, color: CardColor) {
        *self.cards.entry(color).or_insert(0) += 1;
    }

    /// Whether this player could pay for a route at all: enough trains and
    /// enough matching cards, jokers included.
    #[must_use]
    pub fn can_claim(&self, length: u8, kind: RouteKind) -> bool {
        let length = u32::from(length);
        if self.trains_left < length {
            return false;
        }
        let jokers = self.held(CardColor::Joker);
        let best_colour = CardColor::ALL
            .into_iter()
            .filter(|c| *c != CardColor::Joker)
            .map(|c| self.held(c))
            .max()
            .unwrap_or(0);
        match kind {
            RouteKind::Colored(color) => self.held(color) + jokers >= length,
            RouteKind::Grey => best_colour + jokers >= length,
            RouteKind::Ferry { joker_cost } => {
                let joker_cost = u32::from(joker_cost);
                jokers >= joker_cost && best_colour + (jokers - joker_cost) >= length.saturating_sub(joker_cost)
            }
        }
    }

    fn seat(&self) -> Seat {
        Seat {
            player_id: self.player_id.clone(),
            color: self.color,
            trains_left: self.trains_left,
            score: self.score,
            cards: self.cards.values().sum(),
            tickets: u32::try_from(self.tickets.len()).unwrap_or(u32::MAX),
        }
    }

    fn hand(&self) -> Hand {
        let cards = self.cards.iter().filter(|(_, n)| **n > 0).map(|(c, n)| (*c, *n)).collect();
        Hand { cards, tickets: self.tickets.clone() }
    }
}

/// Whether `cards` is a valid payment for a route of `length` and `kind`.
fn pays_for(cards: &[CardColor], length: u8, kind: RouteKind) -> bool {
    if cards.len() != usize::from(length) {
        return false;
    }
    let jokers = cards.iter().filter(|c| **c == CardColor::Joker).count();
    let mut colours = cards.iter().filter(|c| **c != CardColor::Joker);
    let single_colour = match colours.next() {
        None => true,
        Some(first) => colours.all(|c| c == first),
    };
    match kind {
        RouteKind::Colored(color) => cards.iter().all(|c| *c == color || *c == CardColor::Joker),
        RouteKind::Grey => single_colour,
        RouteKind::Ferry { joker_cost } => single_colour && jokers >= usize::from(joker_cost),
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub board: Board,
    /// Seats in turn order.
    pub players: Vec<GamePlayer>,
    pub face_up: Vec<CardColor>,
    pub tickets: Vec<Ticket>,
    pub long_tickets: Vec<Ticket>,
    /// Index into `players` of the seat to act.
    pub turn: usize,
    /// Cards drawn so far this turn.
    pub draws_taken: u8,
}

impl GameState {
    /// Deal a new game for `player_ids` (at most one per train colour).
    /// Each seat gets its colour, four random cards and its starting tickets;
    /// the first seat opens. Ticket decks that run short deal what is left.
    pub fn deal<R: Rng + ?Sized>(map: &GameMap, player_ids: &[String], rng: &mut R) -> Self {
        let mut game = Self {
            board: map.board.clone(),
            players: Vec::new(),
            face_up: (0..FACE_UP_SLOTS).map(|_| random_card(rng)).collect(),
            tickets: map.tickets.clone(),
            long_tickets: map.long_tickets.clone(),
            turn: 0,
            draws_taken: 0,
        };

        for (player_id, color) in player_ids.iter().zip(PlayerColor::ALL) {
            let mut player = GamePlayer::new(player_id.clone(), color);
            for _ in 0..STARTING_CARDS {
                player.add_card(random_card(rng));
            }
            player.tickets.extend(take_random(&mut game.tickets, STARTING_TICKETS, rng));
            player.tickets.extend(take_random(&mut game.long_tickets, STARTING_LONG_TICKETS, rng));
            game.players.push(player);
        }

        game
    }

    #[must_use]
    pub fn current_player(&self) -> Option<&GamePlayer> {
        self.players.get(self.turn)
    }

    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&GamePlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Pass the turn to the next seat, wrapping around.
    pub fn advance_turn(&mut self) {
        self.draws_taken = 0;
        if self.players.is_empty() {
            self.turn = 0;
        } else {
            self.turn = (self.turn + 1) % self.players.len();
        }
    }

    /// Draw the face-up card in `slot` (refilled from the deck) or, with no
    /// slot, a card from the deck. The second draw ends the turn.
    ///
    /// # Errors
    ///
    /// [`GameError::NotYourTurn`] out of turn, [`GameError::InvalidSlot`] for
    /// a slot outside the face-up row.
    pub fn draw_card<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        slot: Option<u8>,
        rng: &mut R,
    ) -> Result<CardColor, GameError> {
        let seat = self.acting_seat(player_id)?;
        let card = match slot {
            Some(slot) => {
                let index = usize::from(slot);
                let refill = random_card(rng);
                let card = self.face_up.get_mut(index).ok_or(GameError::InvalidSlot(slot))?;
                std::mem::replace(card, refill)
            }
            None => random_card(rng),
        };

        self.players[seat].add_card(card);
        self.draws_taken += 1;
        if self.draws_taken >= DRAWS_PER_TURN {
            self.advance_turn();
        }
        Ok(card)
    }

    /// Claim a free route between `from` and `to` (either orientation) by
    /// paying `cards`. Ends the turn and returns the points scored.
    ///
    /// # Errors
    ///
    /// Fails out of turn, mid-draw, for an unknown or fully taken route, or
    /// when the player lacks the trains or the cards do not pay for it.
    pub fn claim_route(&mut self, player_id: &str, from: &str, to: &str, cards: &[CardColor]) -> Result<u32, GameError> {
        let seat = self.acting_seat(player_id)?;
        if self.draws_taken > 0 {
            return Err(GameError::DrawInProgress);
        }

        let mut between = self.board.routes_between(from, to).peekable();
        if between.peek().is_none() {
            return Err(GameError::NoSuchRoute { from: from.to_owned(), to: to.to_owned() });
        }
        let Some((index, route)) = between.find(|(_, r)| r.owner.is_none()) else {
            return Err(GameError::RouteTaken { from: from.to_owned(), to: to.to_owned() });
        };
        let (length, kind, score) = (route.length, route.kind, route.score());
        drop(between);

        let player = &self.players[seat];
        if player.trains_left < u32::from(length) {
            return Err(GameError::NotEnoughTrains);
        }
        if !player.can_claim(length, kind) {
            return Err(GameError::CardsNotHeld);
        }
        if !pays_for(cards, length, kind) {
            return Err(GameError::CardsDoNotMatch);
        }
        let mut spend: BTreeMap<CardColor, u32> = BTreeMap::new();
        for card in cards {
            *spend.entry(*card).or_insert(0) += 1;
        }
        if spend.iter().any(|(color, n)| player.held(*color) < *n) {
            return Err(GameError::CardsNotHeld);
        }

        let player = &mut self.players[seat];
        for (color, n) in spend {
            if let Some(held) = player.cards.get_mut(&color) {
                *held -= n;
            }
        }
        player.trains_left -= u32::from(length);
        player.score += score;
        self.board.routes[index].owner = Some(player_id.to_owned());
        self.advance_turn();
        Ok(score)
    }

    /// Remove a seat that quit. Its claimed routes stay claimed. If it was
    /// the seat to act, the next seat acts with a fresh turn.
    pub fn retire(&mut self, player_id: &str) {
        let Some(index) = self.players.iter().position(|p| p.player_id == player_id) else {
            return;
        };
        self.players.remove(index);
        if index < self.turn {
            self.turn -= 1;
        } else if index == self.turn {
            self.draws_taken = 0;
        }
        if self.turn >= self.players.len() {
            self.turn = 0;
        }
    }

    /// The game as `viewer` sees it: public state plus the viewer's own hand.
    #[must_use]
    pub fn view(&self, viewer: Option<&str>) -> GameView {
        GameView {
            cities: self.board.cities.clone(),
            routes: self.board.tracks(),
            seats: self.players.iter().map(GamePlayer::seat).collect(),
            face_up: self.face_up.clone(),
            turn: self.current_player().map(|p| p.player_id.clone()),
            hand: viewer.and_then(|id| self.player(id)).map(GamePlayer::hand),
        }
    }

    fn acting_seat(&self, player_id: &str) -> Result<usize, GameError> {
        let seat = self
            .players
            .iter()
            .position(|p| p.player_id == player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if seat != self.turn {
            return Err(GameError::NotYourTurn);
        }
        Ok(seat)
    }
}

/// One card from the deck, weighted by `CARD_WEIGHTS`.
pub fn random_card<R: Rng + ?Sized>(rng: &mut R) -> CardColor {
    let total: u32 = CARD_WEIGHTS.iter().sum();
    let mut roll = rng.random_range(0..total);
    for (color, weight) in CardColor::ALL.into_iter().zip(CARD_WEIGHTS) {
        if roll < weight {
            return color;
        }
        roll -= weight;
    }
    CardColor::Joker
}

fn take_random<T, R: Rng + ?Sized>(deck: &mut Vec<T>, n: usize, rng: &mut R) -> Vec<T> {
    let mut taken = Vec::with_capacity(n);
    while taken.len() < n && !deck.is_empty() {
        let index = rng.random_range(0..deck.len());
        taken.push(deck.swap_remove(index));
    }
    taken
}

#[cfg(test)]
#[path = "game_test.rs"]
mod tests;
