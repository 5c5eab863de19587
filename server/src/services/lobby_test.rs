use super::*;
use crate::assets::GameAssets;
use crate::services::board::GameMap;
use crate::state::test_helpers::{connect, connect_named};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

const CITIES: &str = "Paris\nDieppe\nLondon\nBrest\n";
const CONNECTIONS: &str = "Paris Dieppe 1 PINK\nDieppe London 2 FERRY 1\nBrest Paris 3\n";
const TICKETS: &str = "Paris London 5\nBrest London 6\nBrest Dieppe 4\nBrest London 20 LONG\n";

fn events_for(pushes: &[Push], to: Uuid) -> Vec<&ServerEvent> {
    pushes.iter().filter(|p| p.to == to).map(|p| &p.event).collect()
}

fn names_for(pushes: &[Push], to: Uuid) -> Vec<&'static str> {
    events_for(pushes, to).into_iter().map(ServerEvent::name).collect()
}

fn new_lobby(registry: &mut Registry, host: Uuid, max_players: u8) -> String {
    let pushes = create_lobby(registry, host, "Friday Night", max_players).unwrap();
    match events_for(&pushes, host).first() {
        Some(ServerEvent::LobbyCreated { lobby_id: Some(id) }) => id.clone(),
        other => panic!("expected lobby_created, got {other:?}"),
    }
}

fn lobby<'a>(registry: &'a Registry, id: &str) -> &'a Lobby {
    &registry.lobbies[id].lobby
}

/// Registry whose games are dealt from a four-city map.
fn registry_with_map() -> Registry {
    let assets = GameAssets {
        map: Some(GameMap::parse(CITIES, CONNECTIONS, TICKETS).unwrap()),
        geometry: Some(json!({ "bbox": [0.0, 0.0, 10.0, 10.0], "elements": [] })),
    };
    Registry::new(8).with_assets(Arc::new(assets))
}

/// Two-seat started lobby hosted by `ada`.
fn started(registry: &mut Registry) -> (Uuid, Uuid, String) {
    let ada = connect_named(registry, "Ada");
    let bob = connect_named(registry, "Bob");
    let id = new_lobby(registry, ada, 4);
    join_lobby(registry, bob, &id).unwrap();
    start_game(registry, ada, &id).unwrap();
    (ada, bob, id)
}

fn game<'a>(registry: &'a Registry, id: &str) -> &'a GameState {
    registry.lobbies[id].game.as_ref().unwrap()
}

// =============================================================================
// USERNAME
// =============================================================================

#[test]
fn set_username_trims_and_replies_with_list() {
    let mut registry = Registry::new(8);
    let (ada, _rx) = connect(&mut registry);

    let pushes = set_username(&mut registry, ada, "  Ada  ").unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["username_set", "lobby_list_update"]);
    assert_eq!(pushes[0].event, ServerEvent::UsernameSet { username: "Ada".into() });
    assert_eq!(registry.clients[&ada].username.as_deref(), Some("Ada"));
}

#[test]
fn set_username_rejects_out_of_range_lengths() {
    let mut registry = Registry::new(8);
    let (ada, _rx) = connect(&mut registry);

    assert!(matches!(set_username(&mut registry, ada, " a "), Err(LobbyError::InvalidUsername)));
    let long = "x".repeat(MAX_USERNAME_CHARS + 1);
    assert!(matches!(set_username(&mut registry, ada, &long), Err(LobbyError::InvalidUsername)));
    assert!(registry.clients[&ada].username.is_none());
}

#[test]
fn set_username_counts_chars_not_bytes() {
    let mut registry = Registry::new(8);
    let (ada, _rx) = connect(&mut registry);
    assert!(set_username(&mut registry, ada, "éé").is_ok());
}

// =============================================================================
// CREATE
// =============================================================================

#[test]
fn create_requires_username() {
    let mut registry = Registry::new(8);
    let (anon, _rx) = connect(&mut registry);
    assert!(matches!(create_lobby(&mut registry, anon, "x", 4), Err(LobbyError::UsernameRequired)));
}

#[test]
fn create_rejects_capacity_outside_two_to_five() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    assert!(matches!(create_lobby(&mut registry, ada, "x", 1), Err(LobbyError::InvalidMaxPlayers(1))));
    assert!(matches!(create_lobby(&mut registry, ada, "x", 6), Err(LobbyError::InvalidMaxPlayers(6))));
    assert!(registry.lobbies.is_empty());
}

#[test]
fn create_replies_created_then_joined() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");

    let pushes = create_lobby(&mut registry, ada, "Friday Night", 3).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["lobby_created", "lobby_joined", "lobby_list_update"]);
    let ServerEvent::LobbyJoined { lobby, player_id } = &pushes[1].event else {
        panic!("expected lobby_joined");
    };
    assert_eq!(player_id, &ada.to_string());
    assert_eq!(lobby.host, ada.to_string());
    assert_eq!(lobby.max_players, 3);
    assert_eq!(lobby.name, "Friday Night");
    assert_eq!(lobby.players.len(), 1);
    assert_eq!(registry.clients[&ada].lobby_id.as_deref(), Some(lobby.id.as_str()));
}

#[test]
fn create_generates_six_char_code_from_alphabet() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let id = new_lobby(&mut registry, ada, 4);
    assert_eq!(id.len(), CODE_LEN);
    assert!(id.bytes().all(|b| CODE_ALPHABET.contains(&b)));
}

#[test]
fn create_defaults_blank_name() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    create_lobby(&mut registry, ada, "   ", 4).unwrap();
    let only = registry.lobbies.values().next().unwrap();
    assert_eq!(only.lobby.name, "Ada's Game");
}

#[test]
fn create_leaves_previous_lobby() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let first = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &first).unwrap();

    let pushes = create_lobby(&mut registry, ada, "Second", 4).unwrap();

    assert_eq!(names_for(&pushes, bob), vec!["new_host", "player_left", "lobby_list_update"]);
    assert_eq!(lobby(&registry, &first).host, bob.to_string());
    assert_eq!(registry.lobbies.len(), 2);
}

#[test]
fn create_respects_lobby_cap() {
    let mut registry = Registry::new(1);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    new_lobby(&mut registry, ada, 4);

    let err = create_lobby(&mut registry, bob, "", 4).unwrap_err();
    assert!(matches!(err, LobbyError::TooManyLobbies));
    assert!(err.retryable());
}

#[test]
fn create_at_cap_reuses_slot_of_sole_member() {
    let mut registry = Registry::new(1);
    let ada = connect_named(&mut registry, "Ada");
    let first = new_lobby(&mut registry, ada, 4);

    let second = new_lobby(&mut registry, ada, 2);

    assert_ne!(first, second);
    assert_eq!(registry.lobbies.len(), 1);
    assert!(registry.lobbies.contains_key(&second));
}

// =============================================================================
// JOIN
// =============================================================================

#[test]
fn join_notifies_existing_members() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);

    let pushes = join_lobby(&mut registry, bob, &id).unwrap();

    assert_eq!(names_for(&pushes, bob), vec!["lobby_joined", "lobby_list_update"]);
    assert_eq!(names_for(&pushes, ada), vec!["player_joined", "lobby_list_update"]);
    let ServerEvent::PlayerJoined { lobby, player } = events_for(&pushes, ada)[0] else {
        panic!("expected player_joined");
    };
    assert_eq!(player.username, "Bob");
    let order: Vec<&str> = lobby.players.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(order, vec!["Ada", "Bob"]);
}

#[test]
fn join_accepts_lowercase_code() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);

    join_lobby(&mut registry, bob, &format!(" {} ", id.to_lowercase())).unwrap();
    assert!(lobby(&registry, &id).has_player(&bob.to_string()));
}

#[test]
fn join_unknown_lobby_fails() {
    let mut registry = Registry::new(8);
    let bob = connect_named(&mut registry, "Bob");
    let err = join_lobby(&mut registry, bob, "ZZZZZZ").unwrap_err();
    assert!(matches!(err, LobbyError::NotFound(ref id) if id == "ZZZZZZ"));
    assert_eq!(err.error_code(), "E_LOBBY_NOT_FOUND");
}

#[test]
fn join_full_lobby_fails() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let id = new_lobby(&mut registry, ada, 2);
    join_lobby(&mut registry, bob, &id).unwrap();

    assert!(matches!(join_lobby(&mut registry, cy, &id), Err(LobbyError::Full)));
}

#[test]
fn join_started_lobby_fails() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();
    start_game(&mut registry, ada, &id).unwrap();

    assert!(matches!(join_lobby(&mut registry, cy, &id), Err(LobbyError::GameStarted)));
}

#[test]
fn rejoining_current_lobby_resends_snapshot_only() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();

    let pushes = join_lobby(&mut registry, bob, &id).unwrap();

    assert_eq!(pushes.len(), 1);
    assert_eq!(names_for(&pushes, bob), vec!["lobby_joined"]);
    assert_eq!(lobby(&registry, &id).players.len(), 2);
}

#[test]
fn joining_another_lobby_leaves_the_first() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let first = new_lobby(&mut registry, ada, 4);
    let second = new_lobby(&mut registry, bob, 4);
    join_lobby(&mut registry, cy, &first).unwrap();

    let pushes = join_lobby(&mut registry, cy, &second).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["player_left", "lobby_list_update"]);
    assert!(!lobby(&registry, &first).has_player(&cy.to_string()));
    assert!(lobby(&registry, &second).has_player(&cy.to_string()));
}

// =============================================================================
// LEAVE
// =============================================================================

#[test]
fn leave_is_idempotent() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");

    let pushes = leave_lobby(&mut registry, ada).unwrap();

    assert_eq!(pushes, vec![Push::new(ada, ServerEvent::LeftLobby)]);
}

#[test]
fn host_leaving_promotes_earliest_remaining_player() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();
    join_lobby(&mut registry, cy, &id).unwrap();

    let pushes = leave_lobby(&mut registry, ada).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["left_lobby", "lobby_list_update"]);
    assert_eq!(names_for(&pushes, cy), vec!["new_host", "player_left", "lobby_list_update"]);
    assert_eq!(events_for(&pushes, bob)[0], &ServerEvent::NewHost { host_id: bob.to_string() });
    assert_eq!(lobby(&registry, &id).host, bob.to_string());
    assert!(registry.clients[&ada].lobby_id.is_none());
}

#[test]
fn guest_leaving_keeps_host() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();

    let pushes = leave_lobby(&mut registry, bob).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["player_left", "lobby_list_update"]);
    assert_eq!(lobby(&registry, &id).host, ada.to_string());
}

#[test]
fn last_player_leaving_deletes_lobby() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    new_lobby(&mut registry, ada, 4);

    let pushes = leave_lobby(&mut registry, ada).unwrap();

    assert!(registry.lobbies.is_empty());
    assert_eq!(
        events_for(&pushes, ada).last(),
        Some(&&ServerEvent::LobbyListUpdate { lobbies: vec![] })
    );
}

#[test]
fn disconnect_counts_as_leave() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();

    let pushes = disconnect(&mut registry, ada);

    assert!(!registry.clients.contains_key(&ada));
    assert!(events_for(&pushes, ada).is_empty());
    assert_eq!(names_for(&pushes, bob), vec!["new_host", "player_left", "lobby_list_update"]);
}

#[test]
fn disconnect_outside_lobby_pushes_nothing() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    connect_named(&mut registry, "Bob");
    assert!(disconnect(&mut registry, ada).is_empty());
}

// =============================================================================
// LIST
// =============================================================================

#[test]
fn list_is_sorted_by_creation_and_hides_started_lobbies() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let dee = connect_named(&mut registry, "Dee");
    let first = new_lobby(&mut registry, ada, 4);
    let second = new_lobby(&mut registry, bob, 4);
    let third = new_lobby(&mut registry, cy, 4);
    join_lobby(&mut registry, dee, &second).unwrap();
    start_game(&mut registry, bob, &second).unwrap();

    let list = lobby_list(&registry);

    let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![first.as_str(), third.as_str()]);
    assert_eq!(list[0].host, "Ada");
    assert_eq!(list[0].player_count, 1);
}

#[test]
fn list_update_reaches_only_registered_connections() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let (anon, _rx) = connect(&mut registry);

    let pushes = create_lobby(&mut registry, ada, "", 4).unwrap();

    assert!(events_for(&pushes, anon).is_empty());
}

#[test]
fn get_lobby_list_replies_to_caller() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    new_lobby(&mut registry, ada, 4);

    let pushes = get_lobby_list(&mut registry, bob).unwrap();

    assert_eq!(pushes.len(), 1);
    let ServerEvent::LobbyListUpdate { lobbies } = &pushes[0].event else {
        panic!("expected lobby_list_update");
    };
    assert_eq!(lobbies.len(), 1);
}

// =============================================================================
// START / REJOIN
// =============================================================================

#[test]
fn start_game_pushes_to_every_member() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();

    let pushes = start_game(&mut registry, ada, &id).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["game_started", "lobby_list_update"]);
    assert_eq!(names_for(&pushes, bob), vec!["game_started", "lobby_list_update"]);
    assert!(registry.lobbies[&id].started);
}

#[test]
fn start_game_rules() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let id = new_lobby(&mut registry, ada, 4);

    assert!(matches!(start_game(&mut registry, ada, &id), Err(LobbyError::NotEnoughPlayers)));
    join_lobby(&mut registry, bob, &id).unwrap();
    assert!(matches!(start_game(&mut registry, bob, &id), Err(LobbyError::NotHost)));
    assert!(matches!(start_game(&mut registry, cy, &id), Err(LobbyError::NotInLobby)));
    assert!(matches!(start_game(&mut registry, ada, "NOPE42"), Err(LobbyError::NotFound(_))));
    start_game(&mut registry, ada, &id).unwrap();
    assert!(matches!(start_game(&mut registry, ada, &id), Err(LobbyError::GameStarted)));
}

#[test]
fn start_game_without_map_deals_nothing() {
    let mut registry = Registry::new(8);
    let (_, _, id) = started(&mut registry);

    assert!(registry.lobbies[&id].game.is_none());
}

#[test]
fn start_game_deals_each_member_their_own_hand() {
    let mut registry = registry_with_map();
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();

    let pushes = start_game(&mut registry, ada, &id).unwrap();

    for member in [ada, bob] {
        let ServerEvent::GameStarted { board, game: Some(view), .. } = events_for(&pushes, member)[0] else {
            panic!("expected game_started with a game");
        };
        assert!(board.as_ref().is_some_and(|b| b["bbox"].is_array()));
        let hand = view.hand.as_ref().unwrap();
        assert_eq!(hand.total(), 4);
        assert_eq!(view.seat(&member.to_string()).map(|s| s.cards), Some(4));
        assert_eq!(view.turn.as_deref(), Some(ada.to_string().as_str()));
    }
}

#[test]
fn rejoin_game_requires_started_lobby() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let (viewer, _rx) = connect(&mut registry);
    let id = new_lobby(&mut registry, ada, 4);

    assert!(matches!(rejoin_game(&mut registry, viewer, &id, None), Err(LobbyError::GameNotStarted)));
    assert!(matches!(rejoin_game(&mut registry, viewer, "NOPE42", None), Err(LobbyError::NotFound(_))));

    join_lobby(&mut registry, bob, &id).unwrap();
    start_game(&mut registry, ada, &id).unwrap();
    let pushes = rejoin_game(&mut registry, viewer, &id, None).unwrap();

    assert_eq!(names_for(&pushes, viewer), vec!["game_started"]);
    assert_eq!(registry.clients[&viewer].watching.as_deref(), Some(id.as_str()));
    assert_eq!(registry.lobbies[&id].watchers, vec![viewer]);
}

#[test]
fn rejoin_with_foreign_seat_fails() {
    let mut registry = Registry::new(8);
    let (_, _, id) = started(&mut registry);
    let (viewer, _rx) = connect(&mut registry);

    let err = rejoin_game(&mut registry, viewer, &id, Some("someone-else")).unwrap_err();

    assert!(matches!(err, LobbyError::NotInLobby));
    assert!(registry.clients[&viewer].watching.is_none());
}

#[test]
fn started_game_survives_every_member_disconnecting() {
    let mut registry = registry_with_map();
    let (ada, bob, id) = started(&mut registry);

    let pushes = disconnect(&mut registry, ada);
    assert_eq!(names_for(&pushes, bob), vec!["lobby_list_update"]);
    disconnect(&mut registry, bob);

    let state = &registry.lobbies[&id];
    assert_eq!(state.lobby.players.len(), 2);
    assert_eq!(state.lobby.host, ada.to_string());
    assert!(state.abandoned_since.is_some());

    let (page, _rx) = connect(&mut registry);
    let bob_id = bob.to_string();
    let pushes = rejoin_game(&mut registry, page, &id, Some(&bob_id)).unwrap();

    let ServerEvent::GameStarted { lobby, game: Some(view), .. } = events_for(&pushes, page)[0] else {
        panic!("expected game_started with a game");
    };
    assert_eq!(lobby.players.len(), 2);
    assert_eq!(view.hand.as_ref().map(frames::Hand::total), Some(4));
    assert_eq!(registry.clients[&page].seat.as_deref(), Some(bob_id.as_str()));
    assert!(registry.lobbies[&id].abandoned_since.is_none());
}

#[test]
fn watcher_follows_departures_in_started_game() {
    let mut registry = registry_with_map();
    let ada = connect_named(&mut registry, "Ada");
    let bob = connect_named(&mut registry, "Bob");
    let cy = connect_named(&mut registry, "Cy");
    let id = new_lobby(&mut registry, ada, 4);
    join_lobby(&mut registry, bob, &id).unwrap();
    join_lobby(&mut registry, cy, &id).unwrap();
    start_game(&mut registry, ada, &id).unwrap();
    let (viewer, _rx) = connect(&mut registry);
    rejoin_game(&mut registry, viewer, &id, None).unwrap();

    let pushes = leave_lobby(&mut registry, bob).unwrap();
    assert_eq!(names_for(&pushes, viewer), vec!["player_left", "game_update"]);
    assert_eq!(names_for(&pushes, ada), vec!["player_left", "game_update", "lobby_list_update"]);

    let pushes = leave_lobby(&mut registry, ada).unwrap();
    assert_eq!(names_for(&pushes, viewer), vec!["new_host", "player_left", "game_update"]);
    assert_eq!(events_for(&pushes, viewer)[0], &ServerEvent::NewHost { host_id: cy.to_string() });
    let ServerEvent::GameUpdate { game: view, .. } = events_for(&pushes, viewer)[2] else {
        panic!("expected game_update");
    };
    assert!(view.hand.is_none());
    assert_eq!(view.seats.len(), 1);
}

#[test]
fn leaving_started_game_retires_the_seat() {
    let mut registry = registry_with_map();
    let (ada, bob, id) = started(&mut registry);

    leave_lobby(&mut registry, ada).unwrap();

    assert!(game(&registry, &id).player(&ada.to_string()).is_none());
    assert_eq!(game(&registry, &id).current_player().map(|p| p.player_id.clone()), Some(bob.to_string()));
    assert_eq!(lobby(&registry, &id).host, bob.to_string());
}

#[test]
fn latest_claim_holds_the_seat() {
    let mut registry = Registry::new(8);
    let (_, bob, id) = started(&mut registry);
    let (first, _rx1) = connect(&mut registry);
    let (second, _rx2) = connect(&mut registry);
    let bob_id = bob.to_string();

    rejoin_game(&mut registry, first, &id, Some(&bob_id)).unwrap();
    rejoin_game(&mut registry, second, &id, Some(&bob_id)).unwrap();

    assert!(registry.clients[&first].seat.is_none());
    assert_eq!(registry.clients[&second].seat.as_deref(), Some(bob_id.as_str()));
    assert_eq!(registry.lobbies[&id].watchers, vec![first, second]);
}

#[test]
fn repeated_rejoin_keeps_one_watcher_entry() {
    let mut registry = Registry::new(8);
    let (ada, _, id) = started(&mut registry);
    let (page, _rx) = connect(&mut registry);
    let ada_id = ada.to_string();

    rejoin_game(&mut registry, page, &id, Some(&ada_id)).unwrap();
    rejoin_game(&mut registry, page, &id, Some(&ada_id)).unwrap();

    assert_eq!(registry.lobbies[&id].watchers, vec![page]);
    assert_eq!(lobby(&registry, &id).players.len(), 2);
}

#[test]
fn seated_member_rejoining_gets_reply_only() {
    let mut registry = Registry::new(8);
    let (ada, _, id) = started(&mut registry);

    let pushes = rejoin_game(&mut registry, ada, &id, None).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["game_started"]);
    assert_eq!(registry.clients[&ada].lobby_id.as_deref(), Some(id.as_str()));
    assert!(registry.lobbies[&id].watchers.is_empty());
}

#[test]
fn claimant_quitting_gives_up_the_seat_but_dropping_keeps_it() {
    let mut registry = registry_with_map();
    let (ada, bob, id) = started(&mut registry);
    disconnect(&mut registry, ada);
    disconnect(&mut registry, bob);
    let (page, _rx) = connect(&mut registry);
    let bob_id = bob.to_string();

    rejoin_game(&mut registry, page, &id, Some(&bob_id)).unwrap();
    disconnect(&mut registry, page);
    assert!(lobby(&registry, &id).has_player(&bob_id));
    assert!(registry.lobbies[&id].watchers.is_empty());

    let (page, _rx) = connect(&mut registry);
    rejoin_game(&mut registry, page, &id, Some(&bob_id)).unwrap();
    leave_lobby(&mut registry, page).unwrap();
    assert!(!lobby(&registry, &id).has_player(&bob_id));
    assert!(game(&registry, &id).player(&bob_id).is_none());
}

#[test]
fn last_seat_quitting_closes_lobby_and_releases_watchers() {
    let mut registry = Registry::new(8);
    let (ada, bob, id) = started(&mut registry);
    let (viewer, _rx) = connect(&mut registry);
    rejoin_game(&mut registry, viewer, &id, None).unwrap();

    leave_lobby(&mut registry, ada).unwrap();
    let pushes = leave_lobby(&mut registry, bob).unwrap();

    assert!(!registry.lobbies.contains_key(&id));
    assert_eq!(names_for(&pushes, viewer), vec!["left_lobby"]);
    assert!(registry.clients[&viewer].watching.is_none());
}

// =============================================================================
// PLAY
// =============================================================================

#[test]
fn draws_push_updates_with_each_recipients_hand() {
    let mut registry = registry_with_map();
    let (ada, bob, id) = started(&mut registry);

    let pushes = dispatch(&mut registry, ada, ClientEvent::DrawCard { lobby_id: id.to_lowercase(), slot: Some(0) }).unwrap();

    assert_eq!(names_for(&pushes, ada), vec!["game_update"]);
    assert_eq!(names_for(&pushes, bob), vec!["game_update"]);
    let ServerEvent::GameUpdate { game: ada_view, .. } = events_for(&pushes, ada)[0] else {
        panic!("expected game_update");
    };
    let ServerEvent::GameUpdate { game: bob_view, .. } = events_for(&pushes, bob)[0] else {
        panic!("expected game_update");
    };
    assert_eq!(ada_view.hand.as_ref().map(frames::Hand::total), Some(5));
    assert_eq!(bob_view.hand.as_ref().map(frames::Hand::total), Some(4));
    assert_eq!(bob_view.seat(&ada.to_string()).map(|s| s.cards), Some(5));

    dispatch(&mut registry, ada, ClientEvent::DrawCard { lobby_id: id.clone(), slot: None }).unwrap();
    assert_eq!(game(&registry, &id).current_player().map(|p| p.player_id.clone()), Some(bob.to_string()));
}

#[test]
fn claim_marks_route_for_the_claimant() {
    let mut registry = registry_with_map();
    let (ada, _, id) = started(&mut registry);
    let game = registry.lobbies.get_mut(&id).unwrap().game.as_mut().unwrap();
    game.players[0].cards = BTreeMap::from([(CardColor::Pink, 1)]);

    let pushes = dispatch(
        &mut registry,
        ada,
        ClientEvent::ClaimRoute { lobby_id: id.clone(), from: "Dieppe".into(), to: "Paris".into(), cards: vec![CardColor::Pink] },
    )
    .unwrap();

    let ServerEvent::GameUpdate { game: view, .. } = events_for(&pushes, ada)[0] else {
        panic!("expected game_update");
    };
    assert_eq!(view.routes[0].owner.as_deref(), Some(ada.to_string().as_str()));
    assert_eq!(view.seat(&ada.to_string()).map(|s| s.score), Some(1));
}

#[test]
fn illegal_moves_report_game_codes() {
    let mut registry = registry_with_map();
    let (_, bob, id) = started(&mut registry);

    let err = draw_card(&mut registry, bob, &id, None).unwrap_err();
    assert!(matches!(err, LobbyError::Game(GameError::NotYourTurn)));
    assert_eq!(err.error_code(), "E_NOT_YOUR_TURN");

    let err = claim_route(&mut registry, bob, &id, "Paris", "London", &[]).unwrap_err();
    assert_eq!(err.error_code(), "E_NOT_YOUR_TURN");
}

#[test]
fn play_needs_a_seat_and_a_dealt_game() {
    let mut registry = Registry::new(8);
    let (ada, _, id) = started(&mut registry);
    let (viewer, _rx) = connect(&mut registry);
    rejoin_game(&mut registry, viewer, &id, None).unwrap();

    assert!(matches!(draw_card(&mut registry, viewer, &id, None), Err(LobbyError::NotInLobby)));
    let err = draw_card(&mut registry, ada, &id, None).unwrap_err();
    assert!(matches!(err, LobbyError::NoGame));
    assert_eq!(err.error_code(), "E_NO_GAME");
    assert!(matches!(draw_card(&mut registry, ada, "NOPE42", None), Err(LobbyError::NotFound(_))));
}

#[test]
fn claimed_seat_plays_from_the_game_page() {
    let mut registry = registry_with_map();
    let (ada, bob, id) = started(&mut registry);
    disconnect(&mut registry, ada);
    disconnect(&mut registry, bob);
    let (page, _rx) = connect(&mut registry);
    let ada_id = ada.to_string();
    rejoin_game(&mut registry, page, &id, Some(&ada_id)).unwrap();

    let pushes = draw_card(&mut registry, page, &id, Some(1)).unwrap();

    assert_eq!(names_for(&pushes, page), vec!["game_update"]);
    assert_eq!(game(&registry, &id).player(&ada_id).map(|p| p.cards.values().sum::<u32>()), Some(5));
}

// =============================================================================
// REAPER
// =============================================================================

#[test]
fn abandoned_game_is_reaped_after_ttl() {
    let mut registry = Registry::new(8).with_game_ttl(Duration::from_secs(60));
    let (ada, bob, id) = started(&mut registry);
    disconnect(&mut registry, ada);
    disconnect(&mut registry, bob);

    assert_eq!(reap_abandoned(&mut registry, Instant::now()), 0);
    assert!(registry.lobbies.contains_key(&id));

    assert_eq!(reap_abandoned(&mut registry, Instant::now() + Duration::from_secs(61)), 1);
    assert!(registry.lobbies.is_empty());
}

#[test]
fn watched_game_is_not_reaped() {
    let mut registry = Registry::new(8).with_game_ttl(Duration::from_secs(60));
    let (ada, bob, id) = started(&mut registry);
    disconnect(&mut registry, ada);
    disconnect(&mut registry, bob);
    let (viewer, _rx) = connect(&mut registry);
    rejoin_game(&mut registry, viewer, &id, None).unwrap();

    assert_eq!(reap_abandoned(&mut registry, Instant::now() + Duration::from_secs(600)), 0);
}

#[test]
fn open_lobbies_are_never_marked_abandoned() {
    let mut registry = Registry::new(8);
    let ada = connect_named(&mut registry, "Ada");
    let id = new_lobby(&mut registry, ada, 4);

    assert!(registry.lobbies[&id].abandoned_since.is_none());
    assert_eq!(reap_abandoned(&mut registry, Instant::now() + Duration::from_secs(86_400)), 0);
}

// =============================================================================
// DISPATCH
// =============================================================================

#[test]
fn dispatch_routes_client_events() {
    let mut registry = Registry::new(8);
    let (ada, _rx) = connect(&mut registry);

    let pushes = dispatch(&mut registry, ada, ClientEvent::SetUsername { username: "Ada".into() }).unwrap();
    assert_eq!(pushes[0].event.name(), "username_set");

    let pushes = dispatch(
        &mut registry,
        ada,
        ClientEvent::CreateLobby { name: String::new(), max_players: 4 },
    )
    .unwrap();
    assert_eq!(pushes[0].event.name(), "lobby_created");

    let pushes = dispatch(&mut registry, ada, ClientEvent::LeaveLobby).unwrap();
    assert_eq!(pushes[0].event, ServerEvent::LeftLobby);
}

#[test]
fn unknown_client_is_rejected() {
    let mut registry = Registry::new(8);
    let ghost = Uuid::new_v4();
    let err = dispatch(&mut registry, ghost, ClientEvent::GetLobbyList).unwrap_err();
    assert_eq!(err.error_code(), "E_UNKNOWN_CLIENT");
}

#[test]
fn connect_registers_anonymous_client() {
    let mut registry = Registry::new(8);
    let (tx, _rx) = mpsc::channel(4);
    let id = Uuid::new_v4();
    super::connect(&mut registry, id, tx);
    assert!(registry.clients[&id].username.is_none());
}
