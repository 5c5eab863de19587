mod repl;
mod view;

use clap::{Parser, Subcommand};
use client::{Effect, NoticeKind, Route, Session};
use frames::{ClientEvent, GameView, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use repl::ReplCommand;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] frames::CodecError),
    #[error("stdin: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(error))
    }
}

#[derive(Parser, Debug)]
#[command(name = "lobby-cli", about = "Terminal client for the game lobby")]
struct Cli {
    #[arg(long, env = "LOBBY_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Run an interactive lobby session.
    Play {
        /// Page path to start from, e.g. an invite link's `/lobby/ABC123`.
        #[arg(long, default_value = "/")]
        path: String,
    },
    /// Attach to a started game, optionally playing as one of its seats.
    Watch {
        /// Lobby code of the started game.
        lobby_id: String,
        /// Player ID of the seat to play as.
        #[arg(long)]
        player: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_owned();

    match cli.command {
        Command::Ping => run_ping(&base_url).await,
        Command::Play { path } => run_play(&base_url, &path).await,
        Command::Watch { lobby_id, player } => run_watch(&base_url, &lobby_id, player).await,
    }
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let response = client.get(format!("{base_url}/healthz")).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_play(base_url: &str, path: &str) -> Result<(), CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?).await?;
    debug!(base_url, path, "play: connected");

    let mut session = Session::new(Route::parse(path));
    let mut game: Option<GameView> = None;
    print!("{}", view::render(&session, base_url));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match repl::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("! {e}");
                        continue;
                    }
                };
                let before = session.screen();
                let result = match command {
                    ReplCommand::Quit => break,
                    ReplCommand::Help => {
                        println!("{}", repl::HELP);
                        continue;
                    }
                    ReplCommand::Status => {
                        println!("{}", view::status(&session));
                        continue;
                    }
                    ReplCommand::Link => {
                        match session.share_url(base_url) {
                            Some(link) => println!("{link}"),
                            None => eprintln!("! You are not in a lobby"),
                        }
                        continue;
                    }
                    ReplCommand::Board => {
                        match &game {
                            Some(view) => print!("{}", view::game(view, session.lobby())),
                            None => eprintln!("! No game to show"),
                        }
                        continue;
                    }
                    ReplCommand::Draw(_) | ReplCommand::Claim { .. } => {
                        match session.current_lobby_id().and_then(|id| repl::game_event(&command, id)) {
                            Some(event) if game.is_some() => Ok(vec![Effect::Send(event)]),
                            _ => {
                                eprintln!("! No game in progress");
                                continue;
                            }
                        }
                    }
                    ReplCommand::Name(username) => session.set_username(&username),
                    ReplCommand::Create { name, max_players } => session.create_lobby(&name, max_players),
                    ReplCommand::Join(code) => session.join_lobby(&code),
                    ReplCommand::Leave => session.leave_lobby(),
                    ReplCommand::List => session.refresh_lobbies(),
                    ReplCommand::Start => session.start_game(),
                    ReplCommand::Back => session.back_to_browser(),
                    ReplCommand::Go(route) => Ok(session.navigate(route)),
                };
                match result {
                    Ok(effects) => perform(&mut stream, base_url, effects).await?,
                    Err(e) => eprintln!("! {e}"),
                }
                if session.screen() != before {
                    print!("{}", view::render(&session, base_url));
                }
            }
            message = stream.next() => {
                let Some(message) = message else {
                    return Err(CliError::WsClosed);
                };
                let frame = match message? {
                    Message::Binary(bytes) => frames::decode_frame(&bytes)?,
                    Message::Text(text) => frames::decode_json(text.as_str())?,
                    Message::Close(_) => return Err(CliError::WsClosed),
                    _ => continue,
                };
                let event = match ServerEvent::from_frame(&frame) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "play: ignoring push");
                        continue;
                    }
                };
                let redraw = event.lobby().is_some()
                    || matches!(event, ServerEvent::LobbyListUpdate { .. } | ServerEvent::NewHost { .. });
                let dealt = track_game(&mut game, &event);
                let before = session.screen();
                let effects = session.apply(event);
                perform(&mut stream, base_url, effects).await?;
                if redraw || session.screen() != before {
                    print!("{}", view::render(&session, base_url));
                }
                if dealt {
                    if let Some(view) = &game {
                        print!("{}", view::game(view, session.lobby()));
                    }
                }
            }
        }
    }

    let _ = stream.close(None).await;
    Ok(())
}

/// Follow a started game from a fresh connection, the way the game page does.
async fn run_watch(base_url: &str, lobby_id: &str, player: Option<String>) -> Result<(), CliError> {
    let (mut stream, _) = connect_async(ws_url(base_url)?).await?;
    debug!(base_url, lobby_id, ?player, "watch: connected");
    let rejoin = ClientEvent::RejoinGame { lobby_id: lobby_id.to_owned(), player_id: player };
    perform(&mut stream, base_url, vec![Effect::Send(rejoin)]).await?;

    let mut game: Option<GameView> = None;
    let mut lobby: Option<frames::Lobby> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match repl::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("! {e}");
                        continue;
                    }
                };
                match command {
                    ReplCommand::Quit => break,
                    ReplCommand::Help => println!("{}", repl::HELP),
                    ReplCommand::Board => match &game {
                        Some(view) => print!("{}", view::game(view, lobby.as_ref())),
                        None => eprintln!("! No game to show"),
                    },
                    ReplCommand::Leave => {
                        perform(&mut stream, base_url, vec![Effect::Send(ClientEvent::LeaveLobby)]).await?;
                    }
                    other => match repl::game_event(&other, lobby_id) {
                        Some(event) => perform(&mut stream, base_url, vec![Effect::Send(event)]).await?,
                        None => eprintln!("! not available while watching"),
                    },
                }
            }
            message = stream.next() => {
                let Some(message) = message else {
                    return Err(CliError::WsClosed);
                };
                let frame = match message? {
                    Message::Binary(bytes) => frames::decode_frame(&bytes)?,
                    Message::Text(text) => frames::decode_json(text.as_str())?,
                    Message::Close(_) => return Err(CliError::WsClosed),
                    _ => continue,
                };
                let event = match ServerEvent::from_frame(&frame) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "watch: ignoring push");
                        continue;
                    }
                };
                if let Some(snapshot) = event.lobby() {
                    lobby = Some(snapshot.clone());
                }
                match &event {
                    ServerEvent::NewHost { host_id } => println!("* new host {host_id}"),
                    ServerEvent::PlayerLeft { .. } => println!("* a player left the game"),
                    ServerEvent::LeftLobby => {
                        println!("* no longer following the game");
                        break;
                    }
                    ServerEvent::Error { message } => eprintln!("! {message}"),
                    _ => {}
                }
                if track_game(&mut game, &event) {
                    if let Some(view) = &game {
                        print!("{}", view::game(view, lobby.as_ref()));
                    }
                }
            }
        }
    }

    let _ = stream.close(None).await;
    Ok(())
}

/// Keep the latest game view from `game_started`/`game_update`. Returns
/// whether it changed.
fn track_game(game: &mut Option<GameView>, event: &ServerEvent) -> bool {
    match event {
        ServerEvent::GameStarted { game: Some(view), .. } | ServerEvent::GameUpdate { game: view, .. } => {
            *game = Some(view.clone());
            true
        }
        _ => false,
    }
}

/// Carry out session effects: sends go to the socket, the rest to the terminal.
async fn perform(stream: &mut WsStream, base_url: &str, effects: Vec<Effect>) -> Result<(), CliError> {
    for effect in effects {
        match effect {
            Effect::Send(event) => {
                debug!(event = event.name(), "play: send");
                let bytes = frames::encode_frame(&event.to_frame());
                stream.send(Message::Binary(bytes.into())).await?;
            }
            Effect::PushUrl(route) => println!("-> {}", route.url(base_url)),
            Effect::Navigate(route) => println!("=> {}", route.url(base_url)),
            Effect::Notify(notice) => match notice.kind {
                NoticeKind::Success => println!("* {}", notice.message),
                NoticeKind::Error => eprintln!("! {}", notice.message),
            },
        }
    }
    Ok(())
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/ws"));
    }

    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}
