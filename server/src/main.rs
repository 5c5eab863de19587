mod assets;
mod config;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env().expect("invalid configuration");
    let port = config.port;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        board_geometry = config.board_geometry_path.is_some(),
        map_dir = ?config.map_dir,
        max_lobbies = config.max_lobbies,
        game_ttl_secs = config.game_ttl.as_secs(),
        "config loaded"
    );

    let assets = assets::GameAssets::load(&config).await.expect("failed to load game assets");
    let state = state::AppState::with_assets(config, assets);
    let _reaper = services::reaper::spawn_reaper(state.clone());
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "lobby server listening");
    axum::serve(listener, app).await.expect("server failed");
}
