// Scorer service entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open database, check for crash recovery
// 4. Import the roster CSV when nothing was stored
// 5. Create channels
// 6. Spawn WebSocket server task
// 7. Spawn app logic task
// 8. Wait for Ctrl+C, then shut down

use std::path::Path;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use crease_app::app;
use crease_app::config;
use crease_app::db;
use crease_app::protocol::ScorerCommand;
use crease_app::roster;
use crease_app::ws_server;
use crease_core::tournament::Tournament;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Crease scorer starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: tournament={}, {} overs per innings",
        config.tournament.name, config.tournament.default_overs
    );

    // 3. Open database
    let db = db::Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let mut app_state = app::AppState::new(config.clone(), Tournament::default(), db);

    match app::recover_from_db(&mut app_state) {
        Ok(true) => info!("Tournament restored from previous session"),
        Ok(false) => {
            // 4. Fresh start: seed teams from the roster file
            let teams = roster::load_roster(Path::new(&config.tournament.roster_csv))
                .context("failed to load roster")?;
            info!("Loaded {} teams from {}", teams.len(), config.tournament.roster_csv);
            app_state.tournament = Tournament::new(teams);
            app_state
                .db
                .save_snapshot(&app_state.tournament.snapshot())
                .context("failed to store initial roster")?;
        }
        Err(e) => {
            error!("Crash recovery failed: {}", e);
            return Err(e.context("crash recovery failed"));
        }
    }

    // 5. Create channels
    let (ws_tx, ws_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (updates_tx, _) = broadcast::channel(256);

    // 6. Spawn WebSocket server task
    let ws_port = config.ws_port;
    let ws_updates = updates_tx.clone();
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, ws_tx, ws_updates).await {
            error!("WebSocket server error on port {}: {}", ws_port, e);
        }
    });

    // 7. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(ws_rx, cmd_rx, updates_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    info!("Scorer ready. WebSocket server listening on 127.0.0.1:{}", ws_port);

    // 8. Block until Ctrl+C
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");
    let _ = cmd_tx.send(ScorerCommand::Quit).await;

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    // Abort WebSocket server (it loops forever)
    ws_handle.abort();

    info!("Crease scorer shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to `logs/crease.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("crease.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crease_app=info,crease_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
