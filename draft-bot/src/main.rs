// Draft bot entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the console the transport uses)
// 2. Load config
// 3. Open database
// 4. Bootstrap the engine (seed the catalog, or resume a session in progress)
// 5. Create the command channel
// 6. Spawn the engine loop
// 7. Run the console transport until EOF/quit
// 8. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use draft_bot::app;
use draft_bot::config;
use draft_bot::console;
use draft_bot::db;
use draft_bot::engine;
use draft_bot::notify;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("Draft bot starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} rounds, tick every {}s, announcing on {}",
        config.draft.rounds, config.draft.tick_seconds, config.notifications.channel
    );

    let db = db::Database::open(&config.database.path).context("failed to open database")?;
    info!("Database opened at {}", config.database.path);

    let engine = engine::DraftEngine::bootstrap(&config, db)
        .context("failed to bootstrap draft engine")?;

    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    let notifier: Arc<dyn notify::Notifier> = Arc::new(notify::LogNotifier);
    let tick_period = Duration::from_secs(config.draft.tick_seconds);
    let channel = config.notifications.channel.clone();

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(engine, cmd_rx, notifier, channel, tick_period).await {
            error!("Engine loop error: {e:#}");
        }
    });

    // The console transport blocks until EOF or `quit`; dropping cmd_tx
    // afterwards tells the engine loop to shut down.
    if let Err(e) = console::run(cmd_tx).await {
        error!("Console transport error: {e:#}");
    }

    // Cleanup: wait for the engine loop to drain (with timeout).
    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("Draft bot shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the console belongs to the
/// transport).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("draftbot.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draft_bot=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
