use line_keyword_bot::api::{router, AppState};
use line_keyword_bot::config::Config;
use line_keyword_bot::line::{LineClient, WebhookHandler};
use line_keyword_bot::responder::{Responder, ResponderConfig};
use line_keyword_bot::store::{PgUserStore, UserStore};

use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before LOG_DIR and the rest of the config are read
    let dotenv_result = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).unwrap_or_else(|e| {
        eprintln!(
            "Warning: Could not create log directory {}: {}",
            config.log_dir.display(),
            e
        );
    });

    // Create file appender with daily rotation
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "line-keyword-bot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - console plus JSON file output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,line_keyword_bot=debug")),
        )
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", config.log_dir.display());

    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    let socket_addr = config.socket_addr()?;
    info!("Starting LINE bot on {}", socket_addr);
    info!("Register on follow: {}", config.register_on_follow);

    // Connect to PostgreSQL and create the users table
    let store = PgUserStore::connect(&config).await?;
    store.ensure_schema().await?;
    let store: Arc<dyn UserStore> = Arc::new(store);

    // LINE Messaging API client
    let line_client = LineClient::new(&config)?;

    let responder = Responder::new(
        Arc::new(line_client),
        store.clone(),
        ResponderConfig {
            register_on_follow: config.register_on_follow,
        },
    );

    // Wire the webhook handler and shared state
    let state = Arc::new(AppState {
        webhook: WebhookHandler::new(config.channel_secret.clone(), responder),
        store,
        start_time: Instant::now(),
    });

    let app = router(state);

    // Create listener
    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
