//! Tipline server

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tipline_server::{
    routes, AppState, Config, ConsoleEmailSender, EmailSender, InMemoryParticipantStore,
    InMemorySessionStore, ParticipantStore, SessionStore, SiteConfig, SmtpConfig,
    SmtpEmailSender, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tipline_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let site = config.site()?;
    let sender = email_sender();

    match &config.database_path {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            tracing::info!(path = %path, "Using SQLite store");
            serve(&config, site, store.clone(), store, sender).await
        }
        None => {
            tracing::warn!("DATABASE_PATH not set, data will not survive a restart");
            serve(
                &config,
                site,
                InMemoryParticipantStore::new(),
                InMemorySessionStore::new(),
                sender,
            )
            .await
        }
    }
}

fn email_sender() -> Box<dyn EmailSender> {
    if let Some(smtp) = SmtpConfig::from_env() {
        match SmtpEmailSender::new(smtp) {
            Ok(sender) => return Box::new(sender),
            Err(e) => tracing::error!(error = %e, "Falling back to console email"),
        }
    }
    tracing::info!("Using console email sender");
    Box::new(ConsoleEmailSender::new())
}

async fn serve<U, S>(
    config: &Config,
    site: SiteConfig,
    participant_store: U,
    session_store: S,
    sender: Box<dyn EmailSender>,
) -> Result<()>
where
    U: ParticipantStore + 'static,
    S: SessionStore + 'static,
{
    let state = Arc::new(AppState::new(site, participant_store, session_store, sender));

    // Outbound queue sweep
    let sweep_state = state.clone();
    let interval = Duration::from_secs(config.dequeue_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            // Store and SMTP calls block
            let state = sweep_state.clone();
            match tokio::task::spawn_blocking(move || state.emails().dequeue_emails()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Outbound queue sweep failed"),
                Err(e) => tracing::error!(error = %e, "Outbound queue sweep panicked"),
            }
        }
    });

    let app = routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Tipline listening on http://{}", addr);
    tracing::info!("Verification links point at {}", config.canonical_url);

    axum::serve(listener, app).await?;

    Ok(())
}
