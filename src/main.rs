//! News portal server

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsportal::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxJobRunRepository, SqlxSessionRepository},
    },
    services::{create_mailer, NotificationDispatcher},
    tasks::{system_clock, DigestScheduler, TaskQueue, TaskWorker, QUEUE_CAPACITY},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first: the debug flag picks the default log level
    let config = Config::load_with_env(Path::new("config.yml"))?;

    let default_filter = if config.site.debug {
        "newsportal=debug,tower_http=debug"
    } else {
        "newsportal=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting news portal");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Background email delivery
    let mailer = create_mailer(&config.mail)?;
    let dispatcher = Arc::new(NotificationDispatcher::from_pool(pool.clone(), mailer, &config)?);
    tracing::info!(base_url = %dispatcher.links().home(), "Notification dispatcher ready");

    let (queue, receiver) = TaskQueue::new(QUEUE_CAPACITY);
    TaskWorker::new(receiver, dispatcher, system_clock()).spawn();

    if config.scheduler.enabled {
        DigestScheduler::new(
            queue.clone(),
            SqlxJobRunRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            config.site.tz()?,
            &config.scheduler,
            system_clock(),
        )?
        .spawn();
    } else {
        tracing::info!("Weekly digest scheduler disabled");
    }

    let state = AppState::new(pool.clone(), &config, queue)?;
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
