//! # Taskboard API Server
//!
//! Serves account management (registration, login with lockout, password
//! recovery) and task assignment over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/taskboard cargo run -p taskboard-api
//! ```
//!
//! Without `DATABASE_URL` the server runs on an in-memory store.

use anyhow::Context;
use std::sync::Arc;
use taskboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskboard_shared::auth::password::Argon2Hasher;
use taskboard_shared::db::{
    migrations::run_migrations,
    pool::{close_pool, create_pool, DatabaseConfig},
};
use taskboard_shared::store::{memory::MemoryStore, postgres::PgStore, Store};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "taskboard_api=debug,taskboard_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let mut pool = None;
    let store: Arc<dyn Store> = match &config.database {
        Some(db) => {
            let db_pool = create_pool(DatabaseConfig {
                url: db.url.clone(),
                max_connections: db.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to database")?;

            run_migrations(&db_pool)
                .await
                .context("Failed to run migrations")?;

            let store = PgStore::new(pool.insert(db_pool).clone());
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data will be kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let hasher = Argon2Hasher::new(config.hashing.into()).context("Invalid hashing parameters")?;

    let addr = config.bind_address();
    let state = AppState::new(store, Arc::new(hasher), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
