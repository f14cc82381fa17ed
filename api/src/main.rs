use anyhow::Result;
use api::{app, AppState};
use shared::backup::{BackupManager, BackupScheduler};
use shared::{get_db_connection, Config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        "Starting SignalHub API (git {}, built {})...",
        env!("GIT_HASH"),
        env!("BUILD_TIME")
    );

    let config = Config::from_env()?;
    let db = Arc::new(get_db_connection(&config.database_url).await?);

    let backups = Arc::new(BackupManager::new(db.clone(), &config.backup));
    match backups.initialize_database().await {
        Ok(outcome) => tracing::info!(?outcome, "Database ready"),
        Err(e) => tracing::error!("Database initialization failed: {}", e),
    }
    if config.backup.enabled {
        BackupScheduler::new(backups.clone()).spawn();
    } else {
        tracing::info!("Backup scheduler disabled");
    }

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let state = Arc::new(AppState::new(db, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    Ok(())
}
