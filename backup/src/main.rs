//! Backup and restore CLI for the SignalHub database.

use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::backup::retention::BackupKind;
use shared::backup::{BackupManager, BackupScheduler};
use shared::{get_db_connection, Config};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// SignalHub database backups
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Backup directory (overrides BACKUP_DIR)
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Number of backups to keep (overrides MAX_BACKUPS)
    #[arg(long, global = true)]
    max_backups: Option<usize>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Take a SQL backup now
    Backup {
        /// Also write a JSON export of users and their settings
        #[arg(long)]
        json: bool,
    },
    /// Restore a SQL file (defaults to schema.sql)
    Restore { file: Option<String> },
    /// Re-insert users missing since the latest JSON export and repair their defaults
    AutoRestore,
    /// List SQL and JSON backups, newest first
    List,
    /// Back up on an interval until Ctrl-C
    Schedule,
    /// Prepare an empty database from backups, schema or migrations
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = args.dir {
        config.backup.dir = dir;
    }
    if let Some(max) = args.max_backups {
        config.backup.max_backups = max;
    }

    let db = Arc::new(get_db_connection(&config.database_url).await?);
    let manager = Arc::new(BackupManager::new(db, &config.backup));

    match args.command {
        Cmd::Backup { json } => {
            let report = manager.create_backup().await?;
            println!("Backup written to {}", report.file.display());
            for name in &report.removed {
                println!("Removed {}", name);
            }
            if json {
                let report = manager.create_json_backup().await?;
                println!("JSON export written to {}", report.file.display());
            }
        }
        Cmd::Restore { file } => {
            let restored = manager.restore(file.as_deref()).await?;
            println!("Restored {}", restored.display());
        }
        Cmd::AutoRestore => {
            let report = manager.auto_restore().await?;
            match &report.backup {
                Some(path) => println!("Used {}", path.display()),
                None => println!("No JSON backup found"),
            }
            println!(
                "Users restored: {}, settings repaired: {}, notification settings repaired: {}, subscriptions repaired: {}",
                report.users_restored,
                report.settings_repaired,
                report.notification_settings_repaired,
                report.subscriptions_repaired
            );
        }
        Cmd::List => {
            for kind in [BackupKind::Sql, BackupKind::Json] {
                let files = manager.list(kind).await?;
                println!("{} backups in {}: {}", kind.extension(), manager.dir().display(), files.len());
                for file in files {
                    println!(
                        "  {}  {}  {} bytes",
                        file.taken_at.format("%Y-%m-%d %H:%M:%S"),
                        file.name,
                        file.size
                    );
                }
            }
        }
        Cmd::Schedule => {
            BackupScheduler::new(manager)
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }
        Cmd::Init => {
            let outcome = manager.initialize_database().await?;
            println!("{:?}", outcome);
        }
    }

    Ok(())
}
