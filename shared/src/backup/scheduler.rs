use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use super::BackupManager;

/// Periodic SQL backups. A tick that finds the previous run still going is
/// skipped rather than queued.
pub struct BackupScheduler {
    manager: Arc<BackupManager>,
    running: Arc<AtomicBool>,
}

/// Held for the duration of one backup run.
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl BackupScheduler {
    pub fn new(manager: Arc<BackupManager>) -> Self {
        Self {
            manager,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_start(&self) -> Option<RunGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: self.running.clone(),
            })
    }

    fn tick(&self) {
        let Some(guard) = self.try_start() else {
            tracing::warn!("Previous backup still running, skipping this tick");
            return;
        };
        let manager = self.manager.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match manager.create_backup().await {
                Ok(report) => tracing::info!(
                    file = %report.file.display(),
                    removed = report.removed.len(),
                    "Scheduled backup finished"
                ),
                Err(e) => tracing::error!("Scheduled backup failed: {}", e),
            }
        });
    }

    /// Take an initial backup immediately, then one per interval until
    /// `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let interval = self.manager.interval();
        if interval.is_zero() {
            tracing::error!("Backup interval is zero, scheduler not started");
            return;
        }
        tracing::info!(
            "Backup scheduler started: every {:?}, directory {}",
            interval,
            self.manager.dir().display()
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Backup scheduler stopping");
                    break;
                }
                _ = ticker.tick() => self.tick(),
            }
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run_until(std::future::pending()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackupConfig, PgConnectionInfo};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::time::Duration;

    fn scheduler() -> BackupScheduler {
        scheduler_every(Duration::from_secs(60))
    }

    fn scheduler_every(interval: Duration) -> BackupScheduler {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let config = BackupConfig {
            enabled: true,
            dir: "backups".to_string(),
            interval,
            max_backups: 10,
            command_timeout: Duration::from_secs(1),
            pg_bin_dir: None,
            pg: PgConnectionInfo {
                host: "localhost".to_string(),
                port: "5432".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                database: "signalhub".to_string(),
            },
            default_user_password: None,
        };
        BackupScheduler::new(Arc::new(BackupManager::new(Arc::new(db), &config)))
    }

    #[test]
    fn test_overlapping_runs_are_refused() {
        let scheduler = scheduler();
        let first = scheduler.try_start();
        assert!(first.is_some());
        assert!(scheduler.try_start().is_none());

        drop(first);
        assert!(scheduler.try_start().is_some());
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let scheduler = scheduler();
        let running = scheduler.running.clone();
        // Holding the flag makes every tick a no-op.
        running.store(true, Ordering::Release);
        tokio::time::timeout(Duration::from_secs(1), scheduler.run_until(async {}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_interval_returns_instead_of_panicking() {
        let handle = scheduler_every(Duration::ZERO).spawn();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
