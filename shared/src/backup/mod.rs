//! Database backup and restore.
//!
//! Physical backups shell out to `pg_dumpall`/`pg_dump`/`psql`; logical JSON
//! backups go through SeaORM. Every public operation takes the manager's
//! mutex, so a backup and a restore never overlap within one process.

pub mod pg;
pub mod retention;
pub mod scheduler;
pub mod snapshot;

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    IntoActiveModel, Statement, TransactionTrait,
};
use sea_orm::ActiveValue::Set;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

use crate::config::BackupConfig;
use crate::entity::sea_orm_active_enums::{Language, SubscriptionTier};
use crate::entity::{subscriptions, user_notification_settings, user_settings, users};
use crate::error::{AppError, Result};
use crate::repositories::subscription_repository::NewSubscription;
use crate::repositories::{SettingsRepository, SubscriptionRepository, UserRepository};
use crate::services::FREE_DAILY_SIGNAL_LIMIT;

use pg::PgTools;
use retention::{backup_file_name, list_backups, select_for_deletion, BackupFile, BackupKind, SCHEMA_FILE};
pub use scheduler::BackupScheduler;
use snapshot::JsonBackup;

/// Username of the account seeded into an empty database.
pub const DEFAULT_USERNAME: &str = "Binarjoinanalytic";

const SEQUENCED_TABLES: [&str; 4] = [
    "users",
    "user_settings",
    "user_notification_settings",
    "subscriptions",
];

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub file: PathBuf,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    AlreadyInitialized,
    RestoredBackup(PathBuf),
    RestoredSchema,
    Migrated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoRestoreReport {
    pub backup: Option<PathBuf>,
    pub users_restored: usize,
    pub settings_repaired: usize,
    pub notification_settings_repaired: usize,
    pub subscriptions_repaired: usize,
}

pub struct BackupManager {
    db: Arc<DatabaseConnection>,
    tools: PgTools,
    dir: PathBuf,
    max_backups: usize,
    interval: Duration,
    default_user_password: Option<String>,
    lock: Mutex<()>,
}

const PARTIAL_SUFFIX: &str = ".tmp";

/// Dumps are written here first and renamed into place once complete, so an
/// interrupted run never leaves a file that looks like a finished backup.
fn partial_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn remove_partial(file: &Path) {
    match tokio::fs::remove_file(file).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial backup {}: {}", file.display(), e),
    }
}

impl BackupManager {
    pub fn new(db: Arc<DatabaseConnection>, config: &BackupConfig) -> Self {
        Self {
            db,
            tools: PgTools::new(config.pg.clone(), config.command_timeout, config.pg_bin_dir.clone()),
            dir: PathBuf::from(&config.dir),
            max_backups: config.max_backups,
            interval: config.interval,
            default_user_password: config.default_user_password.clone(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn list(&self, kind: BackupKind) -> Result<Vec<BackupFile>> {
        Ok(list_backups(&self.dir, kind).await?)
    }

    async fn apply_retention(&self, kind: BackupKind) -> Result<Vec<String>> {
        let doomed = select_for_deletion(list_backups(&self.dir, kind).await?, self.max_backups);
        let mut removed = Vec::with_capacity(doomed.len());
        for file in doomed {
            tokio::fs::remove_file(&file.path).await?;
            tracing::info!("Removed old backup {}", file.name);
            removed.push(file.name);
        }
        Ok(removed)
    }

    /// Delete partial files left by runs that were killed or aborted. Only
    /// files older than the command timeout are touched, since no live dump
    /// can have been writing to them that long.
    async fn sweep_partials(&self) -> Result<()> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let cutoff = SystemTime::now()
            .checked_sub(self.tools.timeout())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(PARTIAL_SUFFIX) {
                continue;
            }
            let stale = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .map(|modified| modified < cutoff)
                .unwrap_or(false);
            if stale {
                tracing::info!("Removing stale partial backup {}", name);
                remove_partial(&entry.path()).await;
            }
        }
        Ok(())
    }

    /// Full SQL dump plus a schema-only snapshot, then retention.
    pub async fn create_backup(&self) -> Result<BackupReport> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        self.sweep_partials().await?;

        let file = self.dir.join(backup_file_name(Utc::now(), BackupKind::Sql));
        let partial = partial_path(&file);
        tracing::info!("Creating backup {}", file.display());

        if let Err(e) = self.tools.dump_all(&partial).await {
            tracing::warn!("pg_dumpall failed, falling back to pg_dump: {}", e);
            remove_partial(&partial).await;
            if let Err(e) = self.tools.dump_database(&partial).await {
                tracing::error!("Backup failed: {}", e);
                remove_partial(&partial).await;
                return Err(e);
            }
        }
        tokio::fs::rename(&partial, &file).await?;

        let schema = self.dir.join(SCHEMA_FILE);
        let schema_tmp = partial_path(&schema);
        match self.tools.dump_schema(&schema_tmp).await {
            Ok(()) => tokio::fs::rename(&schema_tmp, &schema).await?,
            Err(e) => {
                remove_partial(&schema_tmp).await;
                tracing::warn!("Schema snapshot failed: {}", e);
            }
        }

        let removed = self.apply_retention(BackupKind::Sql).await?;
        tracing::info!("Backup complete: {}", file.display());
        Ok(BackupReport { file, removed })
    }

    /// Export accounts with their settings and subscriptions as JSON.
    pub async fn create_json_backup(&self) -> Result<BackupReport> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let db = self.db.as_ref();

        let backup = JsonBackup {
            created_at: Utc::now(),
            users: users::Entity::find().all(db).await?,
            user_settings: user_settings::Entity::find().all(db).await?,
            user_notification_settings: user_notification_settings::Entity::find().all(db).await?,
            subscriptions: subscriptions::Entity::find().all(db).await?,
        };

        let file = self.dir.join(backup_file_name(backup.created_at, BackupKind::Json));
        let tmp = partial_path(&file);
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&backup)?).await?;
        tokio::fs::rename(&tmp, &file).await?;
        tracing::info!(users = backup.users.len(), "JSON backup written to {}", file.display());

        let removed = self.apply_retention(BackupKind::Json).await?;
        Ok(BackupReport { file, removed })
    }

    /// Relative names resolve against the backup directory.
    pub async fn resolve(&self, file: &str) -> Result<PathBuf> {
        let path = Path::new(file);
        let as_given = path.is_absolute()
            || (path.components().count() > 1 && tokio::fs::try_exists(path).await.unwrap_or(false));
        let path = if as_given {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        };
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(AppError::NotFound(format!("Backup file {} not found", path.display())));
        }
        Ok(path)
    }

    async fn restore_file(&self, path: &Path) -> Result<()> {
        tracing::info!("Restoring {}", path.display());
        self.tools.restore(path).await?;
        tracing::info!("Restore of {} complete", path.display());
        Ok(())
    }

    pub async fn restore(&self, file: Option<&str>) -> Result<PathBuf> {
        let _guard = self.lock.lock().await;
        let path = self.resolve(file.unwrap_or(SCHEMA_FILE)).await?;
        self.restore_file(&path).await?;
        Ok(path)
    }

    async fn restore_latest_inner(&self) -> Result<PathBuf> {
        let latest = list_backups(&self.dir, BackupKind::Sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("No SQL backups available".to_string()))?;
        self.restore_file(&latest.path).await?;
        Ok(latest.path)
    }

    pub async fn restore_latest(&self) -> Result<PathBuf> {
        let _guard = self.lock.lock().await;
        self.restore_latest_inner().await
    }

    async fn restore_schema_inner(&self) -> Result<InitOutcome> {
        let schema = self.dir.join(SCHEMA_FILE);
        if tokio::fs::try_exists(&schema).await.unwrap_or(false) {
            self.restore_file(&schema).await?;
            Ok(InitOutcome::RestoredSchema)
        } else {
            tracing::info!("No schema snapshot, running migrations");
            self.run_migrations_inner().await?;
            Ok(InitOutcome::Migrated)
        }
    }

    pub async fn restore_schema(&self) -> Result<InitOutcome> {
        let _guard = self.lock.lock().await;
        self.restore_schema_inner().await
    }

    async fn run_migrations_inner(&self) -> Result<()> {
        Migrator::up(self.db.as_ref(), None).await?;
        tracing::info!("Migrations applied");
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.run_migrations_inner().await
    }

    pub async fn check_connection(&self) -> Result<()> {
        self.db.execute_unprepared("SELECT 1").await?;
        Ok(())
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = 'public' AND table_name = $1) AS present",
            [table.into()],
        );
        match self.db.query_one(statement).await? {
            Some(row) => Ok(row.try_get::<bool>("", "present")?),
            None => Ok(false),
        }
    }

    /// Bring an empty database to a usable state: latest backup, else the
    /// schema snapshot, else migrations. Seeds the default account when the
    /// users table is empty and a password is configured.
    pub async fn initialize_database(&self) -> Result<InitOutcome> {
        let _guard = self.lock.lock().await;
        self.check_connection().await?;

        let outcome = if self.table_exists("users").await? && self.table_exists("signals").await? {
            tracing::info!("Database already initialized");
            InitOutcome::AlreadyInitialized
        } else {
            match self.bootstrap().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("Bootstrap failed, running migrations: {}", e);
                    self.run_migrations_inner().await?;
                    InitOutcome::Migrated
                }
            }
        };

        self.seed_default_user().await?;
        Ok(outcome)
    }

    async fn bootstrap(&self) -> Result<InitOutcome> {
        match self.restore_latest_inner().await {
            Ok(path) => Ok(InitOutcome::RestoredBackup(path)),
            Err(e) => {
                tracing::info!("No usable backup ({}), restoring schema", e);
                self.restore_schema_inner().await
            }
        }
    }

    async fn seed_default_user(&self) -> Result<()> {
        let repo = UserRepository::new(self.db.clone());
        if repo.count().await? > 0 {
            return Ok(());
        }
        let Some(password) = self.default_user_password.as_deref() else {
            tracing::info!("Users table is empty and DEFAULT_USER_PASSWORD is unset, not seeding");
            return Ok(());
        };

        let active = users::ActiveModel {
            username: Set(DEFAULT_USERNAME.to_string()),
            password: Set(crate::auth::hash_password(password)?),
            subscription_level: Set(SubscriptionTier::Free),
            language: Set(Language::Ar),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let user = repo.create_with_defaults(active, FREE_DAILY_SIGNAL_LIMIT).await?;
        tracing::info!(user_id = user.id, "Created default user {}", DEFAULT_USERNAME);
        Ok(())
    }

    /// Re-insert accounts present in the newest JSON backup but missing from
    /// the database, then repair per-user default rows.
    pub async fn auto_restore(&self) -> Result<AutoRestoreReport> {
        let _guard = self.lock.lock().await;
        let mut report = AutoRestoreReport::default();

        if let Some(latest) = list_backups(&self.dir, BackupKind::Json).await?.into_iter().next() {
            let backup: JsonBackup = serde_json::from_slice(&tokio::fs::read(&latest.path).await?)?;
            let existing = users::Entity::find().all(self.db.as_ref()).await?;

            if backup.users.len() > existing.len() {
                let missing = backup.missing_from(&existing);
                report.users_restored = missing.users.len();
                self.insert_backup_rows(missing).await?;
                tracing::info!(
                    restored = report.users_restored,
                    "Restored users from {}",
                    latest.name
                );
            } else {
                tracing::info!("Database has all users from {}", latest.name);
            }
            report.backup = Some(latest.path);
        } else {
            tracing::info!("No JSON backup found in {}", self.dir.display());
        }

        self.repair_defaults(&mut report).await?;
        Ok(report)
    }

    async fn insert_backup_rows(&self, rows: JsonBackup) -> Result<()> {
        if rows.users.is_empty() {
            return Ok(());
        }
        let txn = self.db.begin().await?;

        users::Entity::insert_many(rows.users.into_iter().map(|m| m.into_active_model().reset_all()))
            .on_conflict(OnConflict::column(users::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;
        if !rows.user_settings.is_empty() {
            user_settings::Entity::insert_many(
                rows.user_settings.into_iter().map(|m| m.into_active_model().reset_all()),
            )
            .on_conflict(OnConflict::column(user_settings::Column::UserId).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;
        }
        if !rows.user_notification_settings.is_empty() {
            user_notification_settings::Entity::insert_many(
                rows.user_notification_settings
                    .into_iter()
                    .map(|m| m.into_active_model().reset_all()),
            )
            .on_conflict(
                OnConflict::column(user_notification_settings::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }
        if !rows.subscriptions.is_empty() {
            subscriptions::Entity::insert_many(
                rows.subscriptions.into_iter().map(|m| m.into_active_model().reset_all()),
            )
            .on_conflict(OnConflict::column(subscriptions::Column::UserId).do_nothing().to_owned())
            .exec_without_returning(&txn)
            .await?;
        }

        // Explicit ids leave the serial sequences behind.
        for table in SEQUENCED_TABLES {
            txn.execute_unprepared(&format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                 COALESCE((SELECT MAX(id) FROM {table}), 1))"
            ))
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn repair_defaults(&self, report: &mut AutoRestoreReport) -> Result<()> {
        let settings = SettingsRepository::new(self.db.clone());
        let subscriptions = SubscriptionRepository::new(self.db.clone());

        for user in UserRepository::new(self.db.clone()).list_all().await? {
            let (_, created) = settings.ensure_settings(user.id).await?;
            if created {
                report.settings_repaired += 1;
            }
            if settings.find_notification_settings(user.id).await?.is_none() {
                settings.ensure_notification_settings(user.id).await?;
                report.notification_settings_repaired += 1;
            }
            if subscriptions.find_by_user(user.id).await?.is_none() {
                subscriptions
                    .upsert(NewSubscription {
                        user_id: user.id,
                        tier: SubscriptionTier::Free,
                        start_date: Utc::now(),
                        end_date: None,
                        daily_signal_limit: FREE_DAILY_SIGNAL_LIMIT,
                        payment_method: None,
                        transaction_id: None,
                        amount: None,
                        currency: None,
                    })
                    .await?;
                report.subscriptions_repaired += 1;
            }
        }
        if report.settings_repaired + report.notification_settings_repaired + report.subscriptions_repaired > 0 {
            tracing::info!(?report, "Repaired missing per-user defaults");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PgConnectionInfo;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn manager_with(dir: &Path, bin_dir: Option<PathBuf>, command_timeout: Duration) -> BackupManager {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        BackupManager::new(
            Arc::new(db),
            &BackupConfig {
                enabled: false,
                dir: dir.display().to_string(),
                interval: Duration::from_secs(300),
                max_backups: 2,
                command_timeout,
                pg_bin_dir: bin_dir,
                pg: PgConnectionInfo {
                    host: "localhost".to_string(),
                    port: "5432".to_string(),
                    user: "postgres".to_string(),
                    password: String::new(),
                    database: "signalhub".to_string(),
                },
                default_user_password: None,
            },
        )
    }

    fn manager(dir: &Path) -> BackupManager {
        manager_with(dir, None, Duration::from_secs(5))
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Shell stand-ins for the Postgres tools. Each writes `body` to the
    /// file after `-f`, then runs `tail` (e.g. `exit 1` or `sleep 30`).
    #[cfg(unix)]
    fn fake_tools(bin: &Path, tools: &[(&str, &str, &str)]) {
        use std::os::unix::fs::PermissionsExt;

        for (name, body, tail) in tools {
            let script = format!(
                "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-f\" ]; then out=\"$2\"; fi\n  shift\ndone\nprintf '%s\\n' '{}' > \"$out\"\n{}\n",
                body, tail
            );
            let path = bin.join(name);
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_resolve_relative_names_against_backup_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("backup-x.sql"), b"--").unwrap();
        let manager = manager(dir.path());

        assert_eq!(
            manager.resolve("backup-x.sql").await.unwrap(),
            dir.path().join("backup-x.sql")
        );
        assert!(matches!(
            manager.resolve("missing.sql").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path());
        assert!(matches!(
            manager.restore(Some("nope.sql")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(manager.restore_latest().await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_apply_retention_removes_oldest_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utc::now() - chrono::Duration::hours(10);
        let names: Vec<String> = (0..4)
            .map(|i| backup_file_name(base + chrono::Duration::hours(i), BackupKind::Sql))
            .collect();
        for name in &names {
            std::fs::write(dir.path().join(name), b"--").unwrap();
        }
        std::fs::write(dir.path().join(SCHEMA_FILE), b"--").unwrap();

        let removed = manager(dir.path()).apply_retention(BackupKind::Sql).await.unwrap();
        assert_eq!(removed, vec![names[0].clone(), names[1].clone()]);
        assert!(dir.path().join(SCHEMA_FILE).exists());
        assert!(dir.path().join(&names[3]).exists());
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let file = Path::new("backups/backup-2024-05-01T10-15-00-123Z.sql");
        assert_eq!(
            partial_path(file),
            PathBuf::from("backups/backup-2024-05-01T10-15-00-123Z.sql.tmp")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dumpall_failure_falls_back_to_pg_dump() {
        let bin = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fake_tools(
            bin.path(),
            &[
                ("pg_dumpall", "-- truncated", "exit 1"),
                ("pg_dump", "-- complete dump", "exit 0"),
            ],
        );
        let manager = manager_with(dir.path(), Some(bin.path().to_path_buf()), Duration::from_secs(10));

        let report = manager.create_backup().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&report.file).unwrap(),
            "-- complete dump\n"
        );
        assert!(dir.path().join(SCHEMA_FILE).is_file());
        assert!(names_in(dir.path()).iter().all(|n| !n.ends_with(PARTIAL_SUFFIX)));
        assert_eq!(manager.list(BackupKind::Sql).await.unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_dump_leaves_no_files() {
        let bin = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fake_tools(
            bin.path(),
            &[
                ("pg_dumpall", "-- truncated", "exit 1"),
                ("pg_dump", "-- truncated", "exit 2"),
            ],
        );
        let manager = manager_with(dir.path(), Some(bin.path().to_path_buf()), Duration::from_secs(10));

        assert!(matches!(manager.create_backup().await, Err(AppError::Command(_))));
        assert!(names_in(dir.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_aborted_dump_is_not_listed_as_backup() {
        let bin = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        fake_tools(bin.path(), &[("pg_dumpall", "-- first line only", "sleep 30")]);
        let manager = Arc::new(manager_with(
            dir.path(),
            Some(bin.path().to_path_buf()),
            Duration::from_secs(60),
        ));

        let running = manager.clone();
        let handle = tokio::spawn(async move { running.create_backup().await });
        tokio::time::sleep(Duration::from_millis(500)).await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert!(manager.list(BackupKind::Sql).await.unwrap().is_empty());
        assert!(matches!(manager.restore_latest().await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_partials_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("backup-2024-05-01T10-15-00-123Z.sql.tmp");
        let fresh = dir.path().join("backup-2024-05-01T10-20-00-000Z.sql.tmp");
        std::fs::write(&stale, b"--").unwrap();
        std::fs::write(&fresh, b"--").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        manager(dir.path()).sweep_partials().await.unwrap();
        assert!(!stale.exists());
        assert!(fresh.exists());
    }
}
