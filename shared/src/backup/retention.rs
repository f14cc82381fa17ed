//! Backup file naming and the retention policy.
//!
//! Files are named `backup-<ts>.<ext>` where `<ts>` is an RFC-3339 UTC
//! timestamp with `:` and `.` replaced by `-`, e.g.
//! `backup-2024-05-01T10-15-00-123Z.sql`. `schema.sql` lives in the same
//! directory and is never a retention candidate.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const BACKUP_PREFIX: &str = "backup-";
pub const SCHEMA_FILE: &str = "schema.sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Sql,
    Json,
}

impl BackupKind {
    pub fn extension(&self) -> &'static str {
        match self {
            BackupKind::Sql => "sql",
            BackupKind::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub name: String,
    pub path: PathBuf,
    /// Timestamp embedded in the name, else the file's mtime.
    pub taken_at: DateTime<Utc>,
    pub size: u64,
}

pub fn file_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

pub fn backup_file_name(now: DateTime<Utc>, kind: BackupKind) -> String {
    format!("{}{}.{}", BACKUP_PREFIX, file_timestamp(now), kind.extension())
}

/// Inverse of [`backup_file_name`] for the timestamp part.
pub fn timestamp_from_name(name: &str, kind: BackupKind) -> Option<DateTime<Utc>> {
    let stem = name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(&format!(".{}", kind.extension()))?;
    let (date, time) = stem.split_once('T')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;

    let time = time.trim_end_matches('Z');
    let mut parts = time.split('-').map(|p| p.parse::<u32>().ok());
    let hour = parts.next()??;
    let minute = parts.next()??;
    let second = parts.next()??;
    let milli = match parts.next() {
        Some(ms) => ms?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    let naive = date.and_hms_milli_opt(hour, minute, second, milli)?;
    Some(Utc.from_utc_datetime(&naive))
}

pub fn is_backup_name(name: &str, kind: BackupKind) -> bool {
    name != SCHEMA_FILE
        && name.starts_with(BACKUP_PREFIX)
        && name.ends_with(&format!(".{}", kind.extension()))
}

/// Backups of one kind in `dir`, newest first. A missing directory is empty.
pub async fn list_backups(dir: &Path, kind: BackupKind) -> std::io::Result<Vec<BackupFile>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_backup_name(&name, kind) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }
        let taken_at = timestamp_from_name(&name, kind).unwrap_or_else(|| {
            DateTime::<Utc>::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
        });
        files.push(BackupFile {
            name,
            path: entry.path(),
            taken_at,
            size: metadata.len(),
        });
    }
    sort_newest_first(&mut files);
    Ok(files)
}

fn sort_newest_first(files: &mut [BackupFile]) {
    files.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.name.cmp(&a.name)));
}

/// Everything beyond the newest `max`, oldest first.
pub fn select_for_deletion(mut files: Vec<BackupFile>, max: usize) -> Vec<BackupFile> {
    files.retain(|f| f.name != SCHEMA_FILE);
    sort_newest_first(&mut files);
    let mut doomed: Vec<BackupFile> = files.into_iter().skip(max).collect();
    doomed.reverse();
    doomed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn file(name: &str, taken_at: DateTime<Utc>) -> BackupFile {
        BackupFile {
            name: name.to_string(),
            path: PathBuf::from(name),
            taken_at,
            size: 0,
        }
    }

    #[test]
    fn test_file_name_round_trips_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap() + Duration::milliseconds(123);
        let name = backup_file_name(now, BackupKind::Sql);
        assert_eq!(name, "backup-2024-05-01T10-15-00-123Z.sql");
        assert_eq!(timestamp_from_name(&name, BackupKind::Sql), Some(now));
    }

    #[test]
    fn test_timestamp_without_millis_and_garbage() {
        assert_eq!(
            timestamp_from_name("backup-2024-05-01T10-15-00Z.json", BackupKind::Json),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 15, 0).unwrap())
        );
        assert_eq!(timestamp_from_name("backup-latest.sql", BackupKind::Sql), None);
        assert_eq!(
            timestamp_from_name("backup-2024-05-01T10-15-00Z.sql", BackupKind::Json),
            None
        );
    }

    #[test]
    fn test_retention_keeps_newest_and_deletes_oldest_first() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let files: Vec<BackupFile> = (0..5)
            .map(|i| {
                let ts = base + Duration::minutes(i);
                file(&backup_file_name(ts, BackupKind::Sql), ts)
            })
            .collect();

        let doomed = select_for_deletion(files.clone(), 2);
        assert_eq!(doomed.len(), 3);
        assert_eq!(doomed[0].name, files[0].name);
        assert_eq!(doomed[1].name, files[1].name);
        assert_eq!(doomed[2].name, files[2].name);
    }

    #[test]
    fn test_retention_under_limit_deletes_nothing() {
        let now = Utc::now();
        let files = vec![file("backup-a.sql", now)];
        assert!(select_for_deletion(files, 10).is_empty());
    }

    #[test]
    fn test_retention_never_touches_schema() {
        let now = Utc::now();
        let files = vec![
            file(SCHEMA_FILE, now - Duration::days(30)),
            file("backup-x.sql", now),
        ];
        assert!(select_for_deletion(files, 0)
            .iter()
            .all(|f| f.name != SCHEMA_FILE));
    }

    #[tokio::test]
    async fn test_list_backups_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        for i in [2, 0, 1] {
            let name = backup_file_name(base + Duration::hours(i), BackupKind::Sql);
            std::fs::write(dir.path().join(name), b"--").unwrap();
        }
        std::fs::write(dir.path().join(SCHEMA_FILE), b"--").unwrap();
        std::fs::write(dir.path().join("backup-2024-03-01T08-00-00Z.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("backup-2024-03-01T09-30-00Z.sql.tmp"), b"--").unwrap();

        let files = list_backups(dir.path(), BackupKind::Sql).await.unwrap();
        assert_eq!(files.len(), 3);
        assert!(files[0].taken_at > files[1].taken_at);
        assert!(files[1].taken_at > files[2].taken_at);
        assert_eq!(list_backups(dir.path(), BackupKind::Json).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_backups_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_backups(&missing, BackupKind::Sql).await.unwrap().is_empty());
    }
}
