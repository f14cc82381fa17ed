//! Thin wrappers around the Postgres client tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::PgConnectionInfo;
use crate::error::{AppError, Result};

pub struct PgTools {
    pg: PgConnectionInfo,
    timeout: Duration,
    bin_dir: Option<PathBuf>,
}

impl PgTools {
    pub fn new(pg: PgConnectionInfo, timeout: Duration, bin_dir: Option<PathBuf>) -> Self {
        Self { pg, timeout, bin_dir }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn program(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    fn connection_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.pg.host.clone(),
            "-p".to_string(),
            self.pg.port.clone(),
            "-U".to_string(),
            self.pg.user.clone(),
        ]
    }

    /// Run a tool to completion with `PGPASSWORD` set, killing it on timeout.
    async fn run(&self, program: &str, args: Vec<String>) -> Result<()> {
        tracing::debug!(program, ?args, "Running Postgres tool");
        let child = Command::new(self.program(program))
            .args(&args)
            .env("PGPASSWORD", &self.pg.password)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Command(format!("failed to start {}: {}", program, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                AppError::Command(format!("{} timed out after {:?}", program, self.timeout))
            })??;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AppError::Command(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )))
        }
    }

    pub async fn dump_all(&self, file: &Path) -> Result<()> {
        let mut args = vec!["--clean".to_string(), "--if-exists".to_string()];
        args.extend(self.connection_args());
        args.push("-f".to_string());
        args.push(file.display().to_string());
        self.run("pg_dumpall", args).await
    }

    pub async fn dump_database(&self, file: &Path) -> Result<()> {
        let mut args = self.connection_args();
        args.extend([
            "-d".to_string(),
            self.pg.database.clone(),
            "-F".to_string(),
            "p".to_string(),
            "-f".to_string(),
            file.display().to_string(),
        ]);
        self.run("pg_dump", args).await
    }

    pub async fn dump_schema(&self, file: &Path) -> Result<()> {
        let mut args = self.connection_args();
        args.extend([
            "-d".to_string(),
            self.pg.database.clone(),
            "--schema-only".to_string(),
            "-F".to_string(),
            "p".to_string(),
            "-f".to_string(),
            file.display().to_string(),
        ]);
        self.run("pg_dump", args).await
    }

    pub async fn restore(&self, file: &Path) -> Result<()> {
        let mut args = self.connection_args();
        args.extend([
            "-d".to_string(),
            self.pg.database.clone(),
            "-f".to_string(),
            file.display().to_string(),
        ]);
        self.run("psql", args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(timeout: Duration) -> PgTools {
        PgTools::new(
            PgConnectionInfo {
                host: "localhost".to_string(),
                port: "5432".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                database: "signalhub".to_string(),
            },
            timeout,
            None,
        )
    }

    #[tokio::test]
    async fn test_missing_program_is_a_command_error() {
        let err = tools(Duration::from_secs(5))
            .run("definitely-not-a-real-pg-tool", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Command(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let err = tools(Duration::from_millis(100))
            .run("sleep", vec!["5".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_bin_dir_prefixes_program() {
        let mut pg = tools(Duration::from_secs(1));
        assert_eq!(pg.program("psql"), PathBuf::from("psql"));
        pg.bin_dir = Some(PathBuf::from("/usr/lib/postgresql/16/bin"));
        assert_eq!(pg.program("psql"), PathBuf::from("/usr/lib/postgresql/16/bin/psql"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let err = tools(Duration::from_secs(5))
            .run("false", vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("false exited"));
    }
}
