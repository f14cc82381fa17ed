//! Client-side settings store.
//!
//! Keeps the last complete settings object the server acknowledged, mirrors it
//! into a JSON cache file for an instant first paint, and always sends the
//! whole object on update so a partial form never blanks other fields.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::SettingsSaved;
use crate::settings::{GeneralSettings, UserSettingsView};

const SETTINGS_PATH: &str = "/api/user/settings";
const MAX_EVENTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEventKind {
    CacheLoaded,
    CacheMissing,
    Refreshed,
    Updated,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub at: DateTime<Utc>,
    pub kind: SyncEventKind,
    pub detail: String,
}

pub struct SettingsStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    cache_path: PathBuf,
    current: Option<UserSettingsView>,
    events: VecDeque<SyncEvent>,
}

impl SettingsStore {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_timeout(base_url, token, cache_path, Duration::from_secs(15))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: impl Into<String>,
        cache_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            cache_path: cache_path.into(),
            current: None,
            events: VecDeque::with_capacity(MAX_EVENTS),
        })
    }

    pub fn current(&self) -> Option<&UserSettingsView> {
        self.current.as_ref()
    }

    /// Most recent event last.
    pub fn events(&self) -> impl Iterator<Item = &SyncEvent> {
        self.events.iter()
    }

    fn record(&mut self, kind: SyncEventKind, detail: impl Into<String>) {
        if self.events.len() == MAX_EVENTS {
            self.events.pop_front();
        }
        let detail = detail.into();
        tracing::debug!(?kind, "{}", detail);
        self.events.push_back(SyncEvent {
            at: Utc::now(),
            kind,
            detail,
        });
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, SETTINGS_PATH)
    }

    /// Read the cache file into memory. A missing or unreadable cache is not an error.
    pub async fn load_cached(&mut self) -> Option<&UserSettingsView> {
        let parsed = match tokio::fs::read(&self.cache_path).await {
            Ok(bytes) => serde_json::from_slice::<UserSettingsView>(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match parsed {
            Ok(view) => {
                self.record(SyncEventKind::CacheLoaded, format!("user {}", view.user_id));
                self.current = Some(view);
            }
            Err(e) => self.record(SyncEventKind::CacheMissing, e),
        }
        self.current.as_ref()
    }

    async fn store(&mut self, view: UserSettingsView) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.cache_path, serde_json::to_vec_pretty(&view)?).await?;
        self.current = Some(view);
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upstream(format!("settings request failed ({}): {}", status, body)))
    }

    /// Fetch from the server, replacing memory and cache on success.
    pub async fn refresh(&mut self) -> Result<&UserSettingsView> {
        let result = async {
            let response = self
                .client
                .get(self.url())
                .bearer_auth(&self.token)
                .send()
                .await?;
            Ok::<_, AppError>(Self::check(response).await?.json::<UserSettingsView>().await?)
        }
        .await;

        match result {
            Ok(view) => {
                self.record(SyncEventKind::Refreshed, format!("user {}", view.user_id));
                self.store(view).await?;
            }
            Err(e) => {
                self.record(SyncEventKind::Failed, format!("refresh: {}", e));
                return Err(e);
            }
        }
        self.current
            .as_ref()
            .ok_or_else(|| AppError::Internal("settings missing after refresh".to_string()))
    }

    /// Merge `patch` into the last known complete settings and send the full object.
    /// Last write wins; the caller decides how to surface a failure.
    pub async fn update(&mut self, patch: &Value) -> Result<&UserSettingsView> {
        if self.current.is_none() {
            self.refresh().await?;
        }
        let base = self
            .current
            .as_ref()
            .map(|view| view.general.clone())
            .unwrap_or_default();
        let full = merge_patch(&base, patch);

        let result = async {
            let response = self
                .client
                .patch(self.url())
                .bearer_auth(&self.token)
                .json(&full)
                .send()
                .await?;
            Ok::<_, AppError>(Self::check(response).await?.json::<SettingsSaved>().await?)
        }
        .await;

        match result {
            Ok(saved) => {
                self.record(
                    SyncEventKind::Updated,
                    format!("server time {}", saved.server_time.to_rfc3339()),
                );
                self.store(saved.settings).await?;
            }
            Err(e) => {
                self.record(SyncEventKind::Failed, format!("update: {}", e));
                return Err(e);
            }
        }
        self.current
            .as_ref()
            .ok_or_else(|| AppError::Internal("settings missing after update".to_string()))
    }
}

/// The object actually sent: every field present, patch values applied under
/// the same validity rules the server uses.
pub fn merge_patch(base: &GeneralSettings, patch: &Value) -> GeneralSettings {
    base.merged_with(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn view() -> UserSettingsView {
        UserSettingsView {
            id: 3,
            user_id: 7,
            general: GeneralSettings {
                theme: "light".to_string(),
                ..GeneralSettings::default()
            },
            use_custom_ai_key: false,
            has_custom_api_key: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn store_at(dir: &TempDir) -> SettingsStore {
        SettingsStore::with_timeout(
            "http://127.0.0.1:9/",
            "token",
            dir.path().join("cache").join("settings.json"),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_cached_without_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_at(&dir);
        assert!(store.load_cached().await.is_none());
        assert_eq!(store.events().last().unwrap().kind, SyncEventKind::CacheMissing);
    }

    #[tokio::test]
    async fn test_cache_round_trip_through_store() {
        let dir = TempDir::new().unwrap();
        let mut store = store_at(&dir);
        store.store(view()).await.unwrap();

        let mut fresh = store_at(&dir);
        let loaded = fresh.load_cached().await.unwrap();
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.general.theme, "light");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_last_known_settings() {
        let dir = TempDir::new().unwrap();
        let mut store = store_at(&dir);
        store.store(view()).await.unwrap();

        let result = store.update(&json!({ "theme": "dark" })).await;
        assert!(result.is_err());
        assert_eq!(store.current().unwrap().general.theme, "light");
        assert_eq!(store.events().last().unwrap().kind, SyncEventKind::Failed);
    }

    #[test]
    fn test_merge_patch_sends_complete_object() {
        let base = view().general;
        let full = merge_patch(&base, &json!({ "default_asset": "", "theme": "dark" }));
        assert_eq!(full.theme, "dark");
        assert_eq!(full.default_asset, base.default_asset);
        assert_eq!(full.refresh_interval, base.refresh_interval);
    }

    #[test]
    fn test_event_log_is_bounded() {
        let dir = TempDir::new().unwrap();
        let mut store = store_at(&dir);
        for i in 0..(MAX_EVENTS + 5) {
            store.record(SyncEventKind::Refreshed, format!("event {}", i));
        }
        assert_eq!(store.events().count(), MAX_EVENTS);
        assert_eq!(store.events().next().unwrap().detail, "event 5");
    }
}
