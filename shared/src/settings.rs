//! User preference objects and the merge rules used by every settings write.
//!
//! A field from the client replaces the stored value only when it is valid for
//! its type: a non-empty string, a boolean, or a positive integer for the
//! refresh interval. Anything else (missing, `null`, wrong type, blank) keeps
//! the stored value, so a partial update never blanks out other fields.
//! Keys are accepted in both `snake_case` and `camelCase`.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{user_notification_settings, user_settings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSettings {
    pub theme: String,
    pub default_asset: String,
    pub default_timeframe: String,
    pub default_platform: String,
    pub chart_type: String,
    pub show_trading_tips: bool,
    pub auto_refresh_data: bool,
    pub refresh_interval: i32,
    pub use_ai_for_signals: bool,
    pub enable_otc_trading: bool,
    pub allow_scheduled_signals: bool,
    pub respect_timeframes: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            default_asset: "BTC/USDT".to_string(),
            default_timeframe: "1h".to_string(),
            default_platform: String::new(),
            chart_type: "candlestick".to_string(),
            show_trading_tips: true,
            auto_refresh_data: true,
            refresh_interval: 60,
            use_ai_for_signals: true,
            enable_otc_trading: false,
            allow_scheduled_signals: false,
            respect_timeframes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub signal_alerts: bool,
    pub market_updates: bool,
    pub account_alerts: bool,
    pub promotional_emails: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            signal_alerts: true,
            market_updates: true,
            account_alerts: true,
            promotional_emails: false,
        }
    }
}

/// Settings as returned to clients. The API key never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettingsView {
    pub id: i32,
    pub user_id: i32,
    #[serde(flatten)]
    pub general: GeneralSettings,
    pub use_custom_ai_key: bool,
    pub has_custom_api_key: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the API-key endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeySettings {
    #[serde(default, alias = "openaiApiKey")]
    pub openai_api_key: Option<String>,
    #[serde(default, alias = "useCustomAiKey")]
    pub use_custom_ai_key: bool,
    #[serde(default = "default_true", alias = "useAiForSignals")]
    pub use_ai_for_signals: bool,
}

fn default_true() -> bool {
    true
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn field<'a>(incoming: &'a Value, key: &str) -> Option<&'a Value> {
    incoming.get(key).or_else(|| incoming.get(camel_case(key)))
}

fn pick_string(incoming: &Value, key: &str, current: &str) -> String {
    match field(incoming, key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => current.to_string(),
    }
}

fn pick_bool(incoming: &Value, key: &str, current: bool) -> bool {
    field(incoming, key).and_then(Value::as_bool).unwrap_or(current)
}

fn pick_positive_int(incoming: &Value, key: &str, current: i32) -> i32 {
    let candidate = field(incoming, key).and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| f as i64))
    });
    match candidate {
        Some(n) if n > 0 && n <= i32::MAX as i64 => n as i32,
        _ => current,
    }
}

impl GeneralSettings {
    pub fn from_model(model: &user_settings::Model) -> Self {
        Self {
            theme: model.theme.clone(),
            default_asset: model.default_asset.clone(),
            default_timeframe: model.default_timeframe.clone(),
            default_platform: model.default_platform.clone(),
            chart_type: model.chart_type.clone(),
            show_trading_tips: model.show_trading_tips,
            auto_refresh_data: model.auto_refresh_data,
            refresh_interval: model.refresh_interval,
            use_ai_for_signals: model.use_ai_for_signals,
            enable_otc_trading: model.enable_otc_trading,
            allow_scheduled_signals: model.allow_scheduled_signals,
            respect_timeframes: model.respect_timeframes,
        }
    }

    /// Merge a client object over `self`. `default_platform` may legitimately
    /// be empty, so it is the one string allowed to stay blank.
    pub fn merged_with(&self, incoming: &Value) -> Self {
        Self {
            theme: pick_string(incoming, "theme", &self.theme),
            default_asset: pick_string(incoming, "default_asset", &self.default_asset),
            default_timeframe: pick_string(incoming, "default_timeframe", &self.default_timeframe),
            default_platform: pick_string(incoming, "default_platform", &self.default_platform),
            chart_type: pick_string(incoming, "chart_type", &self.chart_type),
            show_trading_tips: pick_bool(incoming, "show_trading_tips", self.show_trading_tips),
            auto_refresh_data: pick_bool(incoming, "auto_refresh_data", self.auto_refresh_data),
            refresh_interval: pick_positive_int(incoming, "refresh_interval", self.refresh_interval),
            use_ai_for_signals: pick_bool(incoming, "use_ai_for_signals", self.use_ai_for_signals),
            enable_otc_trading: pick_bool(incoming, "enable_otc_trading", self.enable_otc_trading),
            allow_scheduled_signals: pick_bool(
                incoming,
                "allow_scheduled_signals",
                self.allow_scheduled_signals,
            ),
            respect_timeframes: pick_bool(incoming, "respect_timeframes", self.respect_timeframes),
        }
    }

    /// Write every general field onto an active model. API-key columns are untouched.
    pub fn apply(&self, active: &mut user_settings::ActiveModel) {
        active.theme = Set(self.theme.clone());
        active.default_asset = Set(self.default_asset.clone());
        active.default_timeframe = Set(self.default_timeframe.clone());
        active.default_platform = Set(self.default_platform.clone());
        active.chart_type = Set(self.chart_type.clone());
        active.show_trading_tips = Set(self.show_trading_tips);
        active.auto_refresh_data = Set(self.auto_refresh_data);
        active.refresh_interval = Set(self.refresh_interval);
        active.use_ai_for_signals = Set(self.use_ai_for_signals);
        active.enable_otc_trading = Set(self.enable_otc_trading);
        active.allow_scheduled_signals = Set(self.allow_scheduled_signals);
        active.respect_timeframes = Set(self.respect_timeframes);
    }

    pub fn new_active_model(&self, user_id: i32) -> user_settings::ActiveModel {
        let now = Utc::now();
        let mut active = user_settings::ActiveModel {
            user_id: Set(user_id),
            use_custom_ai_key: Set(false),
            openai_api_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        self.apply(&mut active);
        active
    }
}

impl NotificationPreferences {
    pub fn from_model(model: &user_notification_settings::Model) -> Self {
        Self {
            email_notifications: model.email_notifications,
            push_notifications: model.push_notifications,
            signal_alerts: model.signal_alerts,
            market_updates: model.market_updates,
            account_alerts: model.account_alerts,
            promotional_emails: model.promotional_emails,
        }
    }

    pub fn merged_with(&self, incoming: &Value) -> Self {
        Self {
            email_notifications: pick_bool(incoming, "email_notifications", self.email_notifications),
            push_notifications: pick_bool(incoming, "push_notifications", self.push_notifications),
            signal_alerts: pick_bool(incoming, "signal_alerts", self.signal_alerts),
            market_updates: pick_bool(incoming, "market_updates", self.market_updates),
            account_alerts: pick_bool(incoming, "account_alerts", self.account_alerts),
            promotional_emails: pick_bool(incoming, "promotional_emails", self.promotional_emails),
        }
    }

    pub fn apply(&self, active: &mut user_notification_settings::ActiveModel) {
        active.email_notifications = Set(self.email_notifications);
        active.push_notifications = Set(self.push_notifications);
        active.signal_alerts = Set(self.signal_alerts);
        active.market_updates = Set(self.market_updates);
        active.account_alerts = Set(self.account_alerts);
        active.promotional_emails = Set(self.promotional_emails);
    }

    pub fn new_active_model(&self, user_id: i32) -> user_notification_settings::ActiveModel {
        let now = Utc::now();
        let mut active = user_notification_settings::ActiveModel {
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        self.apply(&mut active);
        active
    }
}

impl UserSettingsView {
    pub fn from_model(model: &user_settings::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            general: GeneralSettings::from_model(model),
            use_custom_ai_key: model.use_custom_ai_key,
            has_custom_api_key: model
                .openai_api_key
                .as_deref()
                .map(|k| !k.is_empty())
                .unwrap_or(false),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored() -> GeneralSettings {
        GeneralSettings {
            theme: "light".to_string(),
            default_asset: "ETH/USDT".to_string(),
            default_timeframe: "4h".to_string(),
            default_platform: "Binance".to_string(),
            refresh_interval: 30,
            enable_otc_trading: true,
            ..GeneralSettings::default()
        }
    }

    #[test]
    fn test_partial_patch_keeps_unspecified_fields() {
        let merged = stored().merged_with(&json!({ "theme": "dark" }));
        assert_eq!(merged.theme, "dark");
        assert_eq!(merged.default_asset, "ETH/USDT");
        assert_eq!(merged.default_timeframe, "4h");
        assert_eq!(merged.default_platform, "Binance");
        assert_eq!(merged.refresh_interval, 30);
        assert!(merged.enable_otc_trading);
    }

    #[test]
    fn test_invalid_values_never_null_out_fields() {
        let merged = stored().merged_with(&json!({
            "theme": "",
            "default_asset": null,
            "chart_type": 5,
            "show_trading_tips": "yes",
            "refresh_interval": -10,
        }));
        assert_eq!(merged, stored());
    }

    #[test]
    fn test_camel_case_keys_are_accepted() {
        let merged = stored().merged_with(&json!({
            "defaultAsset": "SOL/USDT",
            "refreshInterval": 120,
            "enableOtcTrading": false,
        }));
        assert_eq!(merged.default_asset, "SOL/USDT");
        assert_eq!(merged.refresh_interval, 120);
        assert!(!merged.enable_otc_trading);
    }

    #[test]
    fn test_refresh_interval_rejects_fractions() {
        let merged = stored().merged_with(&json!({ "refresh_interval": 12.5 }));
        assert_eq!(merged.refresh_interval, 30);
        let merged = stored().merged_with(&json!({ "refresh_interval": 90.0 }));
        assert_eq!(merged.refresh_interval, 90);
    }

    #[test]
    fn test_non_object_payload_is_a_no_op() {
        assert_eq!(stored().merged_with(&json!("garbage")), stored());
        assert_eq!(stored().merged_with(&Value::Null), stored());
    }

    #[test]
    fn test_notification_merge_only_touches_booleans_sent() {
        let current = NotificationPreferences::default();
        let merged = current.merged_with(&json!({ "promotionalEmails": true, "signal_alerts": "off" }));
        assert!(merged.promotional_emails);
        assert!(merged.signal_alerts);
        assert!(merged.email_notifications);
    }

    #[test]
    fn test_view_hides_api_key() {
        let now = Utc::now();
        let model = user_settings::Model {
            id: 1,
            user_id: 7,
            theme: "dark".to_string(),
            default_asset: "BTC/USDT".to_string(),
            default_timeframe: "1h".to_string(),
            default_platform: String::new(),
            chart_type: "candlestick".to_string(),
            show_trading_tips: true,
            auto_refresh_data: true,
            refresh_interval: 60,
            use_ai_for_signals: true,
            use_custom_ai_key: true,
            openai_api_key: Some("sealed".to_string()),
            enable_otc_trading: false,
            allow_scheduled_signals: false,
            respect_timeframes: true,
            created_at: now,
            updated_at: now,
        };
        let view = UserSettingsView::from_model(&model);
        assert!(view.has_custom_api_key);
        let body = serde_json::to_value(&view).unwrap();
        assert!(body.get("openai_api_key").is_none());
        assert_eq!(body["theme"], "dark");
    }

    #[test]
    fn test_camel_case_helper() {
        assert_eq!(camel_case("use_ai_for_signals"), "useAiForSignals");
        assert_eq!(camel_case("theme"), "theme");
    }
}
