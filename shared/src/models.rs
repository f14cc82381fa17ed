use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::sea_orm_active_enums::{
    Direction, Language, SignalResult, SignalStatus, SignalType, SubscriptionTier,
};
use crate::entity::{signals, subscriptions, user_signals, users};
use crate::settings::{NotificationPreferences, UserSettingsView};

/// A user as exposed over the API. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub subscription_level: SubscriptionTier,
    pub subscription_expiry: Option<DateTime<Utc>>,
    pub language: Language,
    pub direction: Direction,
    pub telegram_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<users::Model> for PublicUser {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            subscription_level: user.subscription_level,
            subscription_expiry: user.subscription_expiry,
            direction: user.language.direction(),
            language: user.language,
            telegram_id: user.telegram_id,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, alias = "fullName")]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageChange {
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageResponse {
    pub language: Language,
    pub direction: Direction,
}

/// Reply of the settings write routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSaved {
    pub settings: UserSettingsView,
    pub server_time: DateTime<Utc>,
}

/// `GET /api/settings`
#[derive(Debug, Clone, Serialize)]
pub struct AllSettings {
    pub general: UserSettingsView,
    pub notifications: NotificationPreferences,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSignal {
    pub asset: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub entry_price: Decimal,
    pub target_price: Decimal,
    pub stop_loss: Decimal,
    pub accuracy: i32,
    pub time: String,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: SignalStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultUpdate {
    pub result: SignalResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoriteUpdate {
    #[serde(default = "default_true", alias = "isFavorite")]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotesUpdate {
    pub notes: String,
}

fn default_true() -> bool {
    true
}

/// A signal together with the caller's interaction state.
#[derive(Debug, Clone, Serialize)]
pub struct UserSignalView {
    #[serde(flatten)]
    pub signal: signals::Model,
    pub is_favorite: bool,
    pub is_taken: bool,
    pub notes: Option<String>,
    pub user_result: Option<SignalResult>,
    pub saved_at: DateTime<Utc>,
}

impl UserSignalView {
    pub fn new(link: user_signals::Model, signal: signals::Model) -> Self {
        Self {
            signal,
            is_favorite: link.is_favorite,
            is_taken: link.is_taken,
            notes: link.notes,
            user_result: link.result,
            saved_at: link.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MiniAppPaymentRequest {
    #[serde(alias = "planType", alias = "plan_type")]
    pub plan: String,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub amount: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MiniAppPaymentResponse {
    pub success: bool,
    pub redirect_url: String,
    pub payment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessPaymentRequest {
    #[serde(alias = "userId")]
    pub user_id: i32,
    #[serde(alias = "planType")]
    pub plan_type: String,
    #[serde(alias = "paymentId")]
    pub payment_id: String,
    #[serde(alias = "starsAmount")]
    pub stars_amount: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "userId")]
    pub user_id: i32,
    #[serde(alias = "transactionId")]
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatus {
    pub verified: bool,
    pub subscription: Option<subscriptions::Model>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitDataRequest {
    #[serde(alias = "initData")]
    pub init_data: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendRequest {
    pub pair: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketSnapshotRequest {
    pub asset: String,
    pub price: Decimal,
    #[serde(default)]
    pub change24h: Option<Decimal>,
    #[serde(default)]
    pub high24h: Option<Decimal>,
    #[serde(default)]
    pub low24h: Option<Decimal>,
    #[serde(default)]
    pub volume24h: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub data_source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_public_user_hides_password_and_derives_direction() {
        let user = users::Model {
            id: 1,
            username: "sara".to_string(),
            password: "$argon2id$secret".to_string(),
            email: None,
            full_name: None,
            subscription_level: SubscriptionTier::Free,
            subscription_expiry: None,
            language: Language::Ar,
            telegram_id: None,
            created_at: Utc::now(),
            last_login: None,
        };
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["direction"], "rtl");
        assert_eq!(json["language"], "ar");
    }

    #[test]
    fn test_mini_app_request_accepts_camel_case() {
        let req: MiniAppPaymentRequest =
            serde_json::from_str(r#"{"planType":"weekly","userId":"7","amount":750}"#).unwrap();
        assert_eq!(req.plan, "weekly");
        assert_eq!(req.user_id.as_deref(), Some("7"));
    }
}
