use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;

use shared::crypto::SecretBox;
use shared::entity::user_settings;
use shared::services::SettingsService;
use shared::settings::ApiKeySettings;

fn settings_row(openai_api_key: Option<String>, use_custom_ai_key: bool) -> user_settings::Model {
    let now = Utc::now();
    user_settings::Model {
        id: 1,
        user_id: 42,
        theme: "dark".to_string(),
        default_asset: "BTC/USDT".to_string(),
        default_timeframe: "1h".to_string(),
        default_platform: "Binance".to_string(),
        chart_type: "candlestick".to_string(),
        show_trading_tips: true,
        auto_refresh_data: true,
        refresh_interval: 60,
        use_ai_for_signals: true,
        use_custom_ai_key,
        openai_api_key,
        enable_otc_trading: false,
        allow_scheduled_signals: false,
        respect_timeframes: true,
        created_at: now,
        updated_at: now,
    }
}

fn service(db: DatabaseConnection, secrets: SecretBox, default_key: Option<&str>) -> SettingsService {
    SettingsService::new(Arc::new(db), secrets, default_key.map(str::to_string))
}

fn transaction_log(db: Arc<DatabaseConnection>) -> String {
    let db = Arc::try_unwrap(db).expect("connection still shared");
    format!("{:?}", db.into_transaction_log())
}

#[tokio::test]
async fn first_read_inserts_default_row_once() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user_settings::Model>::new(), vec![settings_row(None, false)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let service = SettingsService::new(db.clone(), SecretBox::from_passphrase("test"), None);

    let view = service.get_settings(42).await.unwrap();
    assert_eq!(view.user_id, 42);
    assert!(!view.has_custom_api_key);

    drop(service);
    let log = transaction_log(db);
    assert_eq!(log.matches("INSERT INTO").count(), 1);
    assert!(log.contains("ON CONFLICT"));
}

#[tokio::test]
async fn existing_row_is_returned_without_insert() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![settings_row(Some("sealed".to_string()), true)]])
            .into_connection(),
    );
    let service = SettingsService::new(db.clone(), SecretBox::from_passphrase("test"), None);

    let view = service.get_settings(42).await.unwrap();
    assert!(view.has_custom_api_key);
    assert_eq!(view.general.theme, "dark");

    drop(service);
    assert!(!transaction_log(db).contains("INSERT INTO"));
}

#[tokio::test]
async fn custom_key_is_decrypted_for_generation() {
    let secrets = SecretBox::from_passphrase("test");
    let sealed = secrets.seal("sk-user").unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![settings_row(Some(sealed), true)]])
        .into_connection();
    let service = service(db, secrets, Some("sk-default"));

    let key = service.resolve_openai_key(Some(42)).await.unwrap();
    assert_eq!(key.as_deref(), Some("sk-user"));
}

#[tokio::test]
async fn ai_disabled_resolves_to_no_key() {
    let mut row = settings_row(None, false);
    row.use_ai_for_signals = false;
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![row]])
        .into_connection();
    let service = service(db, SecretBox::from_passphrase("test"), Some("sk-default"));

    assert_eq!(service.resolve_openai_key(Some(42)).await.unwrap(), None);
}

#[tokio::test]
async fn anonymous_callers_use_default_key() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let service = service(db, SecretBox::from_passphrase("test"), Some("sk-default"));

    let key = service.resolve_openai_key(None).await.unwrap();
    assert_eq!(key.as_deref(), Some("sk-default"));
}

#[tokio::test]
async fn turning_custom_key_off_clears_it() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![settings_row(Some("sealed".to_string()), true)],
            vec![settings_row(None, false)],
        ])
        .into_connection();
    let service = service(db, SecretBox::from_passphrase("test"), None);

    let saved = service
        .save_api_key(
            42,
            ApiKeySettings {
                openai_api_key: Some("ignored".to_string()),
                use_custom_ai_key: false,
                use_ai_for_signals: true,
            },
        )
        .await
        .unwrap();
    assert!(!saved.settings.use_custom_ai_key);
    assert!(!saved.settings.has_custom_api_key);
}
