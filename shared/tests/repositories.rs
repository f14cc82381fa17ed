use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use std::sync::Arc;

use shared::entity::sea_orm_active_enums::Language;
use shared::entity::{notifications, user_signal_usage};
use shared::repositories::{NotificationRepository, UsageKind, UsageRepository};
use shared::services::SignalService;
use shared::signal_generator::GenerateRequest;
use shared::AppError;

fn usage_row(generated: i32) -> user_signal_usage::Model {
    user_signal_usage::Model {
        id: 1,
        user_id: 42,
        date: Utc::now().date_naive(),
        signals_generated: generated,
        signals_viewed: 0,
        analysis_requested: 0,
    }
}

#[tokio::test]
async fn marking_someone_elses_notification_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<notifications::Model>::new()])
        .into_connection();
    let repo = NotificationRepository::new(Arc::new(db));

    let err = repo.mark_read(7, 42).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn usage_defaults_to_zero_without_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user_signal_usage::Model>::new(), vec![usage_row(3)]])
        .into_connection();
    let repo = UsageRepository::new(Arc::new(db));
    let today = Utc::now().date_naive();

    assert_eq!(repo.generated_on(42, today).await.unwrap(), 0);
    assert_eq!(repo.generated_on(42, today).await.unwrap(), 3);
}

#[tokio::test]
async fn tracking_usage_is_a_single_upsert() {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection(),
    );
    let repo = UsageRepository::new(db.clone());
    repo.track(42, UsageKind::Generated, Utc::now().date_naive())
        .await
        .unwrap();

    drop(repo);
    let db = Arc::try_unwrap(db).expect("connection still shared");
    let log = format!("{:?}", db.into_transaction_log());
    assert_eq!(log.matches("INSERT INTO").count(), 1);
    assert!(log.contains("ON CONFLICT"));
    assert!(log.contains("signals_generated"));
}

#[tokio::test]
async fn generation_stops_at_the_free_daily_limit() {
    // No active subscription, so the free limit of 5 applies.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<shared::entity::subscriptions::Model>::new()])
        .append_query_results([vec![usage_row(5)]])
        .into_connection();
    let service = SignalService::new(Arc::new(db));

    let request = GenerateRequest {
        platform: "Binance".to_string(),
        pair: "BTC/USDT".to_string(),
        timeframe: "1h".to_string(),
    };
    let err = service
        .generate(request, Some(42), Language::En, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::LimitExceeded(ref code) if code == "daily_signal_limit"));
}
