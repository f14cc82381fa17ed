use chrono::Utc;
use sea_orm::prelude::DatabaseConnection;
use sea_orm::ActiveValue::Set;
use std::sync::Arc;

use crate::entity::sea_orm_active_enums::{
    Language, NotificationType, SignalResult, SignalStatus, SignalType,
};
use crate::entity::signals;
use crate::error::{AppError, Result};
use crate::i18n;
use crate::models::{NewSignal, UserSignalView};
use crate::openai::OpenAiService;
use crate::repositories::{
    SignalRepository, SubscriptionRepository, UsageKind, UsageRepository, UserSignalRepository,
};
use crate::services::{MarketService, NotificationService, FREE_DAILY_SIGNAL_LIMIT};
use crate::signal_filter::SignalFilter;
use crate::signal_generator::{self, GenerateRequest, GeneratedSignal, TrendAnalysis};

pub struct SignalService {
    signals: SignalRepository,
    user_signals: UserSignalRepository,
    usage: UsageRepository,
    subscriptions: SubscriptionRepository,
    notifications: NotificationService,
    market: MarketService,
}

impl SignalService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            signals: SignalRepository::new(db.clone()),
            user_signals: UserSignalRepository::new(db.clone()),
            usage: UsageRepository::new(db.clone()),
            subscriptions: SubscriptionRepository::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            market: MarketService::new(db),
        }
    }

    pub async fn active_signals(&self, filter: &SignalFilter) -> Result<Vec<signals::Model>> {
        self.signals.list(Some(SignalStatus::Active), filter).await
    }

    pub async fn history(&self, filter: &SignalFilter) -> Result<Vec<signals::Model>> {
        self.signals.list(None, filter).await
    }

    pub async fn get_signal(&self, id: i32) -> Result<signals::Model> {
        self.signals
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Signal {} not found", id)))
    }

    /// Fetch a signal on behalf of a user and count the view.
    pub async fn view_signal(&self, id: i32, user_id: Option<i32>) -> Result<signals::Model> {
        let signal = self.get_signal(id).await?;
        if let Some(user_id) = user_id {
            self.usage
                .track(user_id, UsageKind::Viewed, Utc::now().date_naive())
                .await?;
        }
        Ok(signal)
    }

    pub async fn create_signal(&self, new: NewSignal) -> Result<signals::Model> {
        if new.asset.trim().is_empty() {
            return Err(AppError::InvalidInput("asset is required".to_string()));
        }
        let active = signals::ActiveModel {
            asset: Set(new.asset),
            signal_type: Set(new.signal_type),
            entry_price: Set(new.entry_price),
            target_price: Set(new.target_price),
            stop_loss: Set(new.stop_loss),
            accuracy: Set(new.accuracy),
            time: Set(new.time),
            status: Set(SignalStatus::Active),
            indicators: Set(serde_json::json!(new.indicators)),
            platform: Set(new.platform),
            timeframe: Set(new.timeframe),
            analysis: Set(new.analysis),
            created_at: Set(Utc::now()),
            completed_at: Set(None),
            result: Set(None),
            ..Default::default()
        };
        self.signals.create(active).await
    }

    pub async fn update_status(&self, id: i32, status: SignalStatus) -> Result<signals::Model> {
        self.signals.update_status(id, status).await
    }

    pub async fn update_result(&self, id: i32, result: SignalResult) -> Result<signals::Model> {
        self.signals.update_result(id, result).await
    }

    pub async fn user_signals(&self, user_id: i32, favorites_only: bool) -> Result<Vec<UserSignalView>> {
        let rows = self.user_signals.list_for_user(user_id, favorites_only).await?;
        Ok(rows
            .into_iter()
            .map(|(link, signal)| UserSignalView::new(link, signal))
            .collect())
    }

    pub async fn set_favorite(&self, user_id: i32, signal_id: i32, is_favorite: bool) -> Result<UserSignalView> {
        let signal = self.get_signal(signal_id).await?;
        let link = self.user_signals.set_favorite(user_id, signal_id, is_favorite).await?;
        Ok(UserSignalView::new(link, signal))
    }

    pub async fn set_notes(&self, user_id: i32, signal_id: i32, notes: String) -> Result<UserSignalView> {
        let signal = self.get_signal(signal_id).await?;
        let link = self.user_signals.set_notes(user_id, signal_id, notes).await?;
        Ok(UserSignalView::new(link, signal))
    }

    async fn daily_limit(&self, user_id: i32) -> Result<i32> {
        Ok(self
            .subscriptions
            .find_active(user_id)
            .await?
            .map(|s| s.daily_signal_limit)
            .unwrap_or(FREE_DAILY_SIGNAL_LIMIT))
    }

    /// Generate, persist and (for a signed-in user) record a new signal.
    ///
    /// With an OpenAI key the model is asked first; any failure there falls
    /// back to the algorithmic generator.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        user_id: Option<i32>,
        language: Language,
        openai_key: Option<String>,
    ) -> Result<signals::Model> {
        request.validate()?;
        let today = Utc::now().date_naive();

        if let Some(user_id) = user_id {
            let limit = self.daily_limit(user_id).await?;
            let used = self.usage.generated_on(user_id, today).await?;
            if used >= limit {
                tracing::info!(user_id, used, limit, "Daily signal limit reached");
                return Err(AppError::LimitExceeded("daily_signal_limit".to_string()));
            }
        }

        let snapshot = self.market.snapshot(&request.pair).await?;
        let now = Utc::now();

        let mut generated: Option<GeneratedSignal> = None;
        if let Some(key) = openai_key {
            let attempt = match OpenAiService::new(key) {
                Ok(client) => client.generate_signal(&request, &snapshot, language, now).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(signal) => generated = Some(signal),
                Err(e) => tracing::warn!("AI signal generation failed, using algorithmic model: {}", e),
            }
        }
        let generated = match generated {
            Some(signal) => signal,
            None => {
                let mut rng = rand::thread_rng();
                signal_generator::generate(&request, &snapshot, language, now, &mut rng)
            }
        };

        let saved = self
            .signals
            .create(signals::ActiveModel {
                asset: Set(generated.asset),
                signal_type: Set(generated.signal_type),
                entry_price: Set(generated.entry_price),
                target_price: Set(generated.target_price),
                stop_loss: Set(generated.stop_loss),
                accuracy: Set(generated.accuracy),
                time: Set(generated.time),
                status: Set(SignalStatus::Active),
                indicators: Set(serde_json::json!(generated.indicators)),
                platform: Set(Some(generated.platform)),
                timeframe: Set(Some(generated.timeframe)),
                analysis: Set(Some(generated.analysis)),
                created_at: Set(now),
                completed_at: Set(None),
                result: Set(None),
                ..Default::default()
            })
            .await?;
        tracing::info!(
            signal_id = saved.id,
            asset = %saved.asset,
            direction = saved.signal_type.as_str(),
            "Generated signal"
        );

        if let Some(user_id) = user_id {
            self.usage.track(user_id, UsageKind::Generated, today).await?;
            self.user_signals.add(user_id, saved.id).await?;

            let locale = language.code();
            let direction_key = match saved.signal_type {
                SignalType::Buy => "direction_buy",
                SignalType::Sell => "direction_sell",
            };
            let direction = i18n::translate_plain(locale, direction_key, None);
            let message = i18n::translate_plain(
                locale,
                "notification_signal_message",
                Some(&[
                    ("direction", &direction),
                    ("pair", &request.pair),
                    ("timeframe", &request.timeframe),
                ]),
            );
            self.notifications
                .notify(
                    user_id,
                    NotificationType::Signal,
                    i18n::translate_plain(locale, "notification_signal_title", None),
                    message,
                    Some(saved.id),
                )
                .await?;
        }

        Ok(saved)
    }

    pub async fn analyze_trend(
        &self,
        pair: &str,
        user_id: Option<i32>,
        language: Language,
        openai_key: Option<String>,
    ) -> Result<TrendAnalysis> {
        if pair.trim().is_empty() {
            return Err(AppError::InvalidInput("pair is required".to_string()));
        }
        let snapshot = self.market.snapshot(pair).await?;

        let mut analysis = None;
        if let Some(key) = openai_key {
            let attempt = match OpenAiService::new(key) {
                Ok(client) => client.analyze_trend(&snapshot, language).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(trend) => analysis = Some(trend),
                Err(e) => tracing::warn!("AI trend analysis failed, using algorithmic model: {}", e),
            }
        }
        let analysis = analysis.unwrap_or_else(|| signal_generator::analyze_trend(&snapshot, language));

        if let Some(user_id) = user_id {
            self.usage
                .track(user_id, UsageKind::Analyzed, Utc::now().date_naive())
                .await?;
        }
        Ok(analysis)
    }
}
