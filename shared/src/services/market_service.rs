use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DatabaseConnection;
use sea_orm::ActiveValue::Set;
use serde::Serialize;
use std::sync::Arc;

use crate::entity::market_data;
use crate::error::{AppError, Result};
use crate::models::MarketSnapshotRequest;
use crate::repositories::MarketDataRepository;
use crate::signal_generator::{placeholder_snapshot, price_precision, to_decimal, MarketSnapshot};

/// Pairs listed by `GET /api/market-data`.
pub const AVAILABLE_PAIRS: [&str; 10] = [
    "EUR/USD", "GBP/USD", "USD/JPY", "USD/CAD", "AUD/USD", "BTC/USD", "ETH/USD", "XRP/USD",
    "BNB/USD", "SOL/USD",
];

/// Current market row for an asset. `stored` is false for generated placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketQuote {
    pub asset: String,
    pub price: Decimal,
    pub change24h: Option<Decimal>,
    pub high24h: Option<Decimal>,
    pub low24h: Option<Decimal>,
    pub volume24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub data_source: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub stored: bool,
}

impl MarketQuote {
    fn stored(model: market_data::Model) -> Self {
        Self {
            asset: model.asset,
            price: model.price,
            change24h: model.change24h,
            high24h: model.high24h,
            low24h: model.low24h,
            volume24h: model.volume24h,
            market_cap: model.market_cap,
            data_source: model.data_source,
            timestamp: model.timestamp,
            stored: true,
        }
    }

    fn placeholder(snapshot: &MarketSnapshot, now: DateTime<Utc>) -> Self {
        let dp = price_precision(snapshot.price);
        Self {
            asset: snapshot.asset.clone(),
            price: to_decimal(snapshot.price, dp),
            change24h: Some(to_decimal(snapshot.change24h, 2)),
            high24h: Some(to_decimal(snapshot.high24h, dp)),
            low24h: Some(to_decimal(snapshot.low24h, dp)),
            volume24h: Some(to_decimal(snapshot.volume24h, 0)),
            market_cap: Some(to_decimal(snapshot.market_cap, 0)),
            data_source: Some(snapshot.data_source.clone()),
            timestamp: now,
            stored: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PairSummary {
    pub pair: String,
    pub price: Decimal,
    pub change24h: Option<Decimal>,
}

pub struct MarketService {
    repo: MarketDataRepository,
}

impl MarketService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            repo: MarketDataRepository::new(db),
        }
    }

    /// Latest stored snapshot for the generator, or a synthetic one.
    pub async fn snapshot(&self, asset: &str) -> Result<MarketSnapshot> {
        match self.repo.latest(asset).await? {
            Some(model) => Ok(MarketSnapshot::from_model(&model)),
            None => {
                let mut rng = rand::thread_rng();
                Ok(placeholder_snapshot(asset, &mut rng))
            }
        }
    }

    pub async fn quote(&self, asset: &str) -> Result<MarketQuote> {
        if asset.trim().is_empty() {
            return Err(AppError::InvalidInput("asset is required".to_string()));
        }
        if let Some(model) = self.repo.latest(asset).await? {
            return Ok(MarketQuote::stored(model));
        }
        let snapshot = {
            let mut rng = rand::thread_rng();
            placeholder_snapshot(asset, &mut rng)
        };
        Ok(MarketQuote::placeholder(&snapshot, Utc::now()))
    }

    pub async fn list_pairs(&self) -> Result<Vec<PairSummary>> {
        let mut pairs = Vec::with_capacity(AVAILABLE_PAIRS.len());
        for pair in AVAILABLE_PAIRS {
            let quote = self.quote(pair).await?;
            pairs.push(PairSummary {
                pair: pair.to_string(),
                price: quote.price,
                change24h: quote.change24h,
            });
        }
        Ok(pairs)
    }

    pub async fn save(&self, request: MarketSnapshotRequest) -> Result<market_data::Model> {
        if request.asset.trim().is_empty() || request.price <= Decimal::ZERO {
            return Err(AppError::InvalidInput("asset and a positive price are required".to_string()));
        }
        let active = market_data::ActiveModel {
            asset: Set(request.asset),
            price: Set(request.price),
            change24h: Set(request.change24h),
            high24h: Set(request.high24h),
            low24h: Set(request.low24h),
            volume24h: Set(request.volume24h),
            market_cap: Set(request.market_cap),
            data_source: Set(request.data_source),
            timestamp: Set(Utc::now()),
            ..Default::default()
        };
        self.repo.save(active).await
    }
}
