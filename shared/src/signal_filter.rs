use sea_orm::{ColumnTrait, Condition};

use crate::entity::sea_orm_active_enums::SignalType;
use crate::entity::signals;
use crate::error::{AppError, Result};

const ALL: &str = "all";

/// Asset / direction filter for signal listings. `all` or blank means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalFilter {
    pub asset: Option<String>,
    pub signal_type: Option<SignalType>,
}

fn normalize(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
}

impl SignalFilter {
    pub fn from_query(asset: Option<&str>, signal_type: Option<&str>) -> Result<Self> {
        let signal_type = match normalize(signal_type) {
            Some(raw) => Some(SignalType::parse(raw).ok_or_else(|| {
                AppError::InvalidInput(format!("Unknown signal type: {}", raw))
            })?),
            None => None,
        };

        Ok(Self {
            asset: normalize(asset).map(str::to_string),
            signal_type,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.asset.is_none() && self.signal_type.is_none()
    }

    pub fn matches(&self, signal: &signals::Model) -> bool {
        self.asset.as_deref().map_or(true, |a| signal.asset == a)
            && self.signal_type.map_or(true, |t| signal.signal_type == t)
    }

    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(asset) = &self.asset {
            cond = cond.add(signals::Column::Asset.eq(asset.clone()));
        }
        if let Some(signal_type) = self.signal_type {
            cond = cond.add(signals::Column::SignalType.eq(signal_type));
        }
        cond
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::sea_orm_active_enums::SignalStatus;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    fn signal(id: i32, asset: &str, signal_type: SignalType) -> signals::Model {
        signals::Model {
            id,
            asset: asset.to_string(),
            signal_type,
            entry_price: Decimal::new(100, 0),
            target_price: Decimal::new(103, 0),
            stop_loss: Decimal::new(98, 0),
            accuracy: 90,
            time: "10:00".to_string(),
            status: SignalStatus::Active,
            indicators: serde_json::json!(["RSI"]),
            platform: None,
            timeframe: None,
            analysis: None,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
        }
    }

    fn sample() -> Vec<signals::Model> {
        vec![
            signal(1, "BTC/USDT", SignalType::Buy),
            signal(2, "BTC/USDT", SignalType::Sell),
            signal(3, "ETH/USDT", SignalType::Buy),
            signal(4, "SOL/USDT", SignalType::Sell),
        ]
    }

    fn ids(filter: &SignalFilter) -> Vec<i32> {
        sample().into_iter().filter(|s| filter.matches(s)).map(|s| s.id).collect()
    }

    #[test]
    fn test_all_filter_is_a_no_op() {
        let filter = SignalFilter::from_query(Some("all"), Some("ALL")).unwrap();
        assert!(filter.is_empty());
        assert_eq!(ids(&filter), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_missing_filter_is_a_no_op() {
        let filter = SignalFilter::from_query(None, Some("  ")).unwrap();
        assert_eq!(ids(&filter), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_filter_by_asset() {
        let filter = SignalFilter::from_query(Some("BTC/USDT"), None).unwrap();
        assert_eq!(ids(&filter), vec![1, 2]);
    }

    #[test]
    fn test_filter_by_direction() {
        let filter = SignalFilter::from_query(None, Some("sell")).unwrap();
        assert_eq!(ids(&filter), vec![2, 4]);
    }

    #[test]
    fn test_filter_by_asset_and_direction() {
        let filter = SignalFilter::from_query(Some("BTC/USDT"), Some("buy")).unwrap();
        assert_eq!(ids(&filter), vec![1]);
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        assert!(SignalFilter::from_query(None, Some("hold")).is_err());
    }

    #[test]
    fn test_condition_renders_only_requested_columns() {
        let filter = SignalFilter::from_query(Some("ETH/USDT"), Some("all")).unwrap();
        let sql = signals::Entity::find()
            .filter(filter.condition())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""signals"."asset" = 'ETH/USDT'"#));
        assert!(!sql.contains(r#""signals"."type" ="#));
    }
}
