//! Algorithmic signal generation.
//!
//! Prices come from the latest stored market snapshot for the pair, or a
//! synthetic placeholder when there is none. Target and stop distances scale
//! with the trading platform and the timeframe.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entity::market_data;
use crate::entity::sea_orm_active_enums::{Language, SignalType};
use crate::error::{AppError, Result};
use crate::i18n;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub platform: String,
    pub pair: String,
    pub timeframe: String,
}

impl GenerateRequest {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("platform", &self.platform),
            ("pair", &self.pair),
            ("timeframe", &self.timeframe),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidInput(format!("{} is required", name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub asset: String,
    pub price: f64,
    /// Percent, e.g. `-2.5`.
    pub change24h: f64,
    pub high24h: f64,
    pub low24h: f64,
    pub volume24h: f64,
    pub market_cap: f64,
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSignal {
    pub asset: String,
    pub signal_type: SignalType,
    pub entry_price: Decimal,
    pub target_price: Decimal,
    pub stop_loss: Decimal,
    pub accuracy: i32,
    pub time: String,
    pub indicators: Vec<String>,
    pub reasoning: String,
    pub platform: String,
    pub timeframe: String,
    pub analysis: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub pair: String,
    pub trend: String,
    pub trend_label: String,
    pub strength: u8,
    pub summary: String,
    pub key_levels: KeyLevels,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyLevels {
    pub support: Vec<Decimal>,
    pub resistance: Vec<Decimal>,
}

const DEFAULT_INDICATORS: &[&[&str]] = &[
    &["RSI", "Moving Average", "MACD"],
    &["Bollinger Bands", "Stochastic", "MACD"],
];

pub fn target_ratio(platform: &str) -> f64 {
    match platform {
        "IQ Option" => 0.025,
        "Olymp Trade" => 0.03,
        "Binance" => 0.02,
        "Pocket Option" => 0.035,
        "Deriv" => 0.028,
        _ => 0.025,
    }
}

pub fn stop_ratio(platform: &str) -> f64 {
    match platform {
        "IQ Option" => 0.015,
        "Olymp Trade" => 0.02,
        "Binance" => 0.01,
        "Pocket Option" => 0.025,
        "Deriv" => 0.018,
        _ => 0.015,
    }
}

pub fn timeframe_multiplier(timeframe: &str) -> f64 {
    match timeframe {
        "1m" => 0.3,
        "5m" => 0.6,
        "15m" => 0.8,
        "30m" => 1.0,
        "1h" => 1.5,
        "4h" => 2.0,
        "1d" => 3.0,
        _ => 1.0,
    }
}

pub fn indicator_sets(platform: &str) -> &'static [&'static [&'static str]] {
    match platform {
        "IQ Option" => &[
            &["RSI", "Moving Average", "Stochastic"],
            &["MACD", "Bollinger Bands", "RSI"],
            &["Parabolic SAR", "RSI", "Stochastic"],
        ],
        "Olymp Trade" => &[
            &["RSI", "Moving Average", "Alligator"],
            &["MACD", "Bollinger Bands", "ADX"],
            &["Ichimoku Cloud", "RSI", "Volume"],
        ],
        "Binance" => &[
            &["RSI", "EMA", "MACD"],
            &["Bollinger Bands", "RSI", "Volume"],
            &["Fibonacci", "Moving Average", "OBV"],
        ],
        "Pocket Option" => &[
            &["RSI", "SMA", "CCI"],
            &["MACD", "Bollinger Bands", "Momentum"],
            &["RSI", "Stochastic", "Williams %R"],
        ],
        "Deriv" => &[
            &["RSI", "Moving Average", "ATR"],
            &["MACD", "Bollinger Bands", "Stochastic"],
            &["Pivot Points", "RSI", "Volume"],
        ],
        _ => DEFAULT_INDICATORS,
    }
}

/// Sub-dollar assets keep more decimals so targets stay distinguishable.
pub fn price_precision(price: f64) -> u32 {
    if price >= 1.0 {
        2
    } else {
        5
    }
}

pub fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}

fn base_price<R: Rng + ?Sized>(pair: &str, rng: &mut R) -> f64 {
    let pair = pair.to_ascii_uppercase();
    if pair.contains("BTC") {
        37500.0 + rng.gen_range(0..2000) as f64
    } else if pair.contains("ETH") {
        2200.0 + rng.gen_range(0..200) as f64
    } else if pair.contains("SOL") {
        140.0 + rng.gen_range(0..20) as f64
    } else if pair.contains("XRP") {
        0.5 + rng.gen::<f64>() * 0.2
    } else if pair.contains("EUR") {
        1.08 + rng.gen::<f64>() * 0.02
    } else if pair.contains("GBP") {
        1.27 + rng.gen::<f64>() * 0.02
    } else if pair.contains("USD") {
        1.0 + rng.gen::<f64>() * 0.01
    } else {
        100.0 + rng.gen_range(0..50) as f64
    }
}

/// Synthetic snapshot used when no market data has been stored for a pair.
pub fn placeholder_snapshot<R: Rng + ?Sized>(pair: &str, rng: &mut R) -> MarketSnapshot {
    let price = base_price(pair, rng);
    let magnitude = rng.gen::<f64>() * 5.0;
    let change24h = if rng.gen_bool(0.5) { magnitude } else { -magnitude };

    MarketSnapshot {
        asset: pair.to_string(),
        price,
        change24h: (change24h * 100.0).round() / 100.0,
        high24h: price * 1.02,
        low24h: price * 0.98,
        volume24h: (rng.gen::<f64>() * 1_000_000.0 + 500_000.0).round(),
        market_cap: (price * (rng.gen::<f64>() * 1_000_000.0 + 5_000_000.0)).round(),
        data_source: "Algorithmic Model".to_string(),
    }
}

impl MarketSnapshot {
    pub fn from_model(model: &market_data::Model) -> Self {
        let price = model.price.to_f64().unwrap_or_default();
        let opt = |v: Option<Decimal>, fallback: f64| v.and_then(|d| d.to_f64()).unwrap_or(fallback);
        Self {
            asset: model.asset.clone(),
            price,
            change24h: opt(model.change24h, 0.0),
            high24h: opt(model.high24h, price * 1.02),
            low24h: opt(model.low24h, price * 0.98),
            volume24h: opt(model.volume24h, 0.0),
            market_cap: opt(model.market_cap, 0.0),
            data_source: model.data_source.clone().unwrap_or_default(),
        }
    }

    pub fn to_active_model(&self, now: DateTime<Utc>) -> market_data::ActiveModel {
        use sea_orm::ActiveValue::Set;
        let dp = price_precision(self.price);
        market_data::ActiveModel {
            asset: Set(self.asset.clone()),
            price: Set(to_decimal(self.price, dp)),
            change24h: Set(Some(to_decimal(self.change24h, 2))),
            high24h: Set(Some(to_decimal(self.high24h, dp))),
            low24h: Set(Some(to_decimal(self.low24h, dp))),
            volume24h: Set(Some(to_decimal(self.volume24h, 0))),
            market_cap: Set(Some(to_decimal(self.market_cap, 0))),
            data_source: Set(Some(self.data_source.clone())),
            timestamp: Set(now),
            ..Default::default()
        }
    }
}

fn signal_reason<R: Rng + ?Sized>(
    language: Language,
    signal_type: SignalType,
    pair: &str,
    indicators: &[String],
    rng: &mut R,
) -> String {
    let prefix = match signal_type {
        SignalType::Buy => "reason_buy_",
        SignalType::Sell => "reason_sell_",
    };
    let key = format!("{}{}", prefix, rng.gen_range(1..=5));
    let ind0 = indicators.first().map(String::as_str).unwrap_or("RSI");
    let ind1 = indicators.get(1).map(String::as_str).unwrap_or(ind0);
    let all = indicators.join(", ");
    i18n::translate_plain(
        language.code(),
        &key,
        Some(&[("ind0", ind0), ("ind1", ind1), ("all", &all), ("pair", pair)]),
    )
}

pub fn generate<R: Rng + ?Sized>(
    request: &GenerateRequest,
    snapshot: &MarketSnapshot,
    language: Language,
    now: DateTime<Utc>,
    rng: &mut R,
) -> GeneratedSignal {
    let is_uptrend = snapshot.change24h > 0.0 || rng.gen_bool(0.5);
    let signal_type = if is_uptrend { SignalType::Buy } else { SignalType::Sell };

    let multiplier = timeframe_multiplier(&request.timeframe);
    let target_ratio = target_ratio(&request.platform) * multiplier;
    let stop_ratio = stop_ratio(&request.platform) * multiplier;

    let jitter = 0.001 * rng.gen::<f64>();
    let (entry, target, stop) = match signal_type {
        SignalType::Buy => {
            let entry = snapshot.price * (1.0 + jitter);
            (entry, entry * (1.0 + target_ratio), entry * (1.0 - stop_ratio))
        }
        SignalType::Sell => {
            let entry = snapshot.price * (1.0 - jitter);
            (entry, entry * (1.0 - target_ratio), entry * (1.0 + stop_ratio))
        }
    };

    let sets = indicator_sets(&request.platform);
    let indicators: Vec<String> = sets[rng.gen_range(0..sets.len())]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let reasoning = signal_reason(language, signal_type, &request.pair, &indicators, rng);

    let dp = price_precision(snapshot.price);
    let entry_price = to_decimal(entry, dp);
    let target_price = to_decimal(target, dp);
    let stop_loss = to_decimal(stop, dp);

    let potential_profit = ((target - entry).abs() / entry) * 100.0;
    let risk = (entry - stop).abs();
    let risk_reward = if risk > 0.0 { (target - entry).abs() / risk } else { 0.0 };

    GeneratedSignal {
        asset: request.pair.clone(),
        signal_type,
        entry_price,
        target_price,
        stop_loss,
        accuracy: rng.gen_range(90..=95),
        time: now.format("%H:%M").to_string(),
        analysis: json!({
            "reasoning": reasoning,
            "potential_profit": format!("{:.2}%", potential_profit),
            "risk_reward_ratio": format!("{:.2}", risk_reward),
            "timestamp": now.to_rfc3339(),
        }),
        indicators,
        reasoning,
        platform: request.platform.clone(),
        timeframe: request.timeframe.clone(),
    }
}

/// Trend summary derived from the snapshot's 24h change and range.
pub fn analyze_trend(snapshot: &MarketSnapshot, language: Language) -> TrendAnalysis {
    let change = snapshot.change24h;
    let trend = if change > 1.0 {
        "bullish"
    } else if change < -1.0 {
        "bearish"
    } else {
        "sideways"
    };
    let strength = (50.0 + change.abs() * 10.0).clamp(0.0, 100.0) as u8;
    let trend_label = i18n::translate_plain(language.code(), &format!("trend_{}", trend), None);

    let dp = price_precision(snapshot.price);
    let summary = i18n::translate_plain(
        language.code(),
        "trend_summary",
        Some(&[
            ("pair", &snapshot.asset),
            ("price", &to_decimal(snapshot.price, dp).to_string()),
            ("change", &format!("{:+.2}", change)),
            ("trend", &trend_label),
            ("strength", &strength.to_string()),
        ]),
    );

    TrendAnalysis {
        pair: snapshot.asset.clone(),
        trend: trend.to_string(),
        trend_label,
        strength,
        summary,
        key_levels: KeyLevels {
            support: vec![
                to_decimal(snapshot.low24h, dp),
                to_decimal(snapshot.low24h * 0.99, dp),
            ],
            resistance: vec![
                to_decimal(snapshot.high24h, dp),
                to_decimal(snapshot.high24h * 1.01, dp),
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(price: f64, change24h: f64) -> MarketSnapshot {
        MarketSnapshot {
            asset: "BTC/USDT".to_string(),
            price,
            change24h,
            high24h: price * 1.02,
            low24h: price * 0.98,
            volume24h: 1_000_000.0,
            market_cap: 0.0,
            data_source: "test".to_string(),
        }
    }

    fn request(platform: &str, timeframe: &str) -> GenerateRequest {
        GenerateRequest {
            platform: platform.to_string(),
            pair: "BTC/USDT".to_string(),
            timeframe: timeframe.to_string(),
        }
    }

    #[test]
    fn test_platform_ratios_and_defaults() {
        assert_eq!(target_ratio("Pocket Option"), 0.035);
        assert_eq!(stop_ratio("Binance"), 0.01);
        assert_eq!(target_ratio("Unknown"), 0.025);
        assert_eq!(stop_ratio("Unknown"), 0.015);
        assert_eq!(timeframe_multiplier("4h"), 2.0);
        assert_eq!(timeframe_multiplier("2w"), 1.0);
    }

    #[test]
    fn test_positive_change_always_buys() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let signal = generate(
                &request("Binance", "1h"),
                &snapshot(40_000.0, 2.0),
                Language::En,
                Utc::now(),
                &mut rng,
            );
            assert_eq!(signal.signal_type, SignalType::Buy);
            assert!(signal.target_price > signal.entry_price);
            assert!(signal.stop_loss < signal.entry_price);
        }
    }

    #[test]
    fn test_sell_signal_targets_below_entry() {
        let mut rng = StdRng::seed_from_u64(1);
        let sell = (0..50)
            .map(|_| {
                generate(
                    &request("Deriv", "15m"),
                    &snapshot(100.0, -3.0),
                    Language::En,
                    Utc::now(),
                    &mut rng,
                )
            })
            .find(|s| s.signal_type == SignalType::Sell)
            .expect("a negative change should produce some sell signals");
        assert!(sell.target_price < sell.entry_price);
        assert!(sell.stop_loss > sell.entry_price);
    }

    #[test]
    fn test_target_distance_scales_with_platform_and_timeframe() {
        let mut rng = StdRng::seed_from_u64(3);
        let signal = generate(
            &request("Binance", "4h"),
            &snapshot(10_000.0, 1.0),
            Language::En,
            Utc::now(),
            &mut rng,
        );
        let entry = signal.entry_price.to_f64().unwrap();
        let target = signal.target_price.to_f64().unwrap();
        let ratio = (target - entry) / entry;
        assert!((ratio - 0.04).abs() < 0.0005, "ratio was {}", ratio);
    }

    #[test]
    fn test_accuracy_and_indicators_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..30 {
            let signal = generate(
                &request("IQ Option", "5m"),
                &snapshot(1.1, 0.5),
                Language::Ar,
                Utc::now(),
                &mut rng,
            );
            assert!((90..=95).contains(&signal.accuracy));
            assert_eq!(signal.indicators.len(), 3);
            assert!(indicator_sets("IQ Option")
                .iter()
                .any(|set| set.iter().map(|s| s.to_string()).collect::<Vec<_>>() == signal.indicators));
            assert_eq!(signal.time.len(), 5);
            assert!(signal.analysis["potential_profit"].as_str().unwrap().ends_with('%'));
        }
    }

    #[test]
    fn test_placeholder_base_prices() {
        let mut rng = StdRng::seed_from_u64(5);
        let btc = placeholder_snapshot("BTC/USDT", &mut rng);
        assert!((37_500.0..39_500.0).contains(&btc.price));
        let xrp = placeholder_snapshot("XRP/USDT", &mut rng);
        assert!((0.5..0.7).contains(&xrp.price));
        let other = placeholder_snapshot("DOGE/TRY", &mut rng);
        assert!((100.0..150.0).contains(&other.price));
        assert!(btc.change24h.abs() <= 5.0);
        assert!((btc.high24h - btc.price * 1.02).abs() < 1e-6);
    }

    #[test]
    fn test_sub_dollar_prices_keep_precision() {
        assert_eq!(price_precision(0.52), 5);
        assert_eq!(price_precision(37_000.0), 2);
    }

    #[test]
    fn test_trend_classification() {
        let up = analyze_trend(&snapshot(100.0, 3.0), Language::En);
        assert_eq!(up.trend, "bullish");
        assert_eq!(up.strength, 80);
        assert!(up.key_levels.support[0] < up.key_levels.resistance[0]);

        let flat = analyze_trend(&snapshot(100.0, 0.4), Language::Ar);
        assert_eq!(flat.trend, "sideways");
        assert_eq!(flat.trend_label, "متذبذب");

        let down = analyze_trend(&snapshot(100.0, -9.0), Language::En);
        assert_eq!(down.trend, "bearish");
        assert_eq!(down.strength, 100);
    }

    #[test]
    fn test_request_validation() {
        assert!(request("Binance", "1h").validate().is_ok());
        assert!(request("", "1h").validate().is_err());
        assert!(request("Binance", " ").validate().is_err());
    }
}
