//! OpenAI chat-completions client used for AI-assisted signal generation.
//!
//! Only JSON mode is used; every reply is parsed into a typed struct and any
//! failure is surfaced as `AppError::Upstream` so callers can fall back to the
//! algorithmic generator.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::entity::sea_orm_active_enums::{Language, SignalType};
use crate::error::{AppError, Result};
use crate::signal_generator::{
    indicator_sets, price_precision, GenerateRequest, GeneratedSignal, KeyLevels, MarketSnapshot,
    TrendAnalysis,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone)]
pub struct OpenAiService {
    api_key: String,
    model_name: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: serde_json::Value,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Shape the model is asked to return for a signal.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiSignal {
    #[serde(rename = "type")]
    signal_type: String,
    entry_price: f64,
    target_price: f64,
    stop_loss: f64,
    accuracy: f64,
    #[serde(default)]
    indicators: Vec<String>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    potential_profit: Option<String>,
    #[serde(default)]
    risk_reward_ratio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiTrend {
    trend: String,
    strength: f64,
    summary: String,
    #[serde(default)]
    key_levels: Option<AiKeyLevels>,
}

#[derive(Debug, Default, Deserialize)]
struct AiKeyLevels {
    #[serde(default)]
    support: Vec<f64>,
    #[serde(default)]
    resistance: Vec<f64>,
}

impl OpenAiService {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_config(api_key, DEFAULT_MODEL.to_string(), DEFAULT_BASE_URL.to_string(), 30)
    }

    pub fn with_config(
        api_key: String,
        model_name: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_key,
            model_name,
            base_url,
            client,
        })
    }

    async fn complete_json(&self, system: &str, prompt: String, temperature: f32) -> Result<String> {
        let body = ChatRequest {
            model: &self.model_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: json!({ "type": "json_object" }),
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!(model = %self.model_name, "Calling OpenAI chat completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("OpenAI returned {}: {}", status, text)));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Upstream("OpenAI returned no content".to_string()))
    }

    pub async fn generate_signal(
        &self,
        request: &GenerateRequest,
        snapshot: &MarketSnapshot,
        language: Language,
        now: DateTime<Utc>,
    ) -> Result<GeneratedSignal> {
        let indicators: Vec<String> = indicator_sets(&request.platform)
            .iter()
            .flat_map(|set| set.iter())
            .map(|s| s.to_string())
            .collect();
        let reply_language = match language {
            Language::Ar => "Arabic",
            Language::En => "English",
        };
        let prompt = format!(
            "Generate a trading signal for {pair} on {platform} with a {timeframe} timeframe.\n\
             Current price: {price}. 24h change: {change:.2}%. 24h high: {high}. 24h low: {low}.\n\
             Prefer these indicators: {indicators}.\n\
             Reply with a JSON object with keys: type (buy|sell), entryPrice, targetPrice, \
             stopLoss, accuracy (integer 90-95), indicators (array of 3 names), reasoning \
             (written in {lang}), potentialProfit (percent string), riskRewardRatio (string).",
            pair = request.pair,
            platform = request.platform,
            timeframe = request.timeframe,
            price = snapshot.price,
            change = snapshot.change24h,
            high = snapshot.high24h,
            low = snapshot.low24h,
            indicators = indicators.join(", "),
            lang = reply_language,
        );

        let content = self
            .complete_json(
                "You are an expert technical analyst for binary options and crypto markets.",
                prompt,
                0.5,
            )
            .await?;
        let reply: AiSignal = serde_json::from_str(&content)
            .map_err(|e| AppError::Upstream(format!("Malformed OpenAI signal: {}", e)))?;
        signal_from_reply(reply, request, snapshot, now)
    }

    pub async fn analyze_trend(
        &self,
        snapshot: &MarketSnapshot,
        language: Language,
    ) -> Result<TrendAnalysis> {
        let prompt = format!(
            "Analyze the short-term trend of {pair}. Price {price}, 24h change {change:.2}%, \
             high {high}, low {low}. Reply with a JSON object with keys: trend \
             (bullish|bearish|sideways), strength (0-100), summary (in {lang}), \
             keyLevels {{support: [numbers], resistance: [numbers]}}.",
            pair = snapshot.asset,
            price = snapshot.price,
            change = snapshot.change24h,
            high = snapshot.high24h,
            low = snapshot.low24h,
            lang = if language == Language::Ar { "Arabic" } else { "English" },
        );

        let content = self
            .complete_json("You are a concise market analyst.", prompt, 0.4)
            .await?;
        let reply: AiTrend = serde_json::from_str(&content)
            .map_err(|e| AppError::Upstream(format!("Malformed OpenAI trend: {}", e)))?;
        Ok(trend_from_reply(reply, snapshot, language))
    }
}

fn decimal(value: f64, dp: u32) -> Result<Decimal> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Upstream(format!("Invalid price in AI reply: {}", value)));
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp))
        .ok_or_else(|| AppError::Upstream(format!("Invalid price in AI reply: {}", value)))
}

fn signal_from_reply(
    reply: AiSignal,
    request: &GenerateRequest,
    snapshot: &MarketSnapshot,
    now: DateTime<Utc>,
) -> Result<GeneratedSignal> {
    let signal_type = SignalType::parse(&reply.signal_type)
        .ok_or_else(|| AppError::Upstream(format!("Unknown signal type {}", reply.signal_type)))?;
    let dp = price_precision(snapshot.price);
    let entry_price = decimal(reply.entry_price, dp)?;
    let target_price = decimal(reply.target_price, dp)?;
    let stop_loss = decimal(reply.stop_loss, dp)?;

    let consistent = match signal_type {
        SignalType::Buy => target_price > entry_price && stop_loss < entry_price,
        SignalType::Sell => target_price < entry_price && stop_loss > entry_price,
    };
    if !consistent {
        return Err(AppError::Upstream("AI signal levels contradict its direction".to_string()));
    }

    let indicators = if reply.indicators.is_empty() {
        indicator_sets(&request.platform)[0].iter().map(|s| s.to_string()).collect()
    } else {
        reply.indicators
    };

    Ok(GeneratedSignal {
        asset: request.pair.clone(),
        signal_type,
        entry_price,
        target_price,
        stop_loss,
        accuracy: (reply.accuracy.round() as i32).clamp(90, 95),
        time: now.format("%H:%M").to_string(),
        analysis: json!({
            "reasoning": reply.reasoning,
            "potential_profit": reply.potential_profit.unwrap_or_default(),
            "risk_reward_ratio": reply.risk_reward_ratio.unwrap_or_default(),
            "timestamp": now.to_rfc3339(),
            "source": "openai",
        }),
        indicators,
        reasoning: reply.reasoning,
        platform: request.platform.clone(),
        timeframe: request.timeframe.clone(),
    })
}

fn trend_from_reply(reply: AiTrend, snapshot: &MarketSnapshot, language: Language) -> TrendAnalysis {
    let trend = match reply.trend.to_ascii_lowercase().as_str() {
        "bullish" => "bullish",
        "bearish" => "bearish",
        _ => "sideways",
    };
    let dp = price_precision(snapshot.price);
    let levels = reply.key_levels.unwrap_or_default();
    let to_levels = |values: Vec<f64>| -> Vec<Decimal> {
        values
            .into_iter()
            .filter_map(|v| Decimal::from_f64(v).map(|d| d.round_dp(dp)))
            .collect()
    };

    TrendAnalysis {
        pair: snapshot.asset.clone(),
        trend: trend.to_string(),
        trend_label: crate::i18n::translate_plain(language.code(), &format!("trend_{}", trend), None),
        strength: reply.strength.clamp(0.0, 100.0) as u8,
        summary: reply.summary,
        key_levels: KeyLevels {
            support: to_levels(levels.support),
            resistance: to_levels(levels.resistance),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            asset: "ETH/USDT".to_string(),
            price: 2250.0,
            change24h: 1.5,
            high24h: 2295.0,
            low24h: 2205.0,
            volume24h: 0.0,
            market_cap: 0.0,
            data_source: "test".to_string(),
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            platform: "Binance".to_string(),
            pair: "ETH/USDT".to_string(),
            timeframe: "1h".to_string(),
        }
    }

    #[test]
    fn test_parses_camel_case_reply() {
        let reply: AiSignal = serde_json::from_str(
            r#"{"type":"BUY","entryPrice":2250.5,"targetPrice":2300,"stopLoss":2220,
                "accuracy":97.2,"indicators":["RSI","EMA"],"reasoning":"Momentum",
                "potentialProfit":"2.2%","riskRewardRatio":"1.6"}"#,
        )
        .unwrap();
        let signal = signal_from_reply(reply, &request(), &snapshot(), Utc::now()).unwrap();
        assert_eq!(signal.signal_type, SignalType::Buy);
        assert_eq!(signal.accuracy, 95);
        assert_eq!(signal.entry_price, Decimal::new(225050, 2));
        assert_eq!(signal.analysis["source"], "openai");
    }

    #[test]
    fn test_rejects_levels_on_wrong_side() {
        let reply: AiSignal = serde_json::from_str(
            r#"{"type":"sell","entryPrice":2250,"targetPrice":2300,"stopLoss":2200,"accuracy":92}"#,
        )
        .unwrap();
        assert!(signal_from_reply(reply, &request(), &snapshot(), Utc::now()).is_err());
    }

    #[test]
    fn test_missing_indicators_use_platform_defaults() {
        let reply: AiSignal = serde_json::from_str(
            r#"{"type":"buy","entryPrice":2250,"targetPrice":2300,"stopLoss":2200,"accuracy":92}"#,
        )
        .unwrap();
        let signal = signal_from_reply(reply, &request(), &snapshot(), Utc::now()).unwrap();
        assert_eq!(signal.indicators, vec!["RSI", "EMA", "MACD"]);
    }

    #[test]
    fn test_trend_reply_is_normalised() {
        let reply: AiTrend = serde_json::from_str(
            r#"{"trend":"Strongly up","strength":140,"summary":"ok",
                "keyLevels":{"support":[2200.123],"resistance":[2300]}}"#,
        )
        .unwrap();
        let trend = trend_from_reply(reply, &snapshot(), Language::En);
        assert_eq!(trend.trend, "sideways");
        assert_eq!(trend.strength, 100);
        assert_eq!(trend.key_levels.support, vec![Decimal::new(220012, 2)]);
    }
}
