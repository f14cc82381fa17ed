//! Telegram Stars payment helpers shared by the API and the bot.
//!
//! Covers the plan catalog, `t.me` deep links carrying the payment intent,
//! invoice payloads and Mini-App `initData` verification.

use chrono::{DateTime, Days, Months, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use url::form_urlencoded;

use crate::config::DEFAULT_BOT_USERNAME;
use crate::entity::sea_orm_active_enums::{Language, SubscriptionTier};
use crate::error::{AppError, Result};
use crate::i18n;

type HmacSha256 = Hmac<Sha256>;

pub const STARS_CURRENCY: &str = "XTR";
pub const PAYMENT_METHOD: &str = "telegram_stars";
pub const STORED_CURRENCY: &str = "STARS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDuration {
    Days(u64),
    Months(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub code: &'static str,
    pub stars: u32,
    pub tier: SubscriptionTier,
    pub duration: PlanDuration,
    pub daily_signal_limit: i32,
}

pub const PLANS: [Plan; 4] = [
    Plan {
        code: "weekly",
        stars: 750,
        tier: SubscriptionTier::Basic,
        duration: PlanDuration::Days(7),
        daily_signal_limit: 20,
    },
    Plan {
        code: "monthly",
        stars: 2300,
        tier: SubscriptionTier::Pro,
        duration: PlanDuration::Months(1),
        daily_signal_limit: 50,
    },
    Plan {
        code: "annual",
        stars: 10000,
        tier: SubscriptionTier::Vip,
        duration: PlanDuration::Months(12),
        daily_signal_limit: 100,
    },
    Plan {
        code: "premium",
        stars: 18500,
        tier: SubscriptionTier::Vip,
        duration: PlanDuration::Months(12),
        daily_signal_limit: 100,
    },
];

impl Plan {
    pub fn find(code: &str) -> Option<&'static Plan> {
        let code = code.trim().to_ascii_lowercase();
        PLANS.iter().find(|p| p.code == code)
    }

    pub fn get(code: &str) -> Result<&'static Plan> {
        Self::find(code).ok_or_else(|| AppError::InvalidInput(format!("Unknown plan: {}", code)))
    }

    pub fn expiry_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let end = match self.duration {
            PlanDuration::Days(days) => start.checked_add_days(Days::new(days)),
            PlanDuration::Months(months) => start.checked_add_months(Months::new(months)),
        };
        end.unwrap_or(start)
    }

    /// Approximate length in days, for display only.
    pub fn display_days(&self) -> u64 {
        match self.duration {
            PlanDuration::Days(days) => days,
            PlanDuration::Months(12) => 365,
            PlanDuration::Months(months) => months as u64 * 30,
        }
    }

    pub fn display_name(&self, locale: &str) -> String {
        i18n::translate_plain(locale, &format!("plan_name_{}", self.code), None)
    }
}

/// What a `pay_<plan>_<amount>[_<user_id>]` start parameter carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub plan: String,
    pub amount: String,
    pub user_id: Option<String>,
}

/// Form-urlencoded, with `_` escaped as well since it separates components.
fn encode(component: &str) -> String {
    form_urlencoded::byte_serialize(component.as_bytes())
        .collect::<String>()
        .replace('_', "%5F")
}

pub fn start_parameter(plan: &str, amount: &str, user_id: Option<&str>) -> String {
    let mut param = format!("pay_{}_{}", encode(plan), encode(amount));
    if let Some(user_id) = user_id.filter(|u| !u.is_empty()) {
        param.push('_');
        param.push_str(&encode(user_id));
    }
    param
}

pub fn deep_link(bot_username: Option<&str>, plan: &str, amount: &str, user_id: Option<&str>) -> String {
    let bot = bot_username
        .map(|b| b.trim_start_matches('@'))
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BOT_USERNAME);
    format!("https://t.me/{}?start={}", bot, start_parameter(plan, amount, user_id))
}

fn decode(component: &str) -> String {
    form_urlencoded::parse(format!("v={}", component).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| component.to_string())
}

pub fn parse_start_parameter(param: &str) -> Option<PaymentIntent> {
    let rest = param.trim().strip_prefix("pay_")?;
    let mut parts = rest.splitn(3, '_');
    let plan = parts.next().filter(|p| !p.is_empty())?;
    let amount = parts.next().filter(|a| !a.is_empty())?;
    let user_id = parts.next().filter(|u| !u.is_empty()).map(decode);
    Some(PaymentIntent {
        plan: decode(plan),
        amount: decode(amount),
        user_id,
    })
}

/// `tg_<unix_ms>_<0..1000>`
pub fn payment_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!("tg_{}_{}", now.timestamp_millis(), rng.gen_range(0..1000))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayload {
    pub payment_id: String,
    pub plan: String,
    pub telegram_user_id: i64,
}

impl InvoicePayload {
    pub fn encode(&self) -> String {
        format!("{}_{}_{}", self.payment_id, self.plan, self.telegram_user_id)
    }

    /// Payment ids contain underscores themselves, so parse from the right.
    pub fn parse(payload: &str) -> Option<Self> {
        let mut parts = payload.rsplitn(3, '_');
        let telegram_user_id = parts.next()?.parse().ok()?;
        let plan = parts.next()?.to_string();
        let payment_id = parts.next()?.to_string();
        if payment_id.is_empty() || Plan::find(&plan).is_none() {
            return None;
        }
        Some(Self {
            payment_id,
            plan,
            telegram_user_id,
        })
    }
}

/// The `user` object embedded in Mini-App `initData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitData {
    pub user: Option<WebAppUser>,
    pub auth_date: Option<i64>,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
}

fn data_check_string(pairs: &[(String, String)]) -> String {
    let mut fields: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| k != "hash").collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Hash Telegram expects for the given `initData` fields.
pub fn sign_init_data(pairs: &[(String, String)], bot_token: &str) -> Result<String> {
    let secret = hmac_sha256(b"WebAppData", bot_token.as_bytes())?;
    let digest = hmac_sha256(&secret, data_check_string(pairs).as_bytes())?;
    Ok(hex::encode(digest))
}

/// Verify and parse Mini-App `initData`. With no token configured the
/// signature check is skipped.
pub fn verify_init_data(init_data: &str, bot_token: Option<&str>) -> Result<InitData> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(init_data.as_bytes())
        .into_owned()
        .collect();

    if let Some(token) = bot_token.filter(|t| !t.is_empty()) {
        let received = pairs
            .iter()
            .find(|(k, _)| k == "hash")
            .map(|(_, v)| v.as_str())
            .ok_or(AppError::Unauthorized)?;
        let received = hex::decode(received).map_err(|_| AppError::Unauthorized)?;

        let secret = hmac_sha256(b"WebAppData", token.as_bytes())?;
        let mut mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
        mac.update(data_check_string(&pairs).as_bytes());
        mac.verify_slice(&received).map_err(|_| AppError::Unauthorized)?;
    } else {
        tracing::warn!("TELEGRAM_BOT_TOKEN not set, skipping initData verification");
    }

    let field = |name: &str| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
    let user = match field("user") {
        Some(raw) => Some(
            serde_json::from_str::<WebAppUser>(&raw)
                .map_err(|e| AppError::InvalidInput(format!("Invalid initData user: {}", e)))?,
        ),
        None => None,
    };

    Ok(InitData {
        user,
        auth_date: field("auth_date").and_then(|v| v.parse().ok()),
        query_id: field("query_id"),
        start_param: field("start_param"),
    })
}

pub fn plans_overview(locale: &str) -> String {
    let lines = PLANS
        .iter()
        .map(|plan| {
            i18n::translate(
                locale,
                "plan_line",
                Some(&[
                    ("name", &plan.display_name(locale)),
                    ("stars", &plan.stars.to_string()),
                    ("days", &plan.display_days().to_string()),
                ]),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    // `plan_line` output is already escaped HTML.
    i18n::translate(locale, "plans_list", None).replace("{plans}", &lines)
}

pub fn plan_details(plan: &Plan, locale: &str) -> String {
    i18n::translate(
        locale,
        "plan_details",
        Some(&[
            ("name", &plan.display_name(locale)),
            ("stars", &plan.stars.to_string()),
            ("days", &plan.display_days().to_string()),
            ("tier", plan.tier.as_str()),
        ]),
    )
}

/// Reply for a webhook message, chosen by the command it contains.
pub fn canned_reply(text: &str, language: Language, bot_name: &str) -> String {
    let locale = language.code();
    if text.contains("/start") {
        return i18n::translate(locale, "start_welcome", Some(&[("bot_name", bot_name)]));
    }
    if text.contains("/plans") {
        return plans_overview(locale);
    }
    if let Some(plan) = PLANS.iter().find(|p| text.contains(&format!("/{}", p.code))) {
        return plan_details(plan, locale);
    }
    i18n::translate(locale, "webhook_echo", Some(&[("text", text)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_plan_catalog() {
        let weekly = Plan::find("weekly").unwrap();
        assert_eq!(weekly.stars, 750);
        assert_eq!(weekly.tier, SubscriptionTier::Basic);
        assert_eq!(Plan::find("Monthly").unwrap().stars, 2300);
        assert_eq!(Plan::find("annual").unwrap().tier, SubscriptionTier::Vip);
        assert_eq!(Plan::find("premium").unwrap().stars, 18500);
        assert!(Plan::find("daily").is_none());
        assert!(Plan::get("daily").is_err());
    }

    #[test]
    fn test_plan_expiry() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(
            Plan::find("weekly").unwrap().expiry_from(start),
            Utc.with_ymd_and_hms(2024, 2, 7, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Plan::find("monthly").unwrap().expiry_from(start),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(
            Plan::find("annual").unwrap().expiry_from(start),
            Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_deep_link_embeds_components_verbatim() {
        let link = deep_link(None, "monthly", "2300", Some("42"));
        assert_eq!(
            link,
            "https://t.me/Payment_gateway_Binar_bot?start=pay_monthly_2300_42"
        );
        let link = deep_link(Some("@my_bot"), "weekly", "750", None);
        assert_eq!(link, "https://t.me/my_bot?start=pay_weekly_750");
    }

    #[test]
    fn test_deep_link_url_encodes_components() {
        let link = deep_link(None, "pre mium", "1+1", Some("a/b"));
        assert!(link.ends_with("start=pay_pre+mium_1%2B1_a%2Fb"));
    }

    #[test]
    fn test_start_parameter_parses_back() {
        let param = start_parameter("annual", "10000", Some("user_7"));
        let intent = parse_start_parameter(&param).unwrap();
        assert_eq!(intent.plan, "annual");
        assert_eq!(intent.amount, "10000");
        assert_eq!(intent.user_id.as_deref(), Some("user_7"));

        let intent = parse_start_parameter("pay_weekly_750").unwrap();
        assert_eq!(intent.user_id, None);
        assert!(parse_start_parameter("hello").is_none());
        assert!(parse_start_parameter("pay_weekly").is_none());
    }

    #[test]
    fn test_underscores_inside_components_survive() {
        let param = start_parameter("weekly", "7_50", Some("42"));
        assert_eq!(param, "pay_weekly_7%5F50_42");
        let intent = parse_start_parameter(&param).unwrap();
        assert_eq!(intent.plan, "weekly");
        assert_eq!(intent.amount, "7_50");
        assert_eq!(intent.user_id.as_deref(), Some("42"));

        let intent = parse_start_parameter(&start_parameter("pre_mium", "1", Some("a_b_c"))).unwrap();
        assert_eq!(intent.plan, "pre_mium");
        assert_eq!(intent.user_id.as_deref(), Some("a_b_c"));
    }

    #[test]
    fn test_payment_id_shape() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let id = payment_id(now, &mut rng);
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts[0], "tg");
        assert_eq!(parts[1], "1700000000123");
        assert!(parts[2].parse::<u32>().unwrap() < 1000);
    }

    #[test]
    fn test_invoice_payload_parses_from_the_right() {
        let payload = InvoicePayload {
            payment_id: "tg_1700000000123_17".to_string(),
            plan: "premium".to_string(),
            telegram_user_id: 555,
        };
        let encoded = payload.encode();
        assert_eq!(encoded, "tg_1700000000123_17_premium_555");
        assert_eq!(InvoicePayload::parse(&encoded), Some(payload));
        assert!(InvoicePayload::parse("tg_1_2_gold_5").is_none());
        assert!(InvoicePayload::parse("garbage").is_none());
    }

    fn signed_init_data(token: &str) -> String {
        let pairs = vec![
            ("auth_date".to_string(), "1700000000".to_string()),
            ("query_id".to_string(), "AAF".to_string()),
            (
                "user".to_string(),
                r#"{"id":99,"first_name":"Sam","language_code":"ar"}"#.to_string(),
            ),
        ];
        let hash = sign_init_data(&pairs, token).unwrap();
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        serializer.append_pair("hash", &hash);
        serializer.finish()
    }

    #[test]
    fn test_verify_init_data_accepts_valid_signature() {
        let data = signed_init_data("123:abc");
        let parsed = verify_init_data(&data, Some("123:abc")).unwrap();
        assert_eq!(parsed.user.unwrap().id, 99);
        assert_eq!(parsed.auth_date, Some(1_700_000_000));
    }

    #[test]
    fn test_verify_init_data_rejects_wrong_token_or_tampering() {
        let data = signed_init_data("123:abc");
        assert!(matches!(
            verify_init_data(&data, Some("999:zzz")),
            Err(AppError::Unauthorized)
        ));
        let tampered = data.replace("AAF", "AAG");
        assert!(verify_init_data(&tampered, Some("123:abc")).is_err());
        assert!(verify_init_data("auth_date=1", Some("123:abc")).is_err());
    }

    #[test]
    fn test_verify_init_data_skipped_without_token() {
        let parsed = verify_init_data("user=%7B%22id%22%3A5%7D", None).unwrap();
        assert_eq!(parsed.user.unwrap().id, 5);
    }

    #[test]
    fn test_canned_reply_by_command() {
        let reply = canned_reply("/start", Language::En, "SignalHub");
        assert!(reply.contains("SignalHub"));
        assert!(canned_reply("please /plans", Language::En, "x").contains("750"));
        assert!(canned_reply("/premium", Language::En, "x").contains("18500"));
        let echo = canned_reply("hi <there>", Language::En, "x");
        assert!(echo.contains("hi &lt;there&gt;"));
    }
}
