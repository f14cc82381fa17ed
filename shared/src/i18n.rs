//! Translations for bot replies and stored notifications.
//!
//! Catalogs live in `shared/locales/{ar,en}.yml` and are compiled in by
//! `rust_i18n::i18n!` at the crate root. Placeholders use `{name}` syntax.

use crate::entity::sea_orm_active_enums::Language;
use rust_i18n::t;

pub const SUPPORTED_LOCALES: [&str; 2] = ["ar", "en"];

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn lookup(locale: &str, key: &str) -> String {
    let locale = if SUPPORTED_LOCALES.contains(&locale) { locale } else { "en" };
    t!(key, locale = locale).to_string()
}

fn fill(template: String, args: Option<&[(&str, &str)]>, escape: bool) -> String {
    let Some(args) = args else {
        return template;
    };
    let mut result = template;
    for (k, v) in args {
        let value = if escape { escape_html(v) } else { v.to_string() };
        result = result.replace(&format!("{{{}}}", k), &value);
    }
    result
}

/// Translate for Telegram HTML messages. Argument values are HTML-escaped.
pub fn translate(locale: &str, key: &str, args: Option<&[(&str, &str)]>) -> String {
    fill(lookup(locale, key), args, true)
}

/// Translate for plain-text sinks such as stored notifications.
pub fn translate_plain(locale: &str, key: &str, args: Option<&[(&str, &str)]>) -> String {
    fill(lookup(locale, key), args, false)
}

/// Resolve a stored or client-provided language code, defaulting to Arabic.
pub fn resolve_language(code: Option<&str>) -> Language {
    code.and_then(Language::parse).unwrap_or_default()
}

/// Telegram sends IETF tags like `en-US`; anything that is not Arabic gets English.
pub fn language_from_telegram(code: Option<&str>) -> Language {
    match code {
        Some(tag) if tag.to_ascii_lowercase().starts_with("ar") => Language::Ar,
        _ => Language::En,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::sea_orm_active_enums::Direction;

    #[test]
    fn test_translate_replaces_and_escapes_args() {
        let text = translate("en", "plan_unknown", Some(&[("plan", "<b>x</b>")]));
        assert!(text.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!text.contains("{plan}"));
    }

    #[test]
    fn test_translate_plain_keeps_args_verbatim() {
        let text = translate_plain(
            "en",
            "notification_signal_message",
            Some(&[("direction", "buy"), ("pair", "BTC/USDT"), ("timeframe", "1h")]),
        );
        assert_eq!(text, "A new buy signal was generated for BTC/USDT on the 1h timeframe");
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        assert_eq!(
            translate("fr", "direction_buy", None),
            translate("en", "direction_buy", None)
        );
    }

    #[test]
    fn test_arabic_catalog_is_loaded() {
        assert_eq!(translate("ar", "direction_sell", None), "بيع");
    }

    #[test]
    fn test_language_code_and_direction_stay_in_step() {
        let ar = resolve_language(Some("ar"));
        assert_eq!((ar.code(), ar.direction()), ("ar", Direction::Rtl));
        let en = resolve_language(Some("en"));
        assert_eq!((en.code(), en.direction()), ("en", Direction::Ltr));
    }

    #[test]
    fn test_resolve_language_defaults_to_arabic() {
        assert_eq!(resolve_language(None), Language::Ar);
        assert_eq!(resolve_language(Some("de")), Language::Ar);
        assert_eq!(resolve_language(Some("EN")), Language::En);
    }

    #[test]
    fn test_language_from_telegram_tag() {
        assert_eq!(language_from_telegram(Some("ar-SA")), Language::Ar);
        assert_eq!(language_from_telegram(Some("en-US")), Language::En);
        assert_eq!(language_from_telegram(None), Language::En);
    }
}
