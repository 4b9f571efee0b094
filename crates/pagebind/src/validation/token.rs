//! `{TOKEN}` expansion for validation values.
//!
//! Built-in tokens: `{NOW}`, `{TODAY}`, `{TODAY+N}`, `{TODAY-N}`, `{NOW+N}`
//! (offsets in days) and `{GUID}`. Any other token is looked up among saved
//! values, and is left in place when unknown.

use chrono::{Duration, Local, NaiveDateTime};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[allow(clippy::expect_used)]
fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("token pattern is valid"))
}

#[allow(clippy::expect_used)]
fn offset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?i)(NOW|TODAY)\s*(?:([+-])\s*(\d+))?$").expect("offset pattern is valid")
    })
}

/// Saved token values plus the built-in generators
#[derive(Debug, Clone, Default)]
pub struct TokenManager {
    saved: Arc<RwLock<HashMap<String, String>>>,
}

impl TokenManager {
    /// Create an empty token manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from name/value pairs
    #[must_use]
    pub fn with_tokens<I, K, V>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let manager = Self::new();
        for (k, v) in tokens {
            manager.set_token(k, v);
        }
        manager
    }

    /// Save a named value; names are case-insensitive
    pub fn set_token(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().trim().to_lowercase();
        self.saved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value.into());
    }

    /// Saved value for a name
    #[must_use]
    pub fn get_token(&self, name: &str) -> Option<String> {
        self.saved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.trim().to_lowercase())
            .cloned()
    }

    /// Replace every known `{TOKEN}` in `input`
    #[must_use]
    pub fn expand(&self, input: &str) -> String {
        if !input.contains('{') {
            return input.to_string();
        }
        token_pattern()
            .replace_all(input, |caps: &Captures<'_>| {
                let token = &caps[1];
                self.resolve(token).unwrap_or_else(|| {
                    tracing::warn!(token, "leaving unknown token in place");
                    caps[0].to_string()
                })
            })
            .into_owned()
    }

    fn resolve(&self, token: &str) -> Option<String> {
        let trimmed = token.trim();
        if trimmed.eq_ignore_ascii_case("guid") {
            return Some(uuid::Uuid::new_v4().to_string());
        }
        if let Some(caps) = offset_pattern().captures(trimmed) {
            return Some(Self::relative_time(&caps, Local::now().naive_local()));
        }
        self.get_token(trimmed)
    }

    fn relative_time(caps: &Captures<'_>, now: NaiveDateTime) -> String {
        let days = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0);
        let days = if caps.get(2).is_some_and(|m| m.as_str() == "-") {
            -days
        } else {
            days
        };
        let at = now
            .checked_add_signed(Duration::days(days))
            .unwrap_or(now);
        if caps[1].eq_ignore_ascii_case("today") {
            at.format(DATE_FORMAT).to_string()
        } else {
            at.format(DATE_TIME_FORMAT).to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::typed::parse_date;

    #[test]
    fn test_plain_text_is_untouched() {
        let tokens = TokenManager::new();
        assert_eq!(tokens.expand("hello"), "hello");
        assert_eq!(tokens.expand(""), "");
    }

    #[test]
    fn test_saved_tokens_are_case_insensitive() {
        let tokens = TokenManager::with_tokens([("UserName", "bob")]);
        assert_eq!(tokens.expand("hi {username}!"), "hi bob!");
        assert_eq!(tokens.get_token("USERNAME").as_deref(), Some("bob"));
    }

    #[test]
    fn test_unknown_tokens_are_left_in_place() {
        let tokens = TokenManager::new();
        assert_eq!(tokens.expand("{missing} value"), "{missing} value");
    }

    #[test]
    fn test_today_offsets_parse_as_dates() {
        let tokens = TokenManager::new();
        let today = parse_date(&tokens.expand("{TODAY}")).unwrap();
        let later = parse_date(&tokens.expand("{TODAY+3}")).unwrap();
        let earlier = parse_date(&tokens.expand("{today - 1}")).unwrap();
        assert_eq!((later - today).num_days(), 3);
        assert_eq!((today - earlier).num_days(), 1);
    }

    #[test]
    fn test_now_is_a_date_time() {
        let tokens = TokenManager::new();
        assert!(parse_date(&tokens.expand("{NOW}")).is_some());
    }

    #[test]
    fn test_guid_is_fresh_each_time() {
        let tokens = TokenManager::new();
        let a = tokens.expand("{GUID}");
        let b = tokens.expand("{guid}");
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
    }
}
