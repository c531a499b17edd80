use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Tokens are refreshed this long before the provider says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Caches a provider bearer token until shortly before it expires.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    token: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl TokenCache {
    pub fn get(&self) -> Option<String> {
        let guard = self.token.lock().ok()?;
        match guard.as_ref() {
            Some((token, expires)) if *expires > Utc::now() => Some(token.clone()),
            _ => None,
        }
    }

    pub fn store(&self, token: &str, expires_in_secs: i64) {
        let expires = Utc::now() + Duration::seconds((expires_in_secs - EXPIRY_MARGIN_SECS).max(0));
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some((token.to_string(), expires));
        }
    }
}

/// Providers return `expires_in` either as a number or as a numeric string.
pub(crate) fn parse_expiry(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0),
        serde_json::Value::String(s) => s.parse().unwrap_or(0),
        _ => 0,
    }
}
