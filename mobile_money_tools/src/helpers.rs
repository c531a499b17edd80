use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use log::*;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use crate::MobileMoneyApiError;

/// Normalises a subscriber phone number to the international form the providers expect, without a leading `+`.
///
/// `0712 345-678` and `+254712345678` both become `254712345678`. Numbers that do not already carry the country
/// code get it prepended.
pub fn normalize_phone(phone: &str, country_code: &str) -> Result<String, MobileMoneyApiError> {
    let cleaned = phone.trim().chars().filter(|c| !matches!(c, ' ' | '-')).collect::<String>();
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let normalized = if let Some(local) = cleaned.strip_prefix('0') {
        format!("{country_code}{local}")
    } else if cleaned.starts_with(country_code) {
        cleaned.to_string()
    } else {
        format!("{country_code}{cleaned}")
    };
    let local_len = normalized.len() - country_code.len();
    if !normalized.chars().all(|c| c.is_ascii_digit()) || !(7..=12).contains(&local_len) {
        return Err(MobileMoneyApiError::InvalidPhoneNumber(phone.to_string()));
    }
    Ok(normalized)
}

/// The `Timestamp` field for STK push requests.
pub fn mpesa_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// The STK push password is `base64(shortcode + passkey + timestamp)`.
pub fn mpesa_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

/// Sends the request and deserializes a 2xx JSON body. Anything else becomes an error.
pub(crate) async fn execute<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, MobileMoneyApiError> {
    let response = req.send().await.map_err(|e| MobileMoneyApiError::RestRequestError(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        trace!("REST query successful. {status}");
        response.json::<T>().await.map_err(|e| MobileMoneyApiError::JsonError(e.to_string()))
    } else {
        let message = response.text().await.map_err(|e| MobileMoneyApiError::RestResponseError(e.to_string()))?;
        debug!("REST query failed. {status}. {message}");
        Err(MobileMoneyApiError::QueryError { status: status.as_u16(), message })
    }
}
