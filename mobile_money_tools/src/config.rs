use std::time::Duration;

use duka_common::Secret;
use log::*;

const MPESA_SANDBOX_URL: &str = "https://sandbox.safaricom.co.ke";
const MPESA_PRODUCTION_URL: &str = "https://api.safaricom.co.ke";
const AIRTEL_URL: &str = "https://openapiuat.airtel.africa";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default)]
pub struct MpesaConfig {
    pub base_url: String,
    pub consumer_key: Secret<String>,
    pub consumer_secret: Secret<String>,
    pub shortcode: String,
    pub passkey: Secret<String>,
    pub callback_url: String,
    pub account_reference: String,
    pub country_code: String,
    pub timeout: Duration,
}

impl MpesaConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = match std::env::var("DUKA_MPESA_BASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let env = std::env::var("DUKA_MPESA_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string());
                if env == "production" {
                    MPESA_PRODUCTION_URL.to_string()
                } else {
                    info!("🪛️ M-Pesa is running against the sandbox environment");
                    MPESA_SANDBOX_URL.to_string()
                }
            },
        };
        let consumer_key = Secret::new(std::env::var("DUKA_MPESA_CONSUMER_KEY").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_MPESA_CONSUMER_KEY not set, using (probably useless) default");
            String::default()
        }));
        let consumer_secret = Secret::new(std::env::var("DUKA_MPESA_CONSUMER_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_MPESA_CONSUMER_SECRET not set, using (probably useless) default");
            String::default()
        }));
        let shortcode = std::env::var("DUKA_MPESA_SHORTCODE").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_MPESA_SHORTCODE not set, using the sandbox shortcode 174379");
            "174379".to_string()
        });
        let passkey = Secret::new(std::env::var("DUKA_MPESA_PASSKEY").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_MPESA_PASSKEY not set, using (probably useless) default");
            String::default()
        }));
        let callback_url = std::env::var("DUKA_MPESA_CALLBACK_URL").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_MPESA_CALLBACK_URL not set. M-Pesa will not be able to reach this server.");
            "http://localhost:8360/callbacks/mpesa".to_string()
        });
        let account_reference = std::env::var("DUKA_MPESA_ACCOUNT_REFERENCE").unwrap_or_else(|_| "DUKA".to_string());
        let country_code = std::env::var("DUKA_COUNTRY_CODE").unwrap_or_else(|_| "254".to_string());
        Self {
            base_url,
            consumer_key,
            consumer_secret,
            shortcode,
            passkey,
            callback_url,
            account_reference,
            country_code,
            timeout: timeout_from_env(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AirtelConfig {
    pub base_url: String,
    pub client_id: Secret<String>,
    pub client_secret: Secret<String>,
    /// ISO country code sent in the `X-Country` header
    pub country: String,
    pub currency: String,
    pub country_code: String,
    pub timeout: Duration,
}

impl AirtelConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("DUKA_AIRTEL_BASE_URL").unwrap_or_else(|_| AIRTEL_URL.to_string());
        let client_id = Secret::new(std::env::var("DUKA_AIRTEL_CLIENT_ID").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_AIRTEL_CLIENT_ID not set, using (probably useless) default");
            String::default()
        }));
        let client_secret = Secret::new(std::env::var("DUKA_AIRTEL_CLIENT_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ DUKA_AIRTEL_CLIENT_SECRET not set, using (probably useless) default");
            String::default()
        }));
        let country = std::env::var("DUKA_AIRTEL_COUNTRY").unwrap_or_else(|_| "KE".to_string());
        let currency = std::env::var("DUKA_AIRTEL_CURRENCY").unwrap_or_else(|_| "KES".to_string());
        let country_code = std::env::var("DUKA_COUNTRY_CODE").unwrap_or_else(|_| "254".to_string());
        Self { base_url, client_id, client_secret, country, currency, country_code, timeout: timeout_from_env() }
    }
}

fn timeout_from_env() -> Duration {
    let secs = std::env::var("DUKA_GATEWAY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid DUKA_GATEWAY_TIMEOUT_SECS ({s}): {e}. Using the default"))
                .ok()
        })
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}
