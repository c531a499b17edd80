use std::sync::Arc;

use duka_common::Money;
use log::*;
use reqwest::Client;

use crate::{
    config::AirtelConfig,
    data_objects::{
        AccessTokenResponse,
        AirtelPaymentRequest,
        AirtelPaymentResponse,
        AirtelSubscriber,
        AirtelTokenRequest,
        AirtelTransactionRequest,
    },
    helpers::{execute, normalize_phone},
    token::{parse_expiry, TokenCache},
    MobileMoneyApiError,
};

/// Client for the Airtel Africa merchant collections API.
#[derive(Clone)]
pub struct AirtelApi {
    config: AirtelConfig,
    client: Arc<Client>,
    token: Arc<TokenCache>,
}

impl AirtelApi {
    pub fn new(config: AirtelConfig) -> Result<Self, MobileMoneyApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MobileMoneyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(TokenCache::default()) })
    }

    pub fn config(&self) -> &AirtelConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn access_token(&self) -> Result<String, MobileMoneyApiError> {
        if let Some(token) = self.token.get() {
            return Ok(token);
        }
        debug!("Requesting a new Airtel access token");
        let body = AirtelTokenRequest {
            client_id: self.config.client_id.reveal().clone(),
            client_secret: self.config.client_secret.reveal().clone(),
            grant_type: "client_credentials".to_string(),
        };
        let req = self.client.post(self.url("/auth/oauth2/token")).json(&body);
        let response = execute::<AccessTokenResponse>(req).await?;
        self.token.store(&response.access_token, parse_expiry(&response.expires_in));
        Ok(response.access_token)
    }

    /// Requests a collection from the subscriber. `transaction_id` is our own reference and comes back in the
    /// callback.
    pub async fn initiate_payment(
        &self,
        phone: &str,
        amount: Money,
        reference: &str,
        transaction_id: &str,
    ) -> Result<AirtelPaymentResponse, MobileMoneyApiError> {
        let msisdn = normalize_phone(phone, &self.config.country_code)?;
        let token = self.access_token().await?;
        let body = AirtelPaymentRequest {
            reference: reference.to_string(),
            subscriber: AirtelSubscriber {
                country: self.config.country.clone(),
                currency: self.config.currency.clone(),
                msisdn,
            },
            transaction: AirtelTransactionRequest {
                amount: amount.as_f64(),
                country: self.config.country.clone(),
                currency: self.config.currency.clone(),
                id: transaction_id.to_string(),
            },
        };
        let req = self
            .client
            .post(self.url("/merchant/v1/payments/"))
            .bearer_auth(token)
            .header("X-Country", self.config.country.as_str())
            .header("X-Currency", self.config.currency.as_str())
            .json(&body);
        let response = execute::<AirtelPaymentResponse>(req).await?;
        if !response.status.success {
            warn!("Airtel declined the payment request: {} {}", response.status.code, response.status.message);
            return Err(MobileMoneyApiError::Rejected {
                code: response.status.code,
                message: response.status.message,
            });
        }
        info!("Airtel payment request {transaction_id} accepted");
        Ok(response)
    }
}
