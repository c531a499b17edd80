use std::sync::Arc;

use chrono::Utc;
use duka_common::Money;
use log::*;
use reqwest::{header, Client};

use crate::{
    config::MpesaConfig,
    data_objects::{AccessTokenResponse, StkPushRequest, StkPushResponse},
    helpers::{basic_auth, execute, mpesa_password, mpesa_timestamp, normalize_phone},
    token::{parse_expiry, TokenCache},
    MobileMoneyApiError,
};

/// Client for the Daraja STK push ("Lipa na M-Pesa online") API.
#[derive(Clone)]
pub struct MpesaApi {
    config: MpesaConfig,
    client: Arc<Client>,
    token: Arc<TokenCache>,
}

impl MpesaApi {
    pub fn new(config: MpesaConfig) -> Result<Self, MobileMoneyApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MobileMoneyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(TokenCache::default()) })
    }

    pub fn config(&self) -> &MpesaConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn access_token(&self) -> Result<String, MobileMoneyApiError> {
        if let Some(token) = self.token.get() {
            return Ok(token);
        }
        debug!("Requesting a new M-Pesa access token");
        let auth = basic_auth(self.config.consumer_key.reveal(), self.config.consumer_secret.reveal());
        let req = self
            .client
            .get(self.url("/oauth/v1/generate"))
            .query(&[("grant_type", "client_credentials")])
            .header(header::AUTHORIZATION, auth);
        let response = execute::<AccessTokenResponse>(req).await?;
        self.token.store(&response.access_token, parse_expiry(&response.expires_in));
        Ok(response.access_token)
    }

    /// Pushes a payment prompt to the subscriber's handset. M-Pesa only accepts whole currency units, so any
    /// fractional part of `amount` is dropped.
    pub async fn stk_push(
        &self,
        phone: &str,
        amount: Money,
        description: &str,
    ) -> Result<StkPushResponse, MobileMoneyApiError> {
        let phone = normalize_phone(phone, &self.config.country_code)?;
        if amount.cents() % 100 != 0 {
            warn!("M-Pesa cannot charge fractions. {amount} will be charged as {}", amount.whole_units());
        }
        let token = self.access_token().await?;
        let timestamp = mpesa_timestamp(Utc::now());
        let password = mpesa_password(&self.config.shortcode, self.config.passkey.reveal(), &timestamp);
        let body = StkPushRequest {
            business_short_code: self.config.shortcode.clone(),
            password,
            timestamp,
            transaction_type: "CustomerPayBillOnline".to_string(),
            amount: amount.whole_units(),
            party_a: phone.clone(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone,
            callback_url: self.config.callback_url.clone(),
            account_reference: self.config.account_reference.clone(),
            transaction_desc: description.to_string(),
        };
        trace!("Sending STK push for {amount} to {}", body.phone_number);
        let req = self.client.post(self.url("/mpesa/stkpush/v1/processrequest")).bearer_auth(token).json(&body);
        let response = execute::<StkPushResponse>(req).await?;
        if !response.is_accepted() {
            warn!("M-Pesa declined the STK push: {} {}", response.response_code, response.response_description);
            return Err(MobileMoneyApiError::Rejected {
                code: response.response_code,
                message: response.response_description,
            });
        }
        info!("STK push accepted. CheckoutRequestID: {}", response.checkout_request_id);
        Ok(response)
    }
}
