//! Stripe payment-intent client.
//!
//! Only covers authorization creation: the client-side checkout
//! completes the charge directly with Stripe using the returned
//! `client_secret`, so nothing here mutates local state.

use crate::config::StripeConfig;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::error::AppError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("payment processor unreachable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("payment processor rejected the request: {0}")]
    Rejected(String),
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::InvalidAmount(amount) => {
                AppError::BadRequest(anyhow::anyhow!("invalid price: {}", amount))
            }
            other => AppError::UpstreamFailure(anyhow::Error::new(other)),
        }
    }
}

/// The slice of Stripe's payment-intent entity we consume.
#[derive(Debug, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Major-unit amount to integer minor units (cents), rounded.
    pub fn minor_units(amount: f64) -> i64 {
        (amount * 100.0).round() as i64
    }

    /// Create a card payment intent for `amount` major units and return
    /// the confirmation secret for client-side checkout.
    ///
    /// Fails with `InvalidAmount` before any network call when the
    /// amount is zero, negative, or not a number. Processor failures
    /// surface directly; there is no retry here.
    pub async fn create_payment_intent(
        &self,
        amount: f64,
        currency: &str,
    ) -> Result<PaymentIntent, StripeError> {
        if !(amount > 0.0) {
            return Err(StripeError::InvalidAmount(amount));
        }

        let minor_units = Self::minor_units(amount);
        let params = [
            ("amount", minor_units.to_string()),
            ("currency", currency.to_string()),
            ("payment_method_types[]", "card".to_string()),
        ];

        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe create_payment_intent response");

        if status.is_success() {
            let intent: PaymentIntent = serde_json::from_str(&body)
                .map_err(|e| StripeError::Rejected(format!("malformed processor response: {}", e)))?;
            tracing::info!(
                intent_id = %intent.id,
                amount = minor_units,
                currency = %currency,
                "Stripe payment intent created"
            );
            Ok(intent)
        } else {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_owned)
                })
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!(status = %status, message = %message, "Stripe rejected payment intent");
            Err(StripeError::Rejected(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_client() -> StripeClient {
        StripeClient::new(StripeConfig {
            secret_key: Secret::new("sk_test_123".to_string()),
            api_base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn amounts_round_to_minor_units() {
        assert_eq!(StripeClient::minor_units(12.50), 1250);
        assert_eq!(StripeClient::minor_units(0.999), 100);
        assert_eq!(StripeClient::minor_units(10.0), 1000);
    }

    #[tokio::test]
    async fn zero_amount_is_rejected_before_any_call() {
        let err = test_client()
            .create_payment_intent(0.0, "usd")
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn negative_amount_is_rejected_before_any_call() {
        let err = test_client()
            .create_payment_intent(-5.0, "usd")
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::InvalidAmount(_)));
    }
}
