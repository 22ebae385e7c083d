use anyhow::Context;
use async_trait::async_trait;

use super::{CheckoutRequest, CheckoutSession, PaymentProvider};

/// Hosted checkout page provider (Stripe Checkout Sessions API).
pub struct HostedCheckoutProvider {
    api_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl HostedCheckoutProvider {
    pub fn new(api_url: String, secret_key: String) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentProvider for HostedCheckoutProvider {
    async fn create_checkout(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        let mut form: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("client_reference_id", request.booking_id.clone()),
            ("metadata[booking_id]", request.booking_id.clone()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", request.currency.clone()),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
        ];
        if let Some(email) = &request.customer_email {
            form.push(("customer_email", email.clone()));
        }

        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .context("failed to call checkout API")?;

        let status = resp.status();
        let data: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse checkout response")?;

        if !status.is_success() {
            anyhow::bail!("checkout API error ({}): {}", status, data);
        }

        let id = data["id"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing id in checkout response"))?;
        let url = data["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("missing url in checkout response"))?;

        Ok(CheckoutSession {
            id: id.to_string(),
            url: url.to_string(),
        })
    }
}
