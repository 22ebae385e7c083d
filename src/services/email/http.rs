use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Email, Mailer};

/// Transactional email over a JSON HTTP API (Resend-style `POST /emails`).
pub struct HttpMailer {
    api_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            api_url,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, email: &Email) -> anyhow::Result<()> {
        self.client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": email.subject,
                "text": email.body,
            }))
            .send()
            .await
            .context("failed to call email API")?
            .error_for_status()
            .context("email API returned error")?;

        Ok(())
    }
}
