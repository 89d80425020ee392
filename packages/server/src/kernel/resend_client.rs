use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{BaseEmailService, EmailMessage};

const API_URL: &str = "https://api.resend.com/emails";
const FROM_ADDRESS: &str = "CafeRoam <noreply@caferoam.tw>";

/// Resend transactional email client
pub struct ResendClient {
    api_key: String,
    client: reqwest::Client,
}

/// Resend send request
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

impl ResendClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }
}

#[async_trait]
impl BaseEmailService for ResendClient {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let request = SendRequest {
            from: FROM_ADDRESS,
            to: vec![&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send Resend request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Resend API error {}: {}", status, body);
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");

        Ok(())
    }
}
