//! SMS notifier backed by the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::notifier::{Notifier, NotifierError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://api.twilio.com".to_string()
}

impl TwilioConfig {
    pub fn validate(&self) -> Result<(), NotifierError> {
        let fields = [
            ("account_sid", &self.account_sid),
            ("auth_token", &self.auth_token),
            ("from_number", &self.from_number),
            ("to_number", &self.to_number),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(NotifierError::Config(format!("{} is empty", name)));
            }
        }
        Ok(())
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }
}

/// Sends the summary as one SMS.
pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, NotifierError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotifierError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifierError> {
        let form = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form[..])
            .send()
            .await
            .map_err(|e| NotifierError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %self.config.to_number, "SMS sent");
        Ok(())
    }
}
