use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use crate::config::SlackSettings;

pub const SLACK_USERNAME: &str = "Updates Notifier";
pub const SLACK_ICON: &str = ":robot_face:";

#[derive(Debug, Serialize, PartialEq)]
struct SlackPayload<'a> {
    username: &'a str,
    icon_emoji: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

/// Incoming-webhook poster.
pub struct SlackNotifier {
    webhook_url: String,
    channel_override: Option<String>,
    client: Client,
}

impl SlackNotifier {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            channel_override: None,
            client: Client::new(),
        }
    }

    pub fn from_settings(cfg: &SlackSettings) -> Self {
        let over = cfg.channel_override.trim();
        Self::new(cfg.webhook_url.trim().to_string())
            .with_channel((!over.is_empty()).then(|| over.to_string()))
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel_override = channel;
        self
    }

    fn payload<'a>(&'a self, text: &'a str) -> SlackPayload<'a> {
        SlackPayload {
            username: SLACK_USERNAME,
            icon_emoji: SLACK_ICON,
            text,
            channel: self.channel_override.as_deref(),
        }
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        self.client
            .post(&self.webhook_url)
            .json(&self.payload(text))
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}
