// src/config/validate.rs
//! Per-channel configuration checks used by the dispatch gate.

use lettre::message::Mailbox;
use lettre::Address;

use super::{EmailSettings, Settings, SlackSettings};
use crate::error::ConfigurationError;
use crate::notify::Channel;

pub fn check_email(cfg: &EmailSettings) -> Result<(), ConfigurationError> {
    let channel = Channel::Email;
    let recipients = cfg.recipients();
    if recipients.is_empty() {
        return Err(ConfigurationError::Missing {
            channel,
            field: "notify_to",
        });
    }
    if let Some(bad) = recipients.iter().find(|r| r.parse::<Address>().is_err()) {
        return Err(ConfigurationError::InvalidAddress {
            channel,
            field: "notify_to",
            value: bad.to_string(),
        });
    }
    let from = cfg.notify_from.trim();
    if !from.is_empty() && from.parse::<Mailbox>().is_err() {
        return Err(ConfigurationError::InvalidAddress {
            channel,
            field: "notify_from",
            value: from.to_string(),
        });
    }
    Ok(())
}

pub fn check_slack(cfg: &SlackSettings) -> Result<(), ConfigurationError> {
    let channel = Channel::Slack;
    let url = cfg.webhook_url.trim();
    if url.is_empty() {
        return Err(ConfigurationError::Missing {
            channel,
            field: "webhook_url",
        });
    }
    let parsed_ok = reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !parsed_ok {
        return Err(ConfigurationError::InvalidWebhookUrl {
            channel,
            value: url.to_string(),
        });
    }
    let over = cfg.channel_override.trim();
    if !over.is_empty()
        && (!(over.starts_with('#') || over.starts_with('@')) || over.contains(char::is_whitespace))
    {
        return Err(ConfigurationError::InvalidChannelOverride {
            channel,
            value: over.to_string(),
        });
    }
    Ok(())
}

/// Check one channel's required settings, regardless of its enabled flag.
pub fn check_channel(channel: Channel, settings: &Settings) -> Result<(), ConfigurationError> {
    match channel {
        Channel::Email => check_email(&settings.email),
        Channel::Slack => check_slack(&settings.slack),
    }
}

/// Problems with every enabled channel, for surfacing at startup.
pub fn issues(settings: &Settings) -> Vec<ConfigurationError> {
    Channel::ALL
        .into_iter()
        .filter(|c| c.is_enabled(settings))
        .filter_map(|c| check_channel(c, settings).err())
        .collect()
}
