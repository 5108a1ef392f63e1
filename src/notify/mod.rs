// src/notify/mod.rs
//! Notification channels. The set is closed: a new channel is a new
//! [`Channel`] variant with its markup, config check and transport.

pub mod dispatch;
pub mod email;
pub mod slack;

use std::fmt;

use serde::Serialize;

use crate::config::Settings;
use crate::error::TransportError;
use crate::format::{self, Markup, SiteInfo};
use crate::model::AggregatedReport;

pub use dispatch::{ChannelOutcome, DispatchGate, DispatchSummary};
pub use email::EmailSender;
pub use slack::SlackNotifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Slack,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Slack];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Slack => "slack",
        }
    }

    pub fn markup(self) -> &'static Markup {
        match self {
            Channel::Email => &format::EMAIL_MARKUP,
            Channel::Slack => &format::SLACK_MARKUP,
        }
    }

    pub fn is_enabled(self, settings: &Settings) -> bool {
        match self {
            Channel::Email => settings.email.enabled,
            Channel::Slack => settings.slack.enabled,
        }
    }

    pub fn format(self, report: &AggregatedReport, site: &SiteInfo) -> String {
        format::render(report, site, self.markup())
    }

    pub fn format_test(self, site: &SiteInfo) -> String {
        format::render_test(site, self.markup())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External delivery for formatted messages. Retries, if any, belong to the
/// implementation; the gate calls once per run.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, channel: Channel, message: &str) -> Result<(), TransportError>;
}

/// Routes each channel to its concrete sender.
#[derive(Default)]
pub struct ChannelTransports {
    pub email: Option<EmailSender>,
    pub slack: Option<SlackNotifier>,
}

impl ChannelTransports {
    /// Build senders for every enabled channel whose settings are usable.
    /// Channels that cannot be built are left empty and reported by the gate.
    pub fn from_settings(settings: &Settings) -> Self {
        let email = if settings.email.enabled {
            match EmailSender::from_settings(settings) {
                Ok(sender) => Some(sender),
                Err(e) => {
                    tracing::warn!(target: "dispatch", error = %format!("{e:#}"), "email sender unavailable");
                    None
                }
            }
        } else {
            None
        };
        let slack = if settings.slack.enabled && !settings.slack.webhook_url.trim().is_empty() {
            Some(SlackNotifier::from_settings(&settings.slack))
        } else {
            None
        };
        Self { email, slack }
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransports {
    async fn deliver(&self, channel: Channel, message: &str) -> Result<(), TransportError> {
        match channel {
            Channel::Email => match &self.email {
                Some(sender) => sender
                    .send_message(message)
                    .await
                    .map_err(|e| TransportError::failed(channel, e)),
                None => Err(TransportError::NotConfigured { channel }),
            },
            Channel::Slack => match &self.slack {
                Some(notifier) => notifier
                    .send_message(message)
                    .await
                    .map_err(|e| TransportError::failed(channel, e)),
                None => Err(TransportError::NotConfigured { channel }),
            },
        }
    }
}
