// src/notify/dispatch.rs
//! Dispatch gate: per channel, skip when disabled, refuse when misconfigured,
//! otherwise format and hand off to the transport exactly once.

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Channel, Transport};
use crate::config::{validate, Settings};
use crate::error::{ConfigurationError, TransportError};
use crate::format::SiteInfo;
use crate::model::AggregatedReport;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Disabled,
    Misconfigured(ConfigurationError),
    Delivered,
    Failed(TransportError),
}

impl ChannelOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelOutcome::Disabled => "disabled",
            ChannelOutcome::Misconfigured(_) => "misconfigured",
            ChannelOutcome::Delivered => "delivered",
            ChannelOutcome::Failed(_) => "failed",
        }
    }
}

impl Serialize for ChannelOutcome {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            ChannelOutcome::Misconfigured(e) => s.serialize_str(&format!("misconfigured: {e}")),
            ChannelOutcome::Failed(e) => s.serialize_str(&format!("failed: {e}")),
            other => s.serialize_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub outcomes: BTreeMap<Channel, ChannelOutcome>,
}

impl DispatchSummary {
    pub fn outcome(&self, channel: Channel) -> Option<&ChannelOutcome> {
        self.outcomes.get(&channel)
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, ChannelOutcome::Delivered))
            .count()
    }

    pub fn configuration_warnings(&self) -> Vec<&ConfigurationError> {
        self.outcomes
            .values()
            .filter_map(|o| match o {
                ChannelOutcome::Misconfigured(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

pub struct DispatchGate<'a> {
    settings: &'a Settings,
    site: SiteInfo,
    transport: &'a dyn Transport,
    timeout: Duration,
}

impl<'a> DispatchGate<'a> {
    pub fn new(settings: &'a Settings, transport: &'a dyn Transport) -> Self {
        Self {
            settings,
            site: settings.site_info(),
            transport,
            timeout: settings.delivery_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deliver `report` over every enabled channel. The caller decides
    /// whether an empty report is worth sending.
    pub async fn dispatch(&self, report: &AggregatedReport) -> DispatchSummary {
        self.run(|c| c.format(report, &self.site)).await
    }

    /// Deliver the fixed test message over every enabled channel.
    pub async fn send_test(&self) -> DispatchSummary {
        self.run(|c| c.format_test(&self.site)).await
    }

    async fn run<F: Fn(Channel) -> String>(&self, build: F) -> DispatchSummary {
        ensure_metrics_described();
        let mut summary = DispatchSummary::default();
        for channel in Channel::ALL {
            let outcome = self.gate(channel, &build).await;
            counter!(
                "updates_deliveries_total",
                "channel" => channel.as_str(),
                "result" => outcome.label()
            )
            .increment(1);
            summary.outcomes.insert(channel, outcome);
        }
        summary
    }

    async fn gate<F: Fn(Channel) -> String>(&self, channel: Channel, build: &F) -> ChannelOutcome {
        if !channel.is_enabled(self.settings) {
            debug!(target: "dispatch", %channel, "channel disabled");
            return ChannelOutcome::Disabled;
        }
        if let Err(e) = validate::check_channel(channel, self.settings) {
            warn!(target: "dispatch", %channel, error = %e, "channel enabled but misconfigured; skipped");
            return ChannelOutcome::Misconfigured(e);
        }

        let message = build(channel);
        match tokio::time::timeout(self.timeout, self.transport.deliver(channel, &message)).await {
            Ok(Ok(())) => {
                info!(target: "dispatch", %channel, bytes = message.len(), "notification delivered");
                ChannelOutcome::Delivered
            }
            Ok(Err(e)) => {
                warn!(target: "dispatch", %channel, error = %e, "delivery failed");
                ChannelOutcome::Failed(e)
            }
            Err(_) => {
                let e = TransportError::Timeout {
                    channel,
                    after: self.timeout,
                };
                warn!(target: "dispatch", %channel, error = %e, "delivery timed out");
                ChannelOutcome::Failed(e)
            }
        }
    }
}
