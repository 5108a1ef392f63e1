// src/error.rs
//! Error taxonomy for a check run. None of these abort a run: they are
//! collected into run/dispatch status and rendered by whoever owns the UI.

use std::time::Duration;

use thiserror::Error;

use crate::model::TrackedKind;
use crate::notify::Channel;

/// The external update source failed for one kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceFetchError {
    #[error("{kind} update source timed out after {after:?}")]
    Timeout { kind: TrackedKind, after: Duration },
    #[error("{kind} update source unavailable: {reason}")]
    Unavailable { kind: TrackedKind, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("loading {kind} ledger section failed: {reason}")]
pub struct LedgerLoadError {
    pub kind: TrackedKind,
    pub reason: String,
}

/// Saving a ledger section failed after change records were computed. The
/// records are still reported, so the same update may surface again next run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("persisting {kind} ledger section failed: {reason}")]
pub struct LedgerPersistError {
    pub kind: TrackedKind,
    pub reason: String,
}

/// Per-kind detection failure; that kind contributes nothing this run and
/// its ledger section is left untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error(transparent)]
    Source(#[from] SourceFetchError),
    #[error(transparent)]
    Ledger(#[from] LedgerLoadError),
}

/// An enabled channel lacks, or has malformed, required settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{channel} is enabled but `{field}` is empty")]
    Missing {
        channel: Channel,
        field: &'static str,
    },
    #[error("{channel} `{field}` has an invalid email address: {value}")]
    InvalidAddress {
        channel: Channel,
        field: &'static str,
        value: String,
    },
    #[error("{channel} webhook url is not a valid http(s) url: {value}")]
    InvalidWebhookUrl { channel: Channel, value: String },
    #[error("{channel} channel override {value:?} must start with # or @ and contain no spaces")]
    InvalidChannelOverride { channel: Channel, value: String },
}

/// Delivery through an external transport failed. Not retried here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("{channel} delivery timed out after {after:?}")]
    Timeout { channel: Channel, after: Duration },
    #[error("{channel} transport is not configured")]
    NotConfigured { channel: Channel },
    #[error("{channel} delivery failed: {reason}")]
    Failed { channel: Channel, reason: String },
}

impl TransportError {
    pub fn failed(channel: Channel, err: anyhow::Error) -> Self {
        TransportError::Failed {
            channel,
            reason: format!("{err:#}"),
        }
    }
}
