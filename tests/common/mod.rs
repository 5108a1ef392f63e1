// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use updates_notifier::error::TransportError;
use updates_notifier::ledger::{LedgerSection, MemoryStore, NotificationLedger};
use updates_notifier::{CandidateUpdate, Channel, LedgerStore, Transport, TrackedKind, UpdateSource};

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, hour, 0, 0).unwrap()
}

pub fn core(current: &str, available: &str) -> CandidateUpdate {
    CandidateUpdate::new("", current, available)
}

pub fn item(id: &str, current: &str, available: &str) -> CandidateUpdate {
    CandidateUpdate::new(id, current, available).named(id.to_uppercase())
}

/// Memory store whose saves can be made to fail, counting save calls.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_saves: AtomicBool,
    pub fail_loads: AtomicBool,
    pub saves: AtomicUsize,
}

impl FlakyStore {
    pub fn with(doc: NotificationLedger) -> Self {
        Self {
            inner: MemoryStore::new(doc),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> NotificationLedger {
        self.inner.snapshot()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LedgerStore for FlakyStore {
    async fn load(&self, kind: TrackedKind) -> Result<LedgerSection> {
        if self.fail_loads.load(Ordering::SeqCst) {
            anyhow::bail!("storage offline");
        }
        self.inner.load(kind).await
    }

    async fn save(&self, kind: TrackedKind, section: &LedgerSection) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(kind, section).await
    }

    async fn record_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.inner.record_check(at).await
    }

    async fn last_check(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner.last_check().await
    }
}

/// Source that never answers within any sane timeout.
pub struct StalledSource;

#[async_trait::async_trait]
impl UpdateSource for StalledSource {
    async fn fetch_candidates(&self, _kind: TrackedKind) -> Result<Vec<CandidateUpdate>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

/// Records every delivery; channels listed in `failing` return an error.
#[derive(Default, Clone)]
pub struct RecordingTransport {
    pub sent: Arc<Mutex<Vec<(Channel, String)>>>,
    pub failing: Vec<Channel>,
    pub delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn failing(channels: &[Channel]) -> Self {
        Self {
            failing: channels.to_vec(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(Channel, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn deliver(&self, channel: Channel, message: &str) -> Result<(), TransportError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.failing.contains(&channel) {
            return Err(TransportError::Failed {
                channel,
                reason: "502 bad gateway".into(),
            });
        }
        self.sent.lock().unwrap().push((channel, message.to_string()));
        Ok(())
    }
}
