// src/ledger.rs
//! Notification ledger: the last version already notified-about per tracked
//! item, and the stores that persist it.
//!
//! Each kind owns a disjoint section. Sections are loaded and saved
//! independently; there is no cross-kind transaction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};

use crate::error::{LedgerLoadError, LedgerPersistError};
use crate::model::TrackedKind;

pub const DEFAULT_LEDGER_PATH: &str = "state/notified.json";

/// One kind's slice of the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerSection {
    /// Last-notified core version; empty means "not yet notified".
    Core(String),
    /// identifier -> last-notified version.
    Items(BTreeMap<String, String>),
}

impl LedgerSection {
    pub fn empty_for(kind: TrackedKind) -> Self {
        match kind {
            TrackedKind::Core => LedgerSection::Core(String::new()),
            TrackedKind::Plugin | TrackedKind::Theme => LedgerSection::Items(BTreeMap::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LedgerSection::Core(v) => v.is_empty(),
            LedgerSection::Items(m) => m.is_empty(),
        }
    }

    /// Recorded version for `identifier`. Core ignores the identifier.
    pub fn notified_version(&self, identifier: &str) -> Option<&str> {
        match self {
            LedgerSection::Core(v) if v.is_empty() => None,
            LedgerSection::Core(v) => Some(v.as_str()),
            LedgerSection::Items(m) => m.get(identifier).map(String::as_str),
        }
    }

    pub fn record(&mut self, identifier: &str, version: &str) {
        match self {
            LedgerSection::Core(v) => *v = version.to_string(),
            LedgerSection::Items(m) => {
                m.insert(identifier.to_string(), version.to_string());
            }
        }
    }

    /// Drop item entries whose identifier fails `keep`. Returns how many
    /// entries were removed. No-op for core.
    pub fn retain_identifiers<F: Fn(&str) -> bool>(&mut self, keep: F) -> usize {
        match self {
            LedgerSection::Core(_) => 0,
            LedgerSection::Items(m) => {
                let before = m.len();
                m.retain(|id, _| keep(id));
                before - m.len()
            }
        }
    }
}

/// The whole persisted ledger document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLedger {
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub plugin: BTreeMap<String, String>,
    #[serde(default)]
    pub theme: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check_time: Option<DateTime<Utc>>,
}

impl NotificationLedger {
    pub fn get_notified(&self, kind: TrackedKind) -> LedgerSection {
        match kind {
            TrackedKind::Core => LedgerSection::Core(self.core.clone()),
            TrackedKind::Plugin => LedgerSection::Items(self.plugin.clone()),
            TrackedKind::Theme => LedgerSection::Items(self.theme.clone()),
        }
    }

    /// Replace one kind's section. A section shape that does not match the
    /// kind is coerced to that kind's empty value.
    pub fn set_notified(&mut self, kind: TrackedKind, section: LedgerSection) {
        match (kind, section) {
            (TrackedKind::Core, LedgerSection::Core(v)) => self.core = v,
            (TrackedKind::Plugin, LedgerSection::Items(m)) => self.plugin = m,
            (TrackedKind::Theme, LedgerSection::Items(m)) => self.theme = m,
            (TrackedKind::Core, _) => self.core.clear(),
            (TrackedKind::Plugin, _) => self.plugin.clear(),
            (TrackedKind::Theme, _) => self.theme.clear(),
        }
    }
}

/// Backing storage for the ledger. Must be read-your-writes consistent
/// within a process.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load(&self, kind: TrackedKind) -> Result<LedgerSection>;
    async fn save(&self, kind: TrackedKind, section: &LedgerSection) -> Result<()>;
    async fn record_check(&self, at: DateTime<Utc>) -> Result<()>;
    async fn last_check(&self) -> Result<Option<DateTime<Utc>>>;
}

/// Typed accessor over a store; maps storage failures into the ledger error
/// types so the detector can apply its reporting policy.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn get_notified(&self, kind: TrackedKind) -> Result<LedgerSection, LedgerLoadError> {
        self.store.load(kind).await.map_err(|e| LedgerLoadError {
            kind,
            reason: format!("{e:#}"),
        })
    }

    pub async fn set_notified(
        &self,
        kind: TrackedKind,
        section: &LedgerSection,
    ) -> Result<(), LedgerPersistError> {
        self.store.save(kind, section).await.map_err(|e| {
            tracing::warn!(target: "ledger", %kind, error = %format!("{e:#}"), "ledger save failed");
            LedgerPersistError {
                kind,
                reason: format!("{e:#}"),
            }
        })
    }

    pub async fn record_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.store.record_check(at).await
    }

    pub async fn last_check(&self) -> Result<Option<DateTime<Utc>>> {
        self.store.last_check().await
    }
}

/// Ledger persisted as one pretty-printed JSON document.
///
/// Writes go to a sibling temp file and are renamed into place. Section
/// saves are read-modify-write of the whole document, serialised by an
/// internal lock so concurrent detectors never lose each other's section.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_doc(&self) -> Result<NotificationLedger> {
        match fs::read_to_string(&self.path).await {
            Ok(s) if s.trim().is_empty() => Ok(NotificationLedger::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parse ledger {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NotificationLedger::default()),
            Err(e) => Err(e).with_context(|| format!("read ledger {}", self.path.display())),
        }
    }

    async fn write_doc(&self, doc: &NotificationLedger) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create ledger dir {}", dir.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(doc).context("serialize ledger")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace ledger {}", self.path.display()))?;
        Ok(())
    }

    async fn update<F: FnOnce(&mut NotificationLedger)>(&self, f: F) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut doc = self.read_doc().await?;
        f(&mut doc);
        self.write_doc(&doc).await
    }
}

#[async_trait::async_trait]
impl LedgerStore for JsonFileStore {
    async fn load(&self, kind: TrackedKind) -> Result<LedgerSection> {
        let _guard = self.lock.lock().await;
        Ok(self.read_doc().await?.get_notified(kind))
    }

    async fn save(&self, kind: TrackedKind, section: &LedgerSection) -> Result<()> {
        let section = section.clone();
        self.update(move |doc| doc.set_notified(kind, section)).await
    }

    async fn record_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.update(move |doc| doc.last_check_time = Some(at)).await
    }

    async fn last_check(&self) -> Result<Option<DateTime<Utc>>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_doc().await?.last_check_time)
    }
}

/// In-process ledger store.
#[derive(Default)]
pub struct MemoryStore {
    doc: std::sync::Mutex<NotificationLedger>,
}

impl MemoryStore {
    pub fn new(doc: NotificationLedger) -> Self {
        Self {
            doc: std::sync::Mutex::new(doc),
        }
    }

    pub fn snapshot(&self) -> NotificationLedger {
        self.doc
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn with_doc<T>(&self, f: impl FnOnce(&mut NotificationLedger) -> T) -> T {
        let mut guard = self.doc.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryStore {
    async fn load(&self, kind: TrackedKind) -> Result<LedgerSection> {
        Ok(self.with_doc(|doc| doc.get_notified(kind)))
    }

    async fn save(&self, kind: TrackedKind, section: &LedgerSection) -> Result<()> {
        self.with_doc(|doc| doc.set_notified(kind, section.clone()));
        Ok(())
    }

    async fn record_check(&self, at: DateTime<Utc>) -> Result<()> {
        self.with_doc(|doc| doc.last_check_time = Some(at));
        Ok(())
    }

    async fn last_check(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.with_doc(|doc| doc.last_check_time))
    }
}
