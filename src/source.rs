// src/source.rs
//! External collaborators feeding the detectors: the update source and the
//! active-item oracle.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{CandidateUpdate, TrackedKind};

/// Supplies raw candidate updates per kind.
///
/// An empty vector means "nothing needs updating" and drives the ledger
/// reset; an `Err` means the source could not answer and leaves the ledger
/// untouched. Implementations must not conflate the two.
#[async_trait::async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_candidates(&self, kind: TrackedKind) -> Result<Vec<CandidateUpdate>>;
    fn name(&self) -> &'static str;
}

/// Host-environment view of what is installed and active.
pub trait ActiveItems: Send + Sync {
    fn is_plugin_active(&self, identifier: &str) -> bool;
    fn active_theme_identifier(&self) -> String;
}

/// Value-type oracle, typically fetched once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInventory {
    #[serde(default)]
    pub active_plugins: BTreeSet<String>,
    #[serde(default)]
    pub active_theme: String,
}

impl ActiveInventory {
    pub fn new<I, S>(plugins: I, theme: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_plugins: plugins.into_iter().map(Into::into).collect(),
            active_theme: theme.into(),
        }
    }
}

impl ActiveItems for ActiveInventory {
    fn is_plugin_active(&self, identifier: &str) -> bool {
        self.active_plugins.contains(identifier)
    }

    fn active_theme_identifier(&self) -> String {
        self.active_theme.clone()
    }
}

/// Fixed per-kind answers; useful for embedding and tests. A kind mapped to
/// `Err` simulates an unreachable source.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    answers: BTreeMap<TrackedKind, std::result::Result<Vec<CandidateUpdate>, String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: TrackedKind, candidates: Vec<CandidateUpdate>) -> Self {
        self.answers.insert(kind, Ok(candidates));
        self
    }

    pub fn failing(mut self, kind: TrackedKind, reason: impl Into<String>) -> Self {
        self.answers.insert(kind, Err(reason.into()));
        self
    }

    pub fn set(&mut self, kind: TrackedKind, candidates: Vec<CandidateUpdate>) {
        self.answers.insert(kind, Ok(candidates));
    }
}

#[async_trait::async_trait]
impl UpdateSource for StaticSource {
    async fn fetch_candidates(&self, kind: TrackedKind) -> Result<Vec<CandidateUpdate>> {
        match self.answers.get(&kind) {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(reason)) => anyhow::bail!("{reason}"),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Tolerant response shapes: a bare array, or `{ "updates": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidatesBody {
    Bare(Vec<CandidateUpdate>),
    Wrapped { updates: Vec<CandidateUpdate> },
}

/// Reads candidates from `GET <endpoint>/<kind>` and the active inventory
/// from `GET <endpoint>/inventory`.
#[derive(Debug, Clone)]
pub struct HttpUpdateSource {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpUpdateSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_body(&self, path: &str) -> Result<String> {
        let url = format!("{}/{}", self.endpoint, path);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("{url} non-2xx"))?;
        resp.text().await.with_context(|| format!("read {url} body"))
    }

    pub async fn fetch_inventory(&self) -> Result<ActiveInventory> {
        let body = self.get_body("inventory").await?;
        serde_json::from_str(body.trim()).context("parse inventory JSON")
    }
}

pub(crate) fn parse_candidates(body: &str) -> Result<Vec<CandidateUpdate>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        anyhow::bail!("update source returned an empty body");
    }
    let parsed: CandidatesBody = serde_json::from_str(trimmed)
        .with_context(|| format!("parse candidates JSON failed, body: {trimmed}"))?;
    Ok(match parsed {
        CandidatesBody::Bare(v) => v,
        CandidatesBody::Wrapped { updates } => updates,
    })
}

#[async_trait::async_trait]
impl UpdateSource for HttpUpdateSource {
    async fn fetch_candidates(&self, kind: TrackedKind) -> Result<Vec<CandidateUpdate>> {
        let body = self.get_body(kind.as_str()).await?;
        parse_candidates(&body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
