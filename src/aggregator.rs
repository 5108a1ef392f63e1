// src/aggregator.rs
//! Runs the three detectors, merges their output and timestamps the check.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{info, warn};

use crate::detector::{Detection, Detector};
use crate::error::{DetectError, LedgerPersistError};
use crate::exclusion::{ExclusionPolicy, ExclusionSet};
use crate::ledger::Ledger;
use crate::model::{AggregatedReport, TrackedKind};
use crate::source::{ActiveItems, UpdateSource};
use crate::telemetry::ensure_metrics_described;

/// Which kinds are detected at all. A disabled kind is neither fetched nor
/// allowed to touch its ledger section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindToggles {
    pub core: bool,
    pub plugins: bool,
    pub themes: bool,
}

impl Default for KindToggles {
    fn default() -> Self {
        Self {
            core: true,
            plugins: true,
            themes: true,
        }
    }
}

impl KindToggles {
    pub fn enabled(&self, kind: TrackedKind) -> bool {
        match kind {
            TrackedKind::Core => self.core,
            TrackedKind::Plugin => self.plugins,
            TrackedKind::Theme => self.themes,
        }
    }
}

/// Error side-channel of a run. Rendering is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatus {
    #[serde(serialize_with = "display_map")]
    pub kind_failures: BTreeMap<TrackedKind, DetectError>,
    #[serde(serialize_with = "display_vec")]
    pub persist_failures: Vec<LedgerPersistError>,
    pub check_time_error: Option<String>,
}

impl RunStatus {
    pub fn is_clean(&self) -> bool {
        self.kind_failures.is_empty()
            && self.persist_failures.is_empty()
            && self.check_time_error.is_none()
    }
}

fn display_map<S: serde::Serializer>(
    m: &BTreeMap<TrackedKind, DetectError>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_map(m.iter().map(|(k, v)| (k, v.to_string())))
}

fn display_vec<S: serde::Serializer>(v: &[LedgerPersistError], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(v.iter().map(|e| e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub report: AggregatedReport,
    pub status: RunStatus,
}

impl RunOutcome {
    pub fn has_changes(&self) -> bool {
        self.report.has_changes()
    }
}

pub struct Aggregator {
    source: Arc<dyn UpdateSource>,
    ledger: Ledger,
    active: Arc<dyn ActiveItems>,
    exclusions: ExclusionSet,
    toggles: KindToggles,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        ledger: Ledger,
        active: Arc<dyn ActiveItems>,
    ) -> Self {
        Self {
            source,
            ledger,
            active,
            exclusions: ExclusionSet::default(),
            toggles: KindToggles::default(),
            fetch_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionSet) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_toggles(mut self, toggles: KindToggles) -> Self {
        self.toggles = toggles;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run a check now.
    pub async fn run(&self) -> RunOutcome {
        self.run_at(Utc::now()).await
    }

    /// Run a check stamped with `now`. Never fails: per-kind problems land in
    /// [`RunStatus`].
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunOutcome {
        ensure_metrics_described();

        let policy = ExclusionPolicy::new(self.active.as_ref(), &self.exclusions);
        let detector = Detector::new(
            self.source.as_ref(),
            &self.ledger,
            &policy,
            self.fetch_timeout,
        );

        let (core, plugins, themes) = tokio::join!(
            self.detect_if_enabled(&detector, TrackedKind::Core),
            self.detect_if_enabled(&detector, TrackedKind::Plugin),
            self.detect_if_enabled(&detector, TrackedKind::Theme),
        );

        let mut report = AggregatedReport::empty(now);
        let mut status = RunStatus::default();

        for (kind, result) in [
            (TrackedKind::Core, core),
            (TrackedKind::Plugin, plugins),
            (TrackedKind::Theme, themes),
        ] {
            let Some(result) = result else { continue };
            match result {
                Ok(detection) => merge(&mut report, &mut status, detection),
                Err(e) => {
                    warn!(target: "aggregator", %kind, error = %e, "detector failed; kind skipped this run");
                    counter!("updates_detector_failures_total", "kind" => kind.as_str())
                        .increment(1);
                    status.kind_failures.insert(kind, e);
                }
            }
        }

        if let Err(e) = self.ledger.record_check(now).await {
            warn!(target: "aggregator", error = %format!("{e:#}"), "recording check time failed");
            status.check_time_error = Some(format!("{e:#}"));
        }

        counter!("updates_checks_total").increment(1);
        gauge!("updates_last_check_ts").set(now.timestamp().max(0) as f64);

        info!(
            target: "aggregator",
            core = report.core.is_some(),
            plugins = report.plugins.len(),
            themes = report.themes.len(),
            failures = status.kind_failures.len(),
            "update check finished"
        );

        RunOutcome { report, status }
    }

    async fn detect_if_enabled(
        &self,
        detector: &Detector<'_>,
        kind: TrackedKind,
    ) -> Option<Result<Detection, DetectError>> {
        if !self.toggles.enabled(kind) {
            return None;
        }
        Some(detector.detect(kind).await)
    }
}

fn merge(report: &mut AggregatedReport, status: &mut RunStatus, detection: Detection) {
    let kind = detection.kind;
    if let Some(err) = detection.persist_error {
        counter!("updates_ledger_persist_failures_total", "kind" => kind.as_str()).increment(1);
        status.persist_failures.push(err);
    }
    if !detection.records.is_empty() {
        counter!("updates_changes_total", "kind" => kind.as_str())
            .increment(detection.records.len() as u64);
    }
    match kind {
        TrackedKind::Core => report.core = detection.records.into_iter().next(),
        TrackedKind::Plugin => report.plugins = detection.records,
        TrackedKind::Theme => report.themes = detection.records,
    }
}
