// src/detector.rs
//! # Update detector
//! One routine serves core, plugins and themes; the kind selects the ledger
//! section, the exclusion rule and the cardinality.
//!
//! Policy:
//! - empty source answer + non-empty ledger section => reset the section;
//! - a candidate is suppressed only when its available version string-equals
//!   the recorded last-notified version (no semantic version ordering);
//! - survivors are recorded and the section is saved once per invocation;
//! - a failed save still returns the computed records.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::error::{DetectError, LedgerPersistError, SourceFetchError};
use crate::exclusion::ExclusionPolicy;
use crate::ledger::{Ledger, LedgerSection};
use crate::model::{CandidateUpdate, ChangeRecord, TrackedKind};
use crate::source::UpdateSource;

/// Output of one successful detector invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub kind: TrackedKind,
    /// Ordered as the source returned them. For core, at most one.
    pub records: Vec<ChangeRecord>,
    /// The source reported nothing pending.
    pub caught_up: bool,
    pub persist_error: Option<LedgerPersistError>,
}

impl Detection {
    fn new(kind: TrackedKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
            caught_up: false,
            persist_error: None,
        }
    }
}

pub struct Detector<'a> {
    source: &'a dyn UpdateSource,
    ledger: &'a Ledger,
    policy: &'a ExclusionPolicy<'a>,
    timeout: Duration,
}

impl<'a> Detector<'a> {
    pub fn new(
        source: &'a dyn UpdateSource,
        ledger: &'a Ledger,
        policy: &'a ExclusionPolicy<'a>,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            ledger,
            policy,
            timeout,
        }
    }

    async fn fetch(&self, kind: TrackedKind) -> Result<Vec<CandidateUpdate>, SourceFetchError> {
        match tokio::time::timeout(self.timeout, self.source.fetch_candidates(kind)).await {
            Err(_) => Err(SourceFetchError::Timeout {
                kind,
                after: self.timeout,
            }),
            Ok(Err(e)) => Err(SourceFetchError::Unavailable {
                kind,
                reason: format!("{e:#}"),
            }),
            Ok(Ok(v)) => Ok(v),
        }
    }

    pub async fn detect(&self, kind: TrackedKind) -> Result<Detection, DetectError> {
        let raw = self.fetch(kind).await?;
        let recorded = self.ledger.get_notified(kind).await?;
        let mut out = Detection::new(kind);

        if raw.is_empty() {
            out.caught_up = true;
            if !recorded.is_empty() {
                info!(target: "detector", %kind, "source caught up; clearing ledger section");
                out.persist_error = self
                    .ledger
                    .set_notified(kind, &LedgerSection::empty_for(kind))
                    .await
                    .err();
            }
            return Ok(out);
        }

        let candidates = normalize(kind, raw);

        let mut working = recorded.clone();
        let pruned = working
            .retain_identifiers(|id| candidates.iter().any(|c| c.identifier == id));
        if pruned > 0 {
            debug!(target: "detector", %kind, pruned, "dropped ledger entries with no pending update");
        }

        for c in candidates {
            if self.policy.is_excluded(kind, &c.identifier) {
                trace!(target: "detector", %kind, id = %c.identifier, "excluded");
                continue;
            }
            if working.notified_version(&c.identifier) == Some(c.available_version.as_str()) {
                trace!(target: "detector", %kind, id = %c.identifier, version = %c.available_version, "already notified");
                continue;
            }
            working.record(&c.identifier, &c.available_version);
            out.records.push(ChangeRecord::from_candidate(kind, c));
        }

        if working != recorded {
            out.persist_error = self.ledger.set_notified(kind, &working).await.err();
        }

        debug!(target: "detector", %kind, surfaced = out.records.len(), "detection finished");
        Ok(out)
    }
}

/// Drop malformed candidates, collapse repeated identifiers to their first
/// occurrence and enforce core cardinality.
fn normalize(kind: TrackedKind, raw: Vec<CandidateUpdate>) -> Vec<CandidateUpdate> {
    let mut out: Vec<CandidateUpdate> = raw
        .into_iter()
        .filter(|c| {
            let ok = !c.available_version.trim().is_empty();
            if !ok {
                warn!(target: "detector", %kind, id = %c.identifier, "candidate without available version ignored");
            }
            ok
        })
        .collect();

    if kind == TrackedKind::Core {
        if out.len() > 1 {
            warn!(target: "detector", count = out.len(), "multiple core candidates; keeping the first");
            out.truncate(1);
        }
        for c in out.iter_mut() {
            c.identifier.clear();
        }
        return out;
    }

    let mut seen = BTreeSet::new();
    out.retain(|c| {
        let first = seen.insert(c.identifier.clone());
        if !first {
            warn!(target: "detector", %kind, id = %c.identifier, version = %c.available_version, "duplicate candidate ignored; keeping the first");
        }
        first
    });
    out
}
