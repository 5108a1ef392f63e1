// src/check.rs
//! Trigger-facing pipeline: detect, then dispatch when something changed.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::aggregator::{Aggregator, RunOutcome};
use crate::config::Settings;
use crate::ledger::Ledger;
use crate::notify::{DispatchGate, DispatchSummary, Transport};
use crate::source::{ActiveItems, UpdateSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    /// `None` when no channel is enabled and detection was skipped.
    pub run: Option<RunOutcome>,
    /// `None` when nothing changed (or detection was skipped).
    pub dispatch: Option<DispatchSummary>,
}

impl CheckOutcome {
    pub fn skipped(&self) -> bool {
        self.run.is_none()
    }
}

/// Aggregator wired with the operator's toggles, exclusions and timeout.
pub fn aggregator_from_settings(
    settings: &Settings,
    source: Arc<dyn UpdateSource>,
    ledger: Ledger,
    active: Arc<dyn ActiveItems>,
) -> Aggregator {
    Aggregator::new(source, ledger, active)
        .with_toggles(settings.toggles())
        .with_exclusions(settings.exclusions())
        .with_fetch_timeout(settings.fetch_timeout())
}

/// One scheduled check. Without an enabled channel nobody would hear about
/// an update, so the ledger is not advanced and nothing runs.
pub async fn run_update_check(
    aggregator: &Aggregator,
    settings: &Settings,
    transport: &dyn Transport,
) -> CheckOutcome {
    if !settings.any_channel_enabled() {
        info!(target: "aggregator", "no notification channel enabled; check skipped");
        return CheckOutcome {
            run: None,
            dispatch: None,
        };
    }

    let run = aggregator.run().await;
    let dispatch = if run.has_changes() {
        Some(DispatchGate::new(settings, transport).dispatch(&run.report).await)
    } else {
        None
    };

    CheckOutcome {
        run: Some(run),
        dispatch,
    }
}
