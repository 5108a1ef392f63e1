// src/telemetry.rs
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "updates_notifier=info,warn";

/// One-time metrics registration (so series show up on scrape).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("updates_checks_total", "Completed update check runs.");
        describe_counter!(
            "updates_changes_total",
            "Change records surfaced, labelled by kind."
        );
        describe_counter!(
            "updates_detector_failures_total",
            "Detector runs that failed (source or ledger load), by kind."
        );
        describe_counter!(
            "updates_ledger_persist_failures_total",
            "Ledger section saves that failed, by kind."
        );
        describe_counter!(
            "updates_deliveries_total",
            "Dispatch outcomes, labelled by channel and result."
        );
        describe_gauge!("updates_last_check_ts", "Unix ts of the last check run.");
    });
}

/// Compact logs filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Safe to call more than once.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init();
}
