//! Updates Notifier: binary entrypoint
//! Performs one update check and dispatch. Invoke it from cron or a systemd
//! timer at the configured frequency; overlapping invocations must be
//! prevented by that scheduler.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use updates_notifier::check::{aggregator_from_settings, run_update_check};
use updates_notifier::config::{validate, Frequency, Settings};
use updates_notifier::ledger::{JsonFileStore, Ledger};
use updates_notifier::notify::ChannelTransports;
use updates_notifier::source::{ActiveInventory, HttpUpdateSource};
use updates_notifier::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let mut settings = Settings::load_default().context("load settings")?;
    for issue in validate::issues(&settings) {
        warn!(error = %issue, "configuration problem");
    }
    if settings.frequency == Frequency::Manual {
        info!("frequency is manual; running on explicit request");
    }

    let endpoint = settings.source.endpoint.trim().to_string();
    anyhow::ensure!(!endpoint.is_empty(), "source.endpoint is not configured");
    let source = HttpUpdateSource::new(endpoint).with_timeout(settings.fetch_timeout());

    // Without an inventory no plugin or theme can be judged active.
    let inventory = match source.fetch_inventory().await {
        Ok(inv) => inv,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "inventory unavailable; plugin and theme checks skipped");
            settings.detect.notify_plugins = false;
            settings.detect.notify_themes = false;
            ActiveInventory::default()
        }
    };

    let ledger = Ledger::new(Arc::new(JsonFileStore::new(settings.ledger.path.clone())));
    let aggregator = aggregator_from_settings(&settings, Arc::new(source), ledger, Arc::new(inventory));
    let transports = ChannelTransports::from_settings(&settings);

    let outcome = run_update_check(&aggregator, &settings, &transports).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("serialize check outcome")?
    );
    Ok(())
}
