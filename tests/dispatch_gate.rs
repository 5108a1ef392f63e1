// tests/dispatch_gate.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{at, core, item, FlakyStore, RecordingTransport};
use updates_notifier::check::{aggregator_from_settings, run_update_check};
use updates_notifier::error::{ConfigurationError, TransportError};
use updates_notifier::ledger::{Ledger, NotificationLedger};
use updates_notifier::notify::ChannelTransports;
use updates_notifier::source::StaticSource;
use updates_notifier::{
    ActiveInventory, AggregatedReport, Channel, ChangeRecord, ChannelOutcome, DispatchGate,
    Settings, TrackedKind,
};

fn settings() -> Settings {
    let mut s = Settings::default();
    s.site.name = "Acme".into();
    s.site.home_url = "https://acme.test".into();
    s.email.enabled = true;
    s.email.notify_to = vec!["ops@acme.test".into()];
    s.slack.enabled = true;
    s.slack.webhook_url = "https://hooks.slack.test/services/T0/B0/X".into();
    s
}

fn report() -> AggregatedReport {
    let mut r = AggregatedReport::empty(at(9));
    r.core = Some(ChangeRecord::from_candidate(TrackedKind::Core, core("6.3", "6.4")));
    r
}

#[tokio::test]
async fn every_enabled_channel_receives_its_own_markup() {
    let s = settings();
    let transport = RecordingTransport::default();
    let summary = DispatchGate::new(&s, &transport).dispatch(&report()).await;

    assert_eq!(summary.delivered(), 2);
    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let email = &sent.iter().find(|(c, _)| *c == Channel::Email).unwrap().1;
    let slack = &sent.iter().find(|(c, _)| *c == Channel::Slack).unwrap().1;
    assert!(email.starts_with("<i>Updates Available</i><br>"));
    assert!(slack.starts_with("_Updates Available_\n"));
}

#[tokio::test]
async fn disabled_channel_is_skipped_silently() {
    let mut s = settings();
    s.email.enabled = false;
    let transport = RecordingTransport::default();
    let summary = DispatchGate::new(&s, &transport).dispatch(&report()).await;

    assert_eq!(summary.outcome(Channel::Email), Some(&ChannelOutcome::Disabled));
    assert_eq!(summary.outcome(Channel::Slack), Some(&ChannelOutcome::Delivered));
    assert!(summary.configuration_warnings().is_empty());
    assert!(transport.sent().iter().all(|(c, _)| *c == Channel::Slack));
}

#[tokio::test]
async fn misconfigured_channel_gets_a_warning_not_a_delivery() {
    let mut s = settings();
    s.slack.webhook_url.clear();
    let transport = RecordingTransport::default();
    let summary = DispatchGate::new(&s, &transport).dispatch(&report()).await;

    assert!(matches!(
        summary.outcome(Channel::Slack),
        Some(ChannelOutcome::Misconfigured(ConfigurationError::Missing { field: "webhook_url", .. }))
    ));
    assert_eq!(summary.configuration_warnings().len(), 1);
    assert_eq!(summary.outcome(Channel::Email), Some(&ChannelOutcome::Delivered));
    assert_eq!(transport.sent().len(), 1);
}

#[tokio::test]
async fn transport_failure_is_isolated_per_channel() {
    let s = settings();
    let transport = RecordingTransport::failing(&[Channel::Email]);
    let summary = DispatchGate::new(&s, &transport).dispatch(&report()).await;

    assert!(matches!(
        summary.outcome(Channel::Email),
        Some(ChannelOutcome::Failed(TransportError::Failed { .. }))
    ));
    assert_eq!(summary.outcome(Channel::Slack), Some(&ChannelOutcome::Delivered));
}

#[tokio::test(start_paused = true)]
async fn slow_transport_times_out() {
    let s = settings();
    let transport = RecordingTransport {
        delay: Some(Duration::from_secs(120)),
        ..Default::default()
    };
    let summary = DispatchGate::new(&s, &transport)
        .with_timeout(Duration::from_secs(2))
        .dispatch(&report())
        .await;

    for channel in Channel::ALL {
        assert!(matches!(
            summary.outcome(channel),
            Some(ChannelOutcome::Failed(TransportError::Timeout { after, .. })) if *after == Duration::from_secs(2)
        ));
    }
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn missing_sender_is_not_configured() {
    let s = settings();
    let transports = ChannelTransports::default();
    let summary = DispatchGate::new(&s, &transports).dispatch(&report()).await;
    assert_eq!(
        summary.outcome(Channel::Slack),
        Some(&ChannelOutcome::Failed(TransportError::NotConfigured {
            channel: Channel::Slack
        }))
    );
}

#[tokio::test]
async fn test_message_goes_through_the_same_gate() {
    let mut s = settings();
    s.email.enabled = false;
    let transport = RecordingTransport::default();
    let summary = DispatchGate::new(&s, &transport).send_test().await;

    assert_eq!(summary.delivered(), 1);
    let sent = transport.sent();
    assert_eq!(sent[0].0, Channel::Slack);
    assert!(sent[0].1.starts_with("This is a test message from Updates Notifier."));
}

#[tokio::test]
async fn outcome_serializes_with_reason() {
    let mut s = settings();
    s.slack.channel_override = "updates".into();
    let transport = RecordingTransport::default();
    let summary = DispatchGate::new(&s, &transport).dispatch(&report()).await;
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["outcomes"]["email"], "delivered");
    assert!(json["outcomes"]["slack"]
        .as_str()
        .unwrap()
        .starts_with("misconfigured:"));
}

fn pipeline(s: &Settings, store: &Arc<FlakyStore>) -> updates_notifier::Aggregator {
    let source = StaticSource::new()
        .with(TrackedKind::Core, vec![core("6.3", "6.4")])
        .with(TrackedKind::Plugin, vec![item("foo/foo.php", "1.0", "1.1")]);
    aggregator_from_settings(
        s,
        Arc::new(source),
        Ledger::new(store.clone()),
        Arc::new(ActiveInventory::new(["foo/foo.php"], "mytheme")),
    )
}

#[tokio::test]
async fn check_is_skipped_without_enabled_channels() {
    let mut s = settings();
    s.email.enabled = false;
    s.slack.enabled = false;
    let store = Arc::new(FlakyStore::default());
    let transport = RecordingTransport::default();

    let outcome = run_update_check(&pipeline(&s, &store), &s, &transport).await;
    assert!(outcome.skipped());
    assert!(outcome.dispatch.is_none());
    assert_eq!(store.snapshot(), NotificationLedger::default());
}

#[tokio::test]
async fn check_dispatches_only_when_something_changed() {
    let s = settings();
    let store = Arc::new(FlakyStore::default());
    let transport = RecordingTransport::default();
    let agg = pipeline(&s, &store);

    let first = run_update_check(&agg, &s, &transport).await;
    assert!(!first.skipped());
    assert_eq!(first.dispatch.map(|d| d.delivered()), Some(2));

    let second = run_update_check(&agg, &s, &transport).await;
    assert!(second.dispatch.is_none());
    assert_eq!(transport.sent().len(), 2);
}

#[tokio::test]
async fn settings_toggles_reach_the_aggregator() {
    let mut s = settings();
    s.detect.notify_core = false;
    let store = Arc::new(FlakyStore::default());
    let transport = RecordingTransport::default();

    let outcome = run_update_check(&pipeline(&s, &store), &s, &transport).await;
    let run = outcome.run.unwrap();
    assert!(run.report.core.is_none());
    assert_eq!(run.report.plugins.len(), 1);
}
