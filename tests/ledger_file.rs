// tests/ledger_file.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use updates_notifier::ledger::{JsonFileStore, LedgerSection, NotificationLedger};
use updates_notifier::{LedgerStore, TrackedKind};

fn items(pairs: &[(&str, &str)]) -> LedgerSection {
    LedgerSection::Items(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    )
}

#[tokio::test]
async fn concurrent_section_saves_do_not_clobber_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("notified.json");
    let store = Arc::new(JsonFileStore::new(&path));

    let core = LedgerSection::Core("6.4".into());
    let plugins = items(&[("foo/foo.php", "1.1")]);
    let themes = items(&[("mytheme", "2.1")]);
    let (a, b, c) = tokio::join!(
        store.save(TrackedKind::Core, &core),
        store.save(TrackedKind::Plugin, &plugins),
        store.save(TrackedKind::Theme, &themes),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    // Fresh handle reads back what was written.
    let reopened = JsonFileStore::new(&path);
    assert_eq!(reopened.load(TrackedKind::Core).await.unwrap(), core);
    assert_eq!(reopened.load(TrackedKind::Plugin).await.unwrap(), plugins);
    assert_eq!(reopened.load(TrackedKind::Theme).await.unwrap(), themes);
}

#[tokio::test]
async fn check_time_roundtrips_and_keeps_sections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notified.json");
    let store = JsonFileStore::new(&path);
    assert_eq!(store.last_check().await.unwrap(), None);

    store
        .save(TrackedKind::Plugin, &items(&[("foo/foo.php", "1.1")]))
        .await
        .unwrap();
    let when = Utc.with_ymd_and_hms(2025, 9, 6, 9, 30, 0).unwrap();
    store.record_check(when).await.unwrap();

    assert_eq!(store.last_check().await.unwrap(), Some(when));
    let doc: NotificationLedger =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc.plugin.get("foo/foo.php").map(String::as_str), Some("1.1"));
    assert_eq!(doc.last_check_time, Some(when));
}

#[tokio::test]
async fn writes_leave_no_temporary_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notified.json");
    let store = JsonFileStore::new(&path);
    store
        .save(TrackedKind::Core, &LedgerSection::Core("6.4".into()))
        .await
        .unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["notified.json".to_string()]);
}

#[tokio::test]
async fn corrupt_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notified.json");
    std::fs::write(&path, "{ not json").unwrap();
    let store = JsonFileStore::new(&path);
    assert!(store.load(TrackedKind::Theme).await.is_err());
}
