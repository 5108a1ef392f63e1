// tests/settings_env.rs
use std::{env, fs};

use updates_notifier::config::{Frequency, Settings, ENV_CONFIG_PATH};

const ENV_KEYS: [&str; 7] = [
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASS",
    "NOTIFY_EMAIL_FROM",
    "NOTIFY_EMAIL_TO",
    "SLACK_WEBHOOK_URL",
];

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn default_uses_env_path_then_fallback_file() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing on disk -> defaults
    let s = Settings::load_default().unwrap();
    assert_eq!(s.frequency, Frequency::Hourly);
    assert!(!s.any_channel_enabled());

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("notifier.toml"),
        r#"
frequency = "daily"
[email]
enabled = true
notify_to = ["ops@acme.test"]
"#,
    )
    .unwrap();
    let s = Settings::load_default().unwrap();
    assert_eq!(s.frequency, Frequency::Daily);
    assert!(s.email.enabled);

    // 3) Env path wins over the fallback
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, r#"frequency = "weekly""#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let s = Settings::load_default().unwrap();
    assert_eq!(s.frequency, Frequency::Weekly);
    assert!(!s.email.enabled);

    // 4) Env path to a missing file is an error, not a silent fallback
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(Settings::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn secrets_and_destinations_come_from_env() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var("SMTP_HOST", "smtp.acme.test");
    env::set_var("SMTP_PORT", "465");
    env::set_var("SMTP_USER", "mailer@acme.test");
    env::set_var("SMTP_PASS", "s3cret");
    env::set_var("NOTIFY_EMAIL_FROM", " Updates <noreply@acme.test> ");
    env::set_var("NOTIFY_EMAIL_TO", "ops@acme.test, ,dev@acme.test");
    env::set_var("SLACK_WEBHOOK_URL", "https://hooks.slack.test/services/X");

    let s = Settings::load_default().unwrap();
    assert_eq!(s.email.smtp.host, "smtp.acme.test");
    assert_eq!(s.email.smtp.port, 465);
    assert_eq!(s.email.smtp.user, "mailer@acme.test");
    assert_eq!(s.email.smtp.pass, "s3cret");
    assert_eq!(s.email.notify_from, "Updates <noreply@acme.test>");
    assert_eq!(s.email.notify_to, vec!["ops@acme.test", "dev@acme.test"]);
    assert_eq!(s.slack.webhook_url, "https://hooks.slack.test/services/X");

    // a garbage port leaves the default alone
    env::set_var("SMTP_PORT", "not-a-port");
    let s = Settings::load_default().unwrap();
    assert_eq!(s.email.smtp.port, 587);

    clear_env();
    env::set_current_dir(&old).unwrap();
}
