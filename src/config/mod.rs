// src/config/mod.rs
//! Operator configuration (read-only to the engine).

pub mod validate;

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregator::KindToggles;
use crate::exclusion::ExclusionSet;
use crate::format::SiteInfo;
use crate::ledger::DEFAULT_LEDGER_PATH;

pub const ENV_CONFIG_PATH: &str = "UPDATES_NOTIFIER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/notifier.toml";

/// Check cadence menu. The cadence itself is consumed by the external
/// scheduler; `Manual` means no periodic trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Hourly,
    TwiceDaily,
    Daily,
    Weekly,
    Manual,
}

impl Frequency {
    pub fn interval(self) -> Option<Duration> {
        const HOUR: u64 = 3600;
        match self {
            Frequency::Hourly => Some(Duration::from_secs(HOUR)),
            Frequency::TwiceDaily => Some(Duration::from_secs(12 * HOUR)),
            Frequency::Daily => Some(Duration::from_secs(24 * HOUR)),
            Frequency::Weekly => Some(Duration::from_secs(7 * 24 * HOUR)),
            Frequency::Manual => None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_delivery_timeout_secs() -> u64 {
    15
}
fn default_smtp_port() -> u16 {
    587
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_PATH)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub name: String,
    pub home_url: String,
    /// Empty means `<home_url>/wp-admin`.
    pub admin_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectSettings {
    #[serde(default = "default_true")]
    pub notify_core: bool,
    #[serde(default = "default_true")]
    pub notify_plugins: bool,
    #[serde(default = "default_true")]
    pub notify_themes: bool,
    /// Plugin identifiers never notified about.
    #[serde(default)]
    pub disabled_plugins: Vec<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self {
            notify_core: true,
            notify_plugins: true,
            notify_themes: true,
            disabled_plugins: Vec::new(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            user: String::new(),
            pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub notify_to: Vec<String>,
    pub notify_from: String,
    pub smtp: SmtpSettings,
}

impl EmailSettings {
    /// Trimmed, non-empty recipients.
    pub fn recipients(&self) -> Vec<&str> {
        self.notify_to
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackSettings {
    pub enabled: bool,
    pub webhook_url: String,
    pub channel_override: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_delivery_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_delivery_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub frequency: Frequency,
    pub site: SiteSettings,
    pub detect: DetectSettings,
    pub email: EmailSettings,
    pub slack: SlackSettings,
    pub source: SourceSettings,
    pub ledger: LedgerSettings,
    pub dispatch: DispatchSettings,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse notifier settings TOML")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load settings using env var + fallbacks, then apply env overrides:
    /// 1) $UPDATES_NOTIFIER_CONFIG
    /// 2) config/notifier.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut settings = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Environment overrides for secrets and destinations.
    pub fn apply_env(&mut self) {
        let var = |k: &str| env::var(k).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SMTP_HOST") {
            self.email.smtp.host = v;
        }
        if let Some(port) = var("SMTP_PORT").and_then(|v| v.trim().parse().ok()) {
            self.email.smtp.port = port;
        }
        if let Some(v) = var("SMTP_USER") {
            self.email.smtp.user = v;
        }
        if let Some(v) = var("SMTP_PASS") {
            self.email.smtp.pass = v;
        }
        if let Some(v) = var("NOTIFY_EMAIL_FROM") {
            self.email.notify_from = v.trim().to_string();
        }
        if let Some(v) = var("NOTIFY_EMAIL_TO") {
            self.email.notify_to = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = var("SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = v.trim().to_string();
        }
    }

    pub fn any_channel_enabled(&self) -> bool {
        self.email.enabled || self.slack.enabled
    }

    pub fn toggles(&self) -> KindToggles {
        KindToggles {
            core: self.detect.notify_core,
            plugins: self.detect.notify_plugins,
            themes: self.detect.notify_themes,
        }
    }

    pub fn exclusions(&self) -> ExclusionSet {
        ExclusionSet::new(&self.detect.disabled_plugins)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.detect.fetch_timeout_secs.max(1))
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.timeout_secs.max(1))
    }

    pub fn site_info(&self) -> SiteInfo {
        let home_url = self.site.home_url.trim().trim_end_matches('/').to_string();
        let admin_url = if self.site.admin_url.trim().is_empty() {
            format!("{home_url}/wp-admin")
        } else {
            self.site.admin_url.trim().to_string()
        };
        SiteInfo {
            name: self.site.name.trim().to_string(),
            home_url,
            admin_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_fresh_install() {
        let s = Settings::default();
        assert_eq!(s.frequency, Frequency::Hourly);
        assert!(!s.email.enabled && !s.slack.enabled);
        assert_eq!(s.toggles(), KindToggles::default());
        assert_eq!(s.ledger.path, PathBuf::from(DEFAULT_LEDGER_PATH));
        assert_eq!(s.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(s.delivery_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
frequency = "twicedaily"
[detect]
notify_themes = false
disabled_plugins = [" foo/foo.php ", ""]
[slack]
enabled = true
webhook_url = "https://hooks.slack.test/T000"
"#,
        )
        .unwrap();
        assert_eq!(s.frequency, Frequency::TwiceDaily);
        assert!(s.detect.notify_core && s.detect.notify_plugins && !s.detect.notify_themes);
        assert!(s.exclusions().contains("foo/foo.php"));
        assert_eq!(s.exclusions().len(), 1);
        assert!(s.slack.enabled);
        assert_eq!(s.email.smtp.port, 587);
    }

    #[test]
    fn unknown_frequency_is_rejected() {
        assert!(Settings::from_toml_str(r#"frequency = "every_minute""#).is_err());
    }

    #[test]
    fn manual_has_no_interval() {
        assert_eq!(Frequency::Manual.interval(), None);
        assert_eq!(Frequency::Daily.interval(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn site_info_derives_admin_url() {
        let mut s = Settings::default();
        s.site.home_url = "https://acme.test/".into();
        assert_eq!(s.site_info().admin_url, "https://acme.test/wp-admin");
        s.site.admin_url = "https://admin.acme.test".into();
        assert_eq!(s.site_info().admin_url, "https://admin.acme.test");
    }
}
