// src/model.rs
//! Core data types shared by detectors, formatters and dispatch.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind-specific metadata passed through to formatting untouched
/// (e.g. `changelog_url`).
pub type Extra = BTreeMap<String, String>;

/// Well-known `extra` key carrying a changelog link for plugin updates.
pub const EXTRA_CHANGELOG_URL: &str = "changelog_url";

/// Category of trackable software component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedKind {
    Core,
    Plugin,
    Theme,
}

impl TrackedKind {
    pub const ALL: [TrackedKind; 3] = [TrackedKind::Core, TrackedKind::Plugin, TrackedKind::Theme];

    pub fn as_str(self) -> &'static str {
        match self {
            TrackedKind::Core => "core",
            TrackedKind::Plugin => "plugin",
            TrackedKind::Theme => "theme",
        }
    }
}

impl fmt::Display for TrackedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw "update available" record from the external update source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUpdate {
    /// Empty for core; a path-like slug for plugins (`foo/foo.php`) and themes.
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub current_installed_version: String,
    pub available_version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub extra: Extra,
}

impl CandidateUpdate {
    pub fn new(
        identifier: impl Into<String>,
        current_installed_version: impl Into<String>,
        available_version: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            current_installed_version: current_installed_version.into(),
            available_version: available_version.into(),
            display_name: String::new(),
            extra: Extra::new(),
        }
    }

    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// One surfaced, not-yet-notified update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: TrackedKind,
    pub identifier: String,
    pub display_name: String,
    pub old_version: String,
    pub new_version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Extra,
}

impl ChangeRecord {
    pub fn from_candidate(kind: TrackedKind, c: CandidateUpdate) -> Self {
        Self {
            kind,
            identifier: c.identifier,
            display_name: c.display_name,
            old_version: c.current_installed_version,
            new_version: c.available_version,
            extra: c.extra,
        }
    }

    /// Label used in messages; falls back to the identifier when the source
    /// did not supply a display name.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.identifier
        } else {
            &self.display_name
        }
    }

    pub fn changelog_url(&self) -> Option<&str> {
        self.extra
            .get(EXTRA_CHANGELOG_URL)
            .map(String::as_str)
            .filter(|u| !u.trim().is_empty())
    }
}

/// Result of one aggregator run. Built fresh per run, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedReport {
    pub core: Option<ChangeRecord>,
    pub plugins: Vec<ChangeRecord>,
    pub themes: Vec<ChangeRecord>,
    pub checked_at: DateTime<Utc>,
}

impl AggregatedReport {
    pub fn empty(checked_at: DateTime<Utc>) -> Self {
        Self {
            core: None,
            plugins: Vec::new(),
            themes: Vec::new(),
            checked_at,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.core.is_some() || !self.plugins.is_empty() || !self.themes.is_empty()
    }

    pub fn change_count(&self) -> usize {
        usize::from(self.core.is_some()) + self.plugins.len() + self.themes.len()
    }
}
