// src/exclusion.rs
//! Per-kind suppression rules applied before ledger comparison.

use std::collections::BTreeSet;

use crate::model::TrackedKind;
use crate::source::ActiveItems;

/// Operator-controlled plugin identifiers that are never notified about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            ids.into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains(identifier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decides whether a candidate must be dropped for its kind.
pub struct ExclusionPolicy<'a> {
    active: &'a dyn ActiveItems,
    disabled_plugins: &'a ExclusionSet,
}

impl<'a> ExclusionPolicy<'a> {
    pub fn new(active: &'a dyn ActiveItems, disabled_plugins: &'a ExclusionSet) -> Self {
        Self {
            active,
            disabled_plugins,
        }
    }

    /// Core: never excluded.
    /// Plugin: inactive/uninstalled, or listed in the exclusion set.
    /// Theme: anything but the single active theme.
    pub fn is_excluded(&self, kind: TrackedKind, identifier: &str) -> bool {
        match kind {
            TrackedKind::Core => false,
            TrackedKind::Plugin => {
                !self.active.is_plugin_active(identifier)
                    || self.disabled_plugins.contains(identifier)
            }
            TrackedKind::Theme => {
                let active = self.active.active_theme_identifier();
                active.is_empty() || active != identifier
            }
        }
    }
}
