// src/lib.rs
//! Update detection and deduplicated notification engine.
//!
//! An external trigger calls [`check::run_update_check`] (or
//! [`Aggregator::run`] directly); detectors compare candidate updates with
//! the notification ledger and the dispatch gate fans the result out to the
//! enabled channels.

pub mod aggregator;
pub mod check;
pub mod config;
pub mod detector;
pub mod error;
pub mod exclusion;
pub mod format;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod source;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregator, KindToggles, RunOutcome, RunStatus};
pub use crate::check::{run_update_check, CheckOutcome};
pub use crate::config::Settings;
pub use crate::ledger::{JsonFileStore, Ledger, LedgerStore, MemoryStore};
pub use crate::model::{AggregatedReport, CandidateUpdate, ChangeRecord, TrackedKind};
pub use crate::notify::{Channel, ChannelOutcome, DispatchGate, Transport};
pub use crate::source::{ActiveInventory, ActiveItems, UpdateSource};
