//! Domain models for sitrep.
//!
//! - `TimeWindow`: resolved reporting window
//! - `NormalizedRecord`: the common record shape every gatherer produces
//! - `GatherResult`: per-source outcome
//! - `Relation` / `AttentionItem`: derived annotations keyed by `RecordRef`

pub mod digest;
pub mod error;
pub mod outcome;
pub mod record;
pub mod relation;
pub mod window;

pub use error::{InvalidWindowError, Result, SitrepError};
pub use outcome::{GatherResult, TIMED_OUT};
pub use record::{
    CheckState, NormalizedRecord, Priority, RecordKind, RecordRef, RecordSignals, ReviewState,
};
pub use relation::{AttentionItem, Relation, RelationBasis, Severity};
pub use window::{resolve, resolve_at, to_display_label, TimeWindow, WindowUnit};
