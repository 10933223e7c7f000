//! sitrep core library
//!
//! Status aggregation and cross-source correlation: gathers state from
//! independent, possibly failing sources, links records that refer to the
//! same unit of work, ranks what needs attention and assembles a bounded,
//! deterministic report.

pub mod attention;
pub mod correlate;
pub mod domain;
pub mod gather;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod report;
pub mod telemetry;

pub use domain::{
    resolve, resolve_at, to_display_label, AttentionItem, CheckState, GatherResult,
    InvalidWindowError, NormalizedRecord, Priority, RecordKind, RecordRef, RecordSignals,
    Relation, RelationBasis, Result, ReviewState, Severity, SitrepError, TimeWindow, WindowUnit,
};

pub use attention::classify;
pub use correlate::{
    compile_id_pattern, correlate, default_id_pattern, prune_dangling, Correlator, RelationGraph,
    DEFAULT_ID_PATTERN,
};
pub use gather::{
    run_all, GatherResults, Gatherer, ProviderConfig, Source, DEFAULT_PAGE_CAP,
    DEFAULT_SOURCE_TIMEOUT,
};
pub use pipeline::{generate_report, generate_report_at, RunOptions};
pub use report::render::{render_json, render_markdown};
pub use report::{
    build, AttentionEntry, AttentionSection, Report, ReportBuilder, ReportLimits, ReportRecord,
    SourceNote, SourceSection, SourceStatus, NO_SOURCES_AVAILABLE,
};

pub use metrics::METRICS;
pub use telemetry::init_tracing;

/// sitrep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
