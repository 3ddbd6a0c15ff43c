//! Nestling Rhythm - On-device rhythm engine for infant care activity logs
//!
//! Rhythm turns a household's activity log (naps, feeds, diapers, wake-ups)
//! into daily insights through a deterministic pipeline: wire adaptation →
//! day/night classification → aggregation → rolling baselines → deviation
//! checks → narrative selection and predictions → payload encoding.
//!
//! Every entry point takes the current time explicitly; nothing reads the
//! process clock.

pub mod aggregate;
pub mod baseline;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod deviation;
pub mod encoder;
pub mod error;
pub mod narrative;
pub mod normalizer;
pub mod norms;
pub mod pipeline;
pub mod prediction;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::InsightConfig;
pub use dedup::{dedup_key, SuggestionLedger};
pub use error::RhythmError;
pub use pipeline::{
    activities_to_daily_insight, activities_to_trend_report, compute_daily_insight,
    compute_trend_report, RhythmProcessor,
};

// Schema exports
pub use schema::{ActivityAdapter, RawActivity, ValidationReport};

pub use encoder::SCHEMA_VERSION;

/// Rhythm version embedded in all report payloads
pub const RHYTHM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "nestling-rhythm";
