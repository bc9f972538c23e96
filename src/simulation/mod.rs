//! Dry-run simulation engine
//!
//! Captures the statements migrations would run, without running them.

pub mod classifier;
mod dry_run;
mod intercept;
mod tracking;
pub mod transcript;

pub use classifier::{classify, classify_query, Disposition};
pub use dry_run::{
    DryRun, DryRunBuilder, DryRunReport, MigrationResult, RunOptions, TranscriptSink,
    DEFAULT_TRACKING_TABLE,
};
pub use intercept::{CaptureBuffer, CapturingExecutor, DryRunStorage, Interception};
pub use tracking::{QuoteStyle, TrackingStatements};
