//! pv-report: report tables, live status and run sentinels.
//!
//! Contains:
//! - tables (`;`-delimited per-step, per-cycle, summary and timing tables)
//! - status (live `.run` record and sentinel file names)
//! - writer (rank-gated file output)
//! - types (run metadata and manifest)
//! - hash (content hash run ids)
//! - generator (success and failure report paths)

pub mod generator;
pub mod hash;
pub mod status;
pub mod tables;
pub mod types;
pub mod writer;

pub use generator::{
    MANIFEST_FILE, ReportGenerator, ReportInput, SECONDS_FILE, SUMMARY_FILE, SUMMARY_HEADER_FILE,
    TIME_LINES_FILE, TIMING_FILE, load_manifest, read_summary,
};
pub use hash::compute_run_id;
pub use status::{StatusRecord, error_chain, failure_file_name, ok_file_name, status_file_name};
pub use tables::{SUMMARY_KEYS, Row, Summary};
pub use types::{RunManifest, RunMetadata, RunOutcome};
pub use writer::ReportWriter;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Series(#[from] pv_series::SeriesError),

    #[error("Report not found: {path}")]
    NotFound { path: std::path::PathBuf },

    #[error("Malformed report {path}: {what}")]
    Malformed {
        path: std::path::PathBuf,
        what: String,
    },
}
