//! pv-series: named scalar time series with derived report columns.
//!
//! Contains:
//! - cycle (whole-second detection and cycle windows)
//! - series (series schema: key, names, kind of derived columns)
//! - registry (owner of all series and calibration cells)
//!
//! One value is appended per step to each targeted series. At the end of a
//! simulated second the owner closes the cycle, which appends the RMS of that
//! second's window to every monitored series.

pub mod cycle;
pub mod registry;
pub mod series;

pub use cycle::{CycleBoundary, CycleClock};
pub use registry::{ReportRows, ScaledRow, SeriesRegistry};
pub use series::{CalibrationId, FunctionalSeries, SeriesHandle, SeriesKind, SeriesSpec};

pub type SeriesResult<T> = Result<T, SeriesError>;

#[derive(thiserror::Error, Debug)]
pub enum SeriesError {
    #[error("Series '{key}' is already registered")]
    DuplicateKey { key: String },

    #[error("Unknown series key: '{key}'")]
    UnknownKey { key: String },

    #[error("Series '{key}' has {found} values but its reference '{reference}' has {expected}")]
    LengthMismatch {
        key: String,
        reference: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown calibration cell #{id}")]
    UnknownCalibration { id: usize },

    #[error("Series handle #{index} was not issued by this registry")]
    UnknownHandle { index: usize },

    #[error(transparent)]
    Core(#[from] pv_core::CoreError),
}
