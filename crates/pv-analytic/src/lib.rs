//! pv-analytic: closed-form Womersley flow in a straight cylinder.
//!
//! Contains:
//! - bessel (complex J0 by power series)
//! - calibration (the 8-mode Womersley table for the reference pipe)
//! - store (persisted basis fields, one file per mesh and viscosity)
//! - precompute (builds basis fields from the calibration)
//! - profile (per-step evaluation from loaded basis fields)

pub mod bessel;
pub mod calibration;
pub mod precompute;
pub mod profile;
pub mod store;

pub use calibration::{FREQUENCIES, WomersleyCalibration, WomersleyMode};
pub use precompute::precompute_basis;
pub use profile::{AnalyticProfile, AxialPressure, BasisField, HarmonicMode};
pub use store::{BasisStore, basis_field_names, viscosity_suffix};

pub type AnalyticResult<T> = Result<T, AnalyticError>;

#[derive(thiserror::Error, Debug)]
pub enum AnalyticError {
    #[error("Failed to load basis fields: {what}")]
    Load { what: String },

    #[error("Basis field '{name}' is missing")]
    MissingField { name: String },

    #[error("Basis field '{name}' has {found} values, solution space has {expected} nodes")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("No precomputed basis for viscosity factor {factor}")]
    UnsupportedViscosity { factor: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Field(#[from] pv_fields::FieldError),
}
