//! pv-control: per-step error control for validation runs.
//!
//! Contains:
//! - config (error-control, save and ramp options)
//! - problem (the `FlowProblem` capability and the Womersley cylinder)
//! - keys (the series catalog registered by the engine)
//! - force (stress tensor and wall traction norms)
//! - engine (the step state machine feeding the series registry)

pub mod config;
pub mod engine;
pub mod force;
pub mod keys;
pub mod problem;

pub use config::{ControlConfig, ErrorControlMode, InitialCondition, SaveMode};
pub use engine::{EngineState, ErrorControlEngine, onset_factor};
pub use force::{ForceComparison, TractionNorms, WallFields, compare_wall_traction, stress};
pub use keys::{AnalyticSeries, Calibrations, ForceSeries, Pair, SeriesCatalog};
pub use problem::{
    BoundaryConditions, BoundaryIds, FieldKind, FlowProblem, InitialField, InitialRequest,
    Normalization, PressureCondition, VelocityCondition, WomersleyCylinder,
};

pub type ControlResult<T> = Result<T, ControlError>;

#[derive(thiserror::Error, Debug)]
pub enum ControlError {
    #[error(
        "STOPPED: relative H1 velocity error {relative_h1:.3} exceeds {threshold} at t = {t:.3}"
    )]
    DivergenceExceeded {
        relative_h1: f64,
        threshold: f64,
        t: f64,
    },

    #[error("Invalid engine state: {what}")]
    InvalidState { what: String },

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error(transparent)]
    Series(#[from] pv_series::SeriesError),

    #[error(transparent)]
    Field(#[from] pv_fields::FieldError),

    #[error(transparent)]
    Analytic(#[from] pv_analytic::AnalyticError),

    #[error(transparent)]
    Core(#[from] pv_core::CoreError),
}

impl ControlError {
    pub fn is_divergence(&self) -> bool {
        matches!(self, ControlError::DivergenceExceeded { .. })
    }
}
