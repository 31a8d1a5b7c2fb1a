//! Error types for the pv-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates, shared by the CLI
/// subcommands.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Solver error: {message}")]
    Solver { message: String },

    #[error("Mesh error: {0}")]
    Mesh(#[from] pv_mesh::MeshError),

    #[error("Field error: {0}")]
    Field(#[from] pv_fields::FieldError),

    #[error("Analytic solution error: {0}")]
    Analytic(#[from] pv_analytic::AnalyticError),

    #[error("Error control: {0}")]
    Control(#[from] pv_control::ControlError),

    #[error("Report error: {0}")]
    Report(#[from] pv_report::ReportError),

    #[error("Series error: {0}")]
    Series(#[from] pv_series::SeriesError),

    #[error(transparent)]
    Core(#[from] pv_core::CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// The expected stop of a diverging run, as opposed to a failure.
    pub fn is_divergence(&self) -> bool {
        matches!(self, AppError::Control(e) if e.is_divergence())
    }
}

/// Result type for pv-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
