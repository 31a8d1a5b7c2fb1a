use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid time step: dt={dt} (must be positive and at most 1 s)")]
    InvalidTimestep { dt: f64 },

    #[error("Subdomain id {id} is not a valid boundary marker")]
    InvalidSubdomain { id: u32 },

    #[error("Unknown timing watch: {key}")]
    UnknownWatch { key: String },
}
