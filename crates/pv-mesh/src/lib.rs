//! pv-mesh: tetrahedral mesh metadata and boundary subdomain preparation.
//!
//! Runs once, offline, before a simulation: exterior facets are tagged as
//! wall/inflow/outflow by planar membership, and per-subdomain measures are
//! written to a calibration sidecar next to the tagged mesh.

pub mod classify;
pub mod mesh;
pub mod sidecar;
pub mod store;

pub use classify::{
    Classification, FacetTags, PlaneDef, PlaneRole, Subdomain, SubdomainClassifier, SubdomainRole,
};
pub use mesh::{ExteriorFacet, TetMesh, triangle_area};
pub use sidecar::{InflowRecord, OutflowRecord, Sidecar};
pub use store::MeshStore;

pub type MeshResult<T> = Result<T, MeshError>;

#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid mesh: {what}")]
    InvalidMesh { what: String },

    #[error("Invalid plane {number}: {what}")]
    InvalidPlane { number: u32, what: String },

    #[error("Malformed sidecar at line {line}: {what}")]
    Sidecar { line: usize, what: String },

    #[error("Mesh store not found: {path}")]
    NotFound { path: std::path::PathBuf },

    #[error(transparent)]
    Core(#[from] pv_core::CoreError),
}
