//! Shared application service layer for pulseval.
//!
//! Loads run configuration, prepares meshes and basis fields, drives the step
//! loop through a `FlowSolver` and writes reports. Used by the CLI.

pub mod config;
pub mod error;
pub mod mesh_service;
pub mod progress;
pub mod run_service;
pub mod solver;

pub use config::{ClassifyConfig, MeshSource, RunConfig, SolverConfig, SolverKind};
pub use error::{AppError, AppResult};
pub use mesh_service::{ClassifyResponse, classify_mesh, has_basis, load_space, precompute, read_mesh};
pub use progress::{RunProgressEvent, RunStage, StepProgress};
pub use run_service::{RunRequest, RunResponse, run_simulation, run_simulation_with_progress};
pub use solver::{AnalyticReplaySolver, FlowSolver, SolverFields, SolverStep, build_solver};
