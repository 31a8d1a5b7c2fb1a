//! pv-fields: discrete fields and the finite-element collaborator interface.
//!
//! The harness never assembles or solves anything. It needs a backend that can
//! sample a nodal field (values and gradients) at quadrature points on the
//! domain or on a tagged boundary part, and report node positions so analytic
//! expressions can be interpolated. `Discretization` is that seam; `P1Space`
//! is a reference backend over linear tetrahedra.

pub mod discretization;
pub mod field;
pub mod functionals;
pub mod p1;

pub use discretization::{Discretization, ScalarSample, VectorSample, WallScalarSample, WallVectorSample};
pub use field::{ScalarField, VectorField};
pub use p1::P1Space;

use pv_core::SubdomainId;

pub type FieldResult<T> = Result<T, FieldError>;

#[derive(thiserror::Error, Debug)]
pub enum FieldError {
    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("No boundary facets tagged with subdomain {id}")]
    UnknownSubdomain { id: SubdomainId },

    #[error("Degenerate cell {cell} (zero volume)")]
    DegenerateCell { cell: usize },

    #[error("Zero measure: {what}")]
    ZeroMeasure { what: &'static str },
}
