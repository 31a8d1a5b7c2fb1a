//! The narrow interface to the finite-element framework.

use nalgebra::{Matrix3, Point3, Vector3};
use pv_core::SubdomainId;

use crate::FieldResult;
use crate::field::{ScalarField, VectorField};

/// Value and gradient of a vector field at one quadrature point.
///
/// `gradient[(i, j)]` is `∂v_i/∂x_j`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSample {
    pub weight: f64,
    pub value: Vector3<f64>,
    pub gradient: Matrix3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarSample {
    pub weight: f64,
    pub value: f64,
    pub gradient: Vector3<f64>,
}

/// Vector sample on a boundary part, with the outward unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallVectorSample {
    pub weight: f64,
    pub normal: Vector3<f64>,
    pub value: Vector3<f64>,
    pub gradient: Matrix3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallScalarSample {
    pub weight: f64,
    pub normal: Vector3<f64>,
    pub value: f64,
}

/// Sampling interface implemented by the discretization backend.
///
/// Sample order is a function of the mesh only: sampling two fields over the
/// same region yields samples at the same points in the same order, so callers
/// may zip them.
pub trait Discretization: Sync {
    /// Number of nodal degrees of freedom per component.
    fn node_count(&self) -> usize;

    fn node_position(&self, node: usize) -> Point3<f64>;

    /// Shortest edge over the whole mesh.
    fn min_edge_length(&self) -> f64;

    fn domain_samples(&self, field: &VectorField) -> FieldResult<Vec<VectorSample>>;

    fn domain_scalar_samples(&self, field: &ScalarField) -> FieldResult<Vec<ScalarSample>>;

    fn boundary_samples(
        &self,
        field: &VectorField,
        id: SubdomainId,
    ) -> FieldResult<Vec<WallVectorSample>>;

    fn boundary_scalar_samples(
        &self,
        field: &ScalarField,
        id: SubdomainId,
    ) -> FieldResult<Vec<WallScalarSample>>;
}
