//! Continuous piecewise-linear space on a tetrahedral mesh.
//!
//! Stands in for the external finite-element framework: field values live on
//! mesh vertices, gradients are constant per cell. Domain integrals use the
//! 4-point degree-2 Keast rule; facet integrals use the 3-point edge-midpoint
//! rule, so quadratic integrands (norms of P1 fields) are exact.

use std::collections::BTreeMap;

use nalgebra::{Matrix3, Point3, Vector3};
use pv_core::SubdomainId;
use pv_mesh::{FacetTags, TetMesh};
use rayon::prelude::*;
use tracing::debug;

use crate::discretization::{
    Discretization, ScalarSample, VectorSample, WallScalarSample, WallVectorSample,
};
use crate::field::{ScalarField, VectorField, check_len};
use crate::{FieldError, FieldResult};

const KEAST_A: f64 = 0.585_410_196_624_968_5;
const KEAST_B: f64 = 0.138_196_601_125_010_5;

const CELL_POINTS: [[f64; 4]; 4] = [
    [KEAST_A, KEAST_B, KEAST_B, KEAST_B],
    [KEAST_B, KEAST_A, KEAST_B, KEAST_B],
    [KEAST_B, KEAST_B, KEAST_A, KEAST_B],
    [KEAST_B, KEAST_B, KEAST_B, KEAST_A],
];

const FACET_POINTS: [[f64; 3]; 3] = [[0.5, 0.5, 0.0], [0.0, 0.5, 0.5], [0.5, 0.0, 0.5]];

#[derive(Debug, Clone)]
struct CellGeometry {
    vertices: [usize; 4],
    volume: f64,
    /// Gradients of the four barycentric coordinates.
    grads: [Vector3<f64>; 4],
}

#[derive(Debug, Clone)]
struct FacetGeometry {
    vertices: [usize; 3],
    cell: usize,
    area: f64,
    normal: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct P1Space {
    mesh: TetMesh,
    cells: Vec<CellGeometry>,
    boundary: BTreeMap<SubdomainId, Vec<FacetGeometry>>,
    edge_min: f64,
}

impl P1Space {
    pub fn new(mesh: TetMesh, tags: &FacetTags) -> FieldResult<Self> {
        let cells = (0..mesh.cells.len())
            .map(|c| cell_geometry(&mesh, c))
            .collect::<FieldResult<Vec<_>>>()?;

        let mut boundary: BTreeMap<SubdomainId, Vec<FacetGeometry>> = BTreeMap::new();
        for (facet, id) in tags.facets.iter().zip(&tags.ids) {
            boundary.entry(*id).or_default().push(FacetGeometry {
                vertices: facet.vertices,
                cell: facet.cell,
                area: mesh.facet_area(facet),
                normal: mesh.facet_normal(facet),
            });
        }

        let (edge_min, _) = mesh.edge_length_range();
        debug!(
            nodes = mesh.vertex_count(),
            cells = cells.len(),
            boundary_parts = boundary.len(),
            "Built P1 space"
        );
        Ok(Self {
            mesh,
            cells,
            boundary,
            edge_min,
        })
    }

    pub fn mesh(&self) -> &TetMesh {
        &self.mesh
    }

    fn facets(&self, id: SubdomainId) -> FieldResult<&[FacetGeometry]> {
        self.boundary
            .get(&id)
            .map(Vec::as_slice)
            .ok_or(FieldError::UnknownSubdomain { id })
    }

    fn vector_gradient(&self, cell: &CellGeometry, values: &[Vector3<f64>]) -> Matrix3<f64> {
        cell.vertices
            .iter()
            .zip(&cell.grads)
            .fold(Matrix3::zeros(), |acc, (&v, g)| acc + values[v] * g.transpose())
    }

    fn scalar_gradient(&self, cell: &CellGeometry, values: &[f64]) -> Vector3<f64> {
        cell.vertices
            .iter()
            .zip(&cell.grads)
            .fold(Vector3::zeros(), |acc, (&v, g)| acc + g * values[v])
    }
}

fn cell_geometry(mesh: &TetMesh, c: usize) -> FieldResult<CellGeometry> {
    let jac = mesh.cell_jacobian(c);
    let det = jac.determinant();
    if det.abs() <= f64::EPSILON * jac.norm().powi(3) {
        return Err(FieldError::DegenerateCell { cell: c });
    }
    let inv = jac
        .try_inverse()
        .ok_or(FieldError::DegenerateCell { cell: c })?;
    // rows of J⁻¹ are the gradients of λ1..λ3
    let g1 = inv.row(0).transpose();
    let g2 = inv.row(1).transpose();
    let g3 = inv.row(2).transpose();
    let g0 = -(g1 + g2 + g3);
    Ok(CellGeometry {
        vertices: mesh.cells[c],
        volume: det.abs() / 6.0,
        grads: [g0, g1, g2, g3],
    })
}

impl Discretization for P1Space {
    fn node_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    fn node_position(&self, node: usize) -> Point3<f64> {
        self.mesh.point(node)
    }

    fn min_edge_length(&self) -> f64 {
        self.edge_min
    }

    fn domain_samples(&self, field: &VectorField) -> FieldResult<Vec<VectorSample>> {
        check_len("vector field", self.node_count(), field.len())?;
        let values = field.values();
        let per_cell: Vec<[VectorSample; 4]> = self
            .cells
            .par_iter()
            .map(|cell| {
                let gradient = self.vector_gradient(cell, values);
                let weight = cell.volume / 4.0;
                CELL_POINTS.map(|bary| VectorSample {
                    weight,
                    value: cell
                        .vertices
                        .iter()
                        .zip(bary)
                        .fold(Vector3::zeros(), |acc, (&v, l)| acc + values[v] * l),
                    gradient,
                })
            })
            .collect();
        Ok(per_cell.into_iter().flatten().collect())
    }

    fn domain_scalar_samples(&self, field: &ScalarField) -> FieldResult<Vec<ScalarSample>> {
        check_len("scalar field", self.node_count(), field.len())?;
        let values = field.values();
        let per_cell: Vec<[ScalarSample; 4]> = self
            .cells
            .par_iter()
            .map(|cell| {
                let gradient = self.scalar_gradient(cell, values);
                let weight = cell.volume / 4.0;
                CELL_POINTS.map(|bary| ScalarSample {
                    weight,
                    value: cell
                        .vertices
                        .iter()
                        .zip(bary)
                        .map(|(&v, l)| values[v] * l)
                        .sum(),
                    gradient,
                })
            })
            .collect();
        Ok(per_cell.into_iter().flatten().collect())
    }

    fn boundary_samples(
        &self,
        field: &VectorField,
        id: SubdomainId,
    ) -> FieldResult<Vec<WallVectorSample>> {
        check_len("vector field", self.node_count(), field.len())?;
        let values = field.values();
        let mut out = Vec::new();
        for facet in self.facets(id)? {
            let gradient = self.vector_gradient(&self.cells[facet.cell], values);
            let weight = facet.area / 3.0;
            for bary in FACET_POINTS {
                let value = facet
                    .vertices
                    .iter()
                    .zip(bary)
                    .fold(Vector3::zeros(), |acc, (&v, l)| acc + values[v] * l);
                out.push(WallVectorSample {
                    weight,
                    normal: facet.normal,
                    value,
                    gradient,
                });
            }
        }
        Ok(out)
    }

    fn boundary_scalar_samples(
        &self,
        field: &ScalarField,
        id: SubdomainId,
    ) -> FieldResult<Vec<WallScalarSample>> {
        check_len("scalar field", self.node_count(), field.len())?;
        let values = field.values();
        let mut out = Vec::new();
        for facet in self.facets(id)? {
            let weight = facet.area / 3.0;
            for bary in FACET_POINTS {
                out.push(WallScalarSample {
                    weight,
                    normal: facet.normal,
                    value: facet
                        .vertices
                        .iter()
                        .zip(bary)
                        .map(|(&v, l)| values[v] * l)
                        .sum(),
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functionals;
    use pv_mesh::{PlaneDef, PlaneRole, SubdomainClassifier};

    fn unit_cube() -> P1Space {
        let mesh = TetMesh::structured_box([0.0; 3], [1.0; 3], [2, 2, 2]).unwrap();
        let tags = SubdomainClassifier::new(vec![PlaneDef {
            number: 2,
            normal: [0.0, 0.0, -1.0],
            center: [0.5, 0.5, 0.0],
            role: PlaneRole::Inflow {
                radius: 0.5,
                reference_radius: 0.5,
            },
        }])
        .unwrap()
        .classify(&mesh)
        .unwrap()
        .tags;
        P1Space::new(mesh, &tags).unwrap()
    }

    #[test]
    fn volume_and_areas() {
        let space = unit_cube();
        let vol = functionals::domain_volume(&space).unwrap();
        assert!((vol - 1.0).abs() < 1e-12);
        let inflow = SubdomainId::plane(2).unwrap();
        assert!((functionals::boundary_measure(&space, inflow).unwrap() - 1.0).abs() < 1e-12);
        assert!(
            (functionals::boundary_measure(&space, SubdomainId::WALL).unwrap() - 5.0).abs()
                < 1e-12
        );
        assert!(functionals::boundary_measure(&space, SubdomainId::plane(7).unwrap()).is_err());
    }

    #[test]
    fn linear_field_gradient_is_exact() {
        let space = unit_cube();
        // v = (x, 2y, -3z): grad = diag(1, 2, -3), div = 0
        let v = functionals::interpolate_vector(&space, |p| Vector3::new(p.x, 2.0 * p.y, -3.0 * p.z));
        for s in space.domain_samples(&v).unwrap() {
            let expected = Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, -3.0));
            assert!((s.gradient - expected).norm() < 1e-10);
        }
        assert!(functionals::divergence_norm(&space, &v).unwrap() < 1e-10);
        // |∇v|² = 14 over unit volume
        assert!((functionals::h1_seminorm_sq(&space, &v).unwrap() - 14.0).abs() < 1e-10);
    }

    #[test]
    fn quadratic_integrand_is_exact() {
        let space = unit_cube();
        // ∫ x² over the unit cube = 1/3
        let v = functionals::interpolate_vector(&space, |p| Vector3::new(p.x, 0.0, 0.0));
        assert!((functionals::l2_norm_sq(&space, &v).unwrap() - 1.0 / 3.0).abs() < 1e-12);
        // ∫ z over the unit cube = 1/2, mean = 1/2
        let p = functionals::interpolate_scalar(&space, |p| p.z);
        assert!((functionals::domain_mean(&space, &p).unwrap() - 0.5).abs() < 1e-12);
        let inflow = SubdomainId::plane(2).unwrap();
        assert!(functionals::boundary_mean(&space, &p, inflow).unwrap().abs() < 1e-12);
    }

    #[test]
    fn boundary_normals_point_outward() {
        let space = unit_cube();
        let p = ScalarField::zeros(space.node_count());
        let inflow = SubdomainId::plane(2).unwrap();
        for s in space.boundary_scalar_samples(&p, inflow).unwrap() {
            assert!((s.normal - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        let space = unit_cube();
        let v = VectorField::zeros(space.node_count() + 1);
        assert!(matches!(
            space.domain_samples(&v),
            Err(FieldError::LengthMismatch { .. })
        ));
    }
}
