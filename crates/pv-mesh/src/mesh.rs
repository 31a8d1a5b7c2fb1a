//! Linear tetrahedral mesh with the topology queries the harness needs.

use std::collections::HashMap;

use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{MeshError, MeshResult};

/// Local vertex triples of the four faces of a tetrahedron, paired with the
/// local index of the vertex opposite each face.
const CELL_FACES: [([usize; 3], usize); 4] = [
    ([1, 2, 3], 0),
    ([0, 2, 3], 1),
    ([0, 1, 3], 2),
    ([0, 1, 2], 3),
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TetMesh {
    pub vertices: Vec<[f64; 3]>,
    pub cells: Vec<[usize; 4]>,
}

/// A boundary triangle owned by exactly one cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExteriorFacet {
    pub vertices: [usize; 3],
    pub cell: usize,
    /// Vertex of `cell` not on the facet; fixes the outward orientation.
    pub opposite: usize,
}

impl TetMesh {
    pub fn new(vertices: Vec<[f64; 3]>, cells: Vec<[usize; 4]>) -> MeshResult<Self> {
        let mesh = Self { vertices, cells };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn validate(&self) -> MeshResult<()> {
        if self.cells.is_empty() {
            return Err(MeshError::InvalidMesh {
                what: "mesh has no cells".to_string(),
            });
        }
        let n = self.vertices.len();
        for (c, cell) in self.cells.iter().enumerate() {
            if let Some(bad) = cell.iter().find(|&&v| v >= n) {
                return Err(MeshError::InvalidMesh {
                    what: format!("cell {c} references vertex {bad} (vertex count {n})"),
                });
            }
        }
        for (i, v) in self.vertices.iter().enumerate() {
            if v.iter().any(|x| !x.is_finite()) {
                return Err(MeshError::InvalidMesh {
                    what: format!("vertex {i} has non-finite coordinates"),
                });
            }
        }
        Ok(())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn point(&self, index: usize) -> Point3<f64> {
        let [x, y, z] = self.vertices[index];
        Point3::new(x, y, z)
    }

    /// Edge vectors from vertex 0 of a cell, as the columns of a matrix.
    pub fn cell_jacobian(&self, cell: usize) -> Matrix3<f64> {
        let [a, b, c, d] = self.cells[cell];
        let p0 = self.point(a);
        Matrix3::from_columns(&[
            self.point(b) - p0,
            self.point(c) - p0,
            self.point(d) - p0,
        ])
    }

    pub fn cell_volume(&self, cell: usize) -> f64 {
        self.cell_jacobian(cell).determinant().abs() / 6.0
    }

    pub fn volume(&self) -> f64 {
        (0..self.cells.len()).map(|c| self.cell_volume(c)).sum()
    }

    /// Facets that belong to exactly one cell, ordered by (cell, local face).
    pub fn exterior_facets(&self) -> Vec<ExteriorFacet> {
        let mut seen: HashMap<[usize; 3], (usize, ExteriorFacet)> = HashMap::new();
        let mut order = Vec::new();
        for (c, cell) in self.cells.iter().enumerate() {
            for (local, opposite) in CELL_FACES {
                let vertices = [cell[local[0]], cell[local[1]], cell[local[2]]];
                let mut key = vertices;
                key.sort_unstable();
                let entry = seen.entry(key).or_insert_with(|| {
                    order.push(key);
                    (
                        0,
                        ExteriorFacet {
                            vertices,
                            cell: c,
                            opposite: cell[opposite],
                        },
                    )
                });
                entry.0 += 1;
            }
        }
        order
            .into_iter()
            .filter_map(|key| seen.get(&key))
            .filter(|(count, _)| *count == 1)
            .map(|(_, facet)| *facet)
            .collect()
    }

    /// (shortest, longest) edge length over every cell.
    pub fn edge_length_range(&self) -> (f64, f64) {
        let mut min = f64::INFINITY;
        let mut max = 0.0_f64;
        for cell in &self.cells {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    let l = (self.point(cell[j]) - self.point(cell[i])).norm();
                    min = min.min(l);
                    max = max.max(l);
                }
            }
        }
        (min, max)
    }

    pub fn facet_area(&self, facet: &ExteriorFacet) -> f64 {
        let [a, b, c] = facet.vertices;
        triangle_area(self.point(a), self.point(b), self.point(c))
    }

    /// Unit normal pointing out of the owning cell.
    pub fn facet_normal(&self, facet: &ExteriorFacet) -> Vector3<f64> {
        let [a, b, c] = facet.vertices;
        let pa = self.point(a);
        let n = (self.point(b) - pa).cross(&(self.point(c) - pa));
        let n = n.normalize();
        if n.dot(&(self.point(facet.opposite) - pa)) > 0.0 {
            -n
        } else {
            n
        }
    }

    /// Axis-aligned box split into `6·nx·ny·nz` tetrahedra.
    ///
    /// Every hexahedron is cut along its main diagonal, which keeps the
    /// decomposition conforming between neighbours. Used for fixtures and
    /// quick validation meshes.
    pub fn structured_box(
        origin: [f64; 3],
        extent: [f64; 3],
        divisions: [usize; 3],
    ) -> MeshResult<Self> {
        let [nx, ny, nz] = divisions;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(MeshError::InvalidMesh {
                what: "box divisions must be positive".to_string(),
            });
        }
        let index = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    vertices.push([
                        origin[0] + extent[0] * i as f64 / nx as f64,
                        origin[1] + extent[1] * j as f64 / ny as f64,
                        origin[2] + extent[2] * k as f64 / nz as f64,
                    ]);
                }
            }
        }

        const AXIS_ORDERS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut cells = Vec::with_capacity(6 * nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    for axes in AXIS_ORDERS {
                        let mut corner = [i, j, k];
                        let mut tet = [index(i, j, k), 0, 0, 0];
                        for (slot, axis) in axes.iter().enumerate() {
                            corner[*axis] += 1;
                            tet[slot + 1] = index(corner[0], corner[1], corner[2]);
                        }
                        cells.push(tet);
                    }
                }
            }
        }
        Self::new(vertices, cells)
    }
}

pub fn triangle_area(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube(n: usize) -> TetMesh {
        TetMesh::structured_box([0.0; 3], [1.0; 3], [n, n, n]).unwrap()
    }

    #[test]
    fn box_volume_and_counts() {
        let mesh = unit_cube(2);
        assert_eq!(mesh.vertex_count(), 27);
        assert_eq!(mesh.cells.len(), 48);
        assert!((mesh.volume() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exterior_facets_cover_the_surface() {
        let mesh = unit_cube(2);
        let facets = mesh.exterior_facets();
        // 6 faces x 4 squares x 2 triangles
        assert_eq!(facets.len(), 48);
        let area: f64 = facets.iter().map(|f| mesh.facet_area(f)).sum();
        assert!((area - 6.0).abs() < 1e-12);
    }

    #[test]
    fn normals_point_outward() {
        let mesh = unit_cube(1);
        let center = Point3::new(0.5, 0.5, 0.5);
        for facet in mesh.exterior_facets() {
            let n = mesh.facet_normal(&facet);
            let p = mesh.point(facet.vertices[0]);
            assert!(n.dot(&(p - center)) > 0.0);
            assert!((n.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn edge_range_of_unit_cube() {
        let (min, max) = unit_cube(1).edge_length_range();
        assert!((min - 1.0).abs() < 1e-12);
        assert!((max - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rejects_dangling_vertex_reference() {
        let err = TetMesh::new(vec![[0.0; 3]; 3], vec![[0, 1, 2, 3]]).unwrap_err();
        assert!(format!("{err}").contains("references vertex 3"));
    }
}
