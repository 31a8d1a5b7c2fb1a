//! Boundary subdomain classification by planar membership.
//!
//! A facet is assigned to an inflow/outflow plane when all of its vertices lie
//! within `edge_min / 10` of that plane. Planes are tried in the order the
//! caller declared them and the first match wins. Two planes are assumed never
//! to both contain a whole exterior facet; near a plane intersection a
//! degenerate facet silently takes the earlier plane.

use nalgebra::Vector3;
use pv_core::SubdomainId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::mesh::{ExteriorFacet, TetMesh};
use crate::sidecar::{InflowRecord, OutflowRecord, Sidecar};
use crate::{MeshError, MeshResult};

/// Ratio between the shortest mesh edge and the plane distance tolerance.
const TOLERANCE_DIVISOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PlaneRole {
    Inflow {
        radius: f64,
        /// Radius of the reference geometry whose volume flow the
        /// inflow profile is rescaled to.
        reference_radius: f64,
    },
    Outflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneDef {
    pub number: u32,
    pub normal: [f64; 3],
    pub center: [f64; 3],
    #[serde(flatten)]
    pub role: PlaneRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdomainRole {
    Wall,
    Inflow,
    Outflow,
}

/// Geometric summary of one tagged boundary part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subdomain {
    pub id: SubdomainId,
    pub role: SubdomainRole,
    pub normal: Option<[f64; 3]>,
    pub center: Option<[f64; 3]>,
    pub plane_offset: Option<f64>,
    pub radius: Option<f64>,
    pub area: f64,
    pub reference_coef: Option<f64>,
}

/// Per-facet boundary markers, parallel to `facets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetTags {
    pub facets: Vec<ExteriorFacet>,
    pub ids: Vec<SubdomainId>,
}

impl FacetTags {
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn tagged(&self, id: SubdomainId) -> impl Iterator<Item = &ExteriorFacet> + '_ {
        self.facets
            .iter()
            .zip(&self.ids)
            .filter(move |(_, tag)| **tag == id)
            .map(|(facet, _)| facet)
    }

    pub fn count(&self, id: SubdomainId) -> usize {
        self.ids.iter().filter(|tag| **tag == id).count()
    }

    /// Surface measure of subdomain `id` (integral of 1 over its facets).
    pub fn area(&self, mesh: &TetMesh, id: SubdomainId) -> f64 {
        self.tagged(id).map(|f| mesh.facet_area(f)).sum()
    }
}

#[derive(Debug, Clone)]
struct Plane {
    def: PlaneDef,
    id: SubdomainId,
    normal: Vector3<f64>,
    offset: f64,
}

impl Plane {
    fn contains(&self, mesh: &TetMesh, vertex: usize, tol: f64) -> bool {
        (mesh.point(vertex).coords.dot(&self.normal) - self.offset).abs() < tol
    }
}

#[derive(Debug, Clone)]
pub struct SubdomainClassifier {
    planes: Vec<Plane>,
}

/// Output of a classification pass.
#[derive(Debug, Clone)]
pub struct Classification {
    pub tags: FacetTags,
    pub tolerance: f64,
    pub volume: f64,
    /// Wall first, then planes in declared order.
    pub subdomains: Vec<Subdomain>,
}

impl SubdomainClassifier {
    /// Normals are normalized so the tolerance is a true distance.
    pub fn new(defs: Vec<PlaneDef>) -> MeshResult<Self> {
        let mut planes: Vec<Plane> = Vec::with_capacity(defs.len());
        for def in defs {
            let id = SubdomainId::plane(def.number).map_err(|_| MeshError::InvalidPlane {
                number: def.number,
                what: "numbers below 2 are reserved (1 = wall)".to_string(),
            })?;
            if planes.iter().any(|p| p.id == id) {
                return Err(MeshError::InvalidPlane {
                    number: def.number,
                    what: "declared twice".to_string(),
                });
            }
            let raw = Vector3::from(def.normal);
            let length = raw.norm();
            if !(length.is_finite() && length > 0.0) {
                return Err(MeshError::InvalidPlane {
                    number: def.number,
                    what: "normal has zero length".to_string(),
                });
            }
            if let PlaneRole::Inflow { radius, .. } = def.role {
                if radius <= 0.0 {
                    return Err(MeshError::InvalidPlane {
                        number: def.number,
                        what: "inflow radius must be positive".to_string(),
                    });
                }
            }
            let normal = raw / length;
            let offset = Vector3::from(def.center).dot(&normal);
            planes.push(Plane {
                def,
                id,
                normal,
                offset,
            });
        }
        Ok(Self { planes })
    }

    pub fn classify(&self, mesh: &TetMesh) -> MeshResult<Classification> {
        let (edge_min, edge_max) = mesh.edge_length_range();
        let tolerance = edge_min / TOLERANCE_DIVISOR;
        info!(edge_min, edge_max, tolerance, "classifying exterior facets");

        let facets = mesh.exterior_facets();
        let ids: Vec<SubdomainId> = facets
            .iter()
            .map(|facet| self.tag_facet(mesh, facet, tolerance))
            .collect();
        let tags = FacetTags { facets, ids };

        let mut subdomains = vec![Subdomain {
            id: SubdomainId::WALL,
            role: SubdomainRole::Wall,
            normal: None,
            center: None,
            plane_offset: None,
            radius: None,
            area: tags.area(mesh, SubdomainId::WALL),
            reference_coef: None,
        }];
        for plane in &self.planes {
            let area = tags.area(mesh, plane.id);
            debug!(id = plane.id.get(), facets = tags.count(plane.id), area, "tagged plane");
            let (role, radius, reference_coef) = match plane.def.role {
                PlaneRole::Inflow {
                    radius,
                    reference_radius,
                } => (
                    SubdomainRole::Inflow,
                    Some(radius),
                    Some(reference_radius * reference_radius / (radius * radius)),
                ),
                PlaneRole::Outflow => (SubdomainRole::Outflow, None, None),
            };
            subdomains.push(Subdomain {
                id: plane.id,
                role,
                normal: Some(plane.def.normal),
                center: Some(plane.def.center),
                plane_offset: Some(plane.offset),
                radius,
                area,
                reference_coef,
            });
        }

        Ok(Classification {
            tags,
            tolerance,
            volume: mesh.volume(),
            subdomains,
        })
    }

    fn tag_facet(&self, mesh: &TetMesh, facet: &ExteriorFacet, tol: f64) -> SubdomainId {
        self.planes
            .iter()
            .find(|plane| facet.vertices.iter().all(|&v| plane.contains(mesh, v, tol)))
            .map(|plane| plane.id)
            .unwrap_or(SubdomainId::WALL)
    }
}

impl Classification {
    pub fn subdomain(&self, id: SubdomainId) -> Option<&Subdomain> {
        self.subdomains.iter().find(|s| s.id == id)
    }

    /// Calibration sidecar rows for the tagged mesh.
    pub fn sidecar(&self) -> Sidecar {
        let mut sidecar = Sidecar {
            volume: self.volume,
            inflows: Vec::new(),
            outflows: Vec::new(),
        };
        for s in &self.subdomains {
            match s.role {
                SubdomainRole::Wall => {}
                SubdomainRole::Inflow => sidecar.inflows.push(InflowRecord {
                    number: s.id.get(),
                    normal: s.normal.unwrap_or_default(),
                    center: s.center.unwrap_or_default(),
                    radius: s.radius.unwrap_or_default(),
                    reference_coef: s.reference_coef.unwrap_or(1.0),
                    area: s.area,
                }),
                SubdomainRole::Outflow => sidecar.outflows.push(OutflowRecord {
                    number: s.id.get(),
                    area: s.area,
                }),
            }
        }
        sidecar
    }
}
