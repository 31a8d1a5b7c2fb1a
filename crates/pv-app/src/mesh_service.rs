//! Offline preparation: tagging a raw mesh and precomputing basis fields.

use std::fs;
use std::path::{Path, PathBuf};

use pv_analytic::{BasisStore, precompute_basis};
use pv_fields::P1Space;
use pv_mesh::{MeshStore, SubdomainClassifier, TetMesh};
use tracing::info;

use crate::config::{ClassifyConfig, MeshSource};
use crate::error::{AppError, AppResult};

/// Paths written by [`classify_mesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyResponse {
    pub mesh_path: PathBuf,
    pub sidecar_path: PathBuf,
    pub facets: usize,
    /// `(subdomain id, area)` with the wall first.
    pub areas: Vec<(u32, f64)>,
}

pub fn read_mesh(source: &MeshSource) -> AppResult<TetMesh> {
    match source {
        MeshSource::Box {
            origin,
            extent,
            divisions,
        } => Ok(TetMesh::structured_box(*origin, *extent, *divisions)?),
        MeshSource::File { path } => {
            let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
                path: path.clone(),
                source,
            })?;
            let raw: TetMesh = serde_json::from_str(&text)
                .map_err(|e| AppError::InvalidInput(format!("{}: {e}", path.display())))?;
            Ok(TetMesh::new(raw.vertices, raw.cells)?)
        }
    }
}

/// Tags exterior facets and stores the mesh with its calibration sidecar.
pub fn classify_mesh(config: &ClassifyConfig) -> AppResult<ClassifyResponse> {
    if config.planes.is_empty() {
        return Err(AppError::Config("at least one plane is required".to_string()));
    }
    let mesh = read_mesh(&config.source)?;
    let classifier = SubdomainClassifier::new(config.planes.clone())?;
    let classification = classifier.classify(&mesh)?;

    let areas: Vec<(u32, f64)> = classification
        .subdomains
        .iter()
        .map(|s| (s.id.get(), s.area))
        .collect();
    for &(id, area) in &areas {
        if area <= 0.0 {
            return Err(AppError::InvalidInput(format!(
                "no exterior facet lies on subdomain {id}"
            )));
        }
    }

    let sidecar = classification.sidecar();
    let facets = classification.tags.len();
    let store = MeshStore {
        name: config.name.clone(),
        mesh,
        facet_tags: classification.tags,
    };
    let mesh_path = store.save(&config.mesh_dir)?;
    let sidecar_path = MeshStore::save_sidecar(&config.mesh_dir, &config.name, &sidecar)?;
    info!(
        name = %config.name,
        facets,
        volume = classification.volume,
        path = %mesh_path.display(),
        "Mesh classified"
    );
    Ok(ClassifyResponse {
        mesh_path,
        sidecar_path,
        facets,
        areas,
    })
}

pub fn load_space(mesh_dir: &Path, mesh: &str) -> AppResult<P1Space> {
    let store = MeshStore::load(mesh_dir, mesh)?;
    Ok(P1Space::new(store.mesh, &store.facet_tags)?)
}

/// Evaluates and saves the basis fields of `mesh` for one viscosity factor.
pub fn precompute(
    mesh_dir: &Path,
    basis_dir: &Path,
    mesh: &str,
    nu_factor: f64,
) -> AppResult<PathBuf> {
    let space = load_space(mesh_dir, mesh)?;
    let store = precompute_basis(&space, mesh, nu_factor)?;
    let path = store.save(basis_dir)?;
    info!(mesh, nu_factor, path = %path.display(), "Basis fields precomputed");
    Ok(path)
}

pub fn has_basis(basis_dir: &Path, mesh: &str, nu_factor: f64) -> AppResult<bool> {
    Ok(BasisStore::path(basis_dir, mesh, nu_factor)?.exists())
}
