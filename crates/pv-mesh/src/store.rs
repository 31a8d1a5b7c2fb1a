//! Persisted tagged mesh: `<dir>/<name>.json` plus the `<dir>/<name>.ini` sidecar.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::FacetTags;
use crate::mesh::TetMesh;
use crate::sidecar::Sidecar;
use crate::{MeshError, MeshResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshStore {
    pub name: String,
    pub mesh: TetMesh,
    pub facet_tags: FacetTags,
}

impl MeshStore {
    pub fn mesh_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.json"))
    }

    pub fn sidecar_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.ini"))
    }

    pub fn save(&self, dir: &Path) -> MeshResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = Self::mesh_path(dir, &self.name);
        fs::write(&path, serde_json::to_string(self)?)?;
        Ok(path)
    }

    pub fn load(dir: &Path, name: &str) -> MeshResult<Self> {
        let path = Self::mesh_path(dir, name);
        if !path.exists() {
            return Err(MeshError::NotFound { path });
        }
        let content = fs::read_to_string(&path)?;
        let store: MeshStore = serde_json::from_str(&content)?;
        store.mesh.validate()?;
        if store.facet_tags.facets.len() != store.facet_tags.ids.len() {
            return Err(MeshError::InvalidMesh {
                what: format!(
                    "{} facets but {} tags",
                    store.facet_tags.facets.len(),
                    store.facet_tags.ids.len()
                ),
            });
        }
        Ok(store)
    }

    pub fn save_sidecar(dir: &Path, name: &str, sidecar: &Sidecar) -> MeshResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = Self::sidecar_path(dir, name);
        fs::write(&path, sidecar.to_text())?;
        Ok(path)
    }

    pub fn load_sidecar(dir: &Path, name: &str) -> MeshResult<Sidecar> {
        let path = Self::sidecar_path(dir, name);
        if !path.exists() {
            return Err(MeshError::NotFound { path });
        }
        Sidecar::parse(&fs::read_to_string(path)?)
    }
}
