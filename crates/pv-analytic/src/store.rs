//! Persisted basis fields.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calibration::FREQUENCIES;
use crate::{AnalyticError, AnalyticResult};

/// Viscosity factors with a precomputed basis, and their file suffixes.
const VISCOSITY_SUFFIXES: [(f64, &str); 4] =
    [(1.0, ""), (0.1, "nuL10"), (0.01, "nuL100"), (10.0, "nuH10")];

pub fn viscosity_suffix(nu_factor: f64) -> AnalyticResult<&'static str> {
    VISCOSITY_SUFFIXES
        .iter()
        .find(|(f, _)| (f - nu_factor).abs() <= 1e-9 * f)
        .map(|(_, s)| *s)
        .ok_or(AnalyticError::UnsupportedViscosity { factor: nu_factor })
}

/// `parab`, `real0..7`, `imag0..7`.
pub fn basis_field_names() -> Vec<String> {
    let mut names = vec!["parab".to_string()];
    for i in 0..FREQUENCIES.len() {
        names.push(format!("real{i}"));
        names.push(format!("imag{i}"));
    }
    names
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisStore {
    pub mesh: String,
    pub nu_factor: f64,
    pub fields: BTreeMap<String, Vec<f64>>,
}

impl BasisStore {
    pub fn file_name(mesh: &str, nu_factor: f64) -> AnalyticResult<String> {
        Ok(format!("precomputed_{mesh}{}.json", viscosity_suffix(nu_factor)?))
    }

    pub fn path(dir: &Path, mesh: &str, nu_factor: f64) -> AnalyticResult<PathBuf> {
        Ok(dir.join(Self::file_name(mesh, nu_factor)?))
    }

    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn save(&self, dir: &Path) -> AnalyticResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = Self::path(dir, &self.mesh, self.nu_factor)?;
        fs::write(&path, serde_json::to_string(self)?)?;
        Ok(path)
    }

    pub fn load(dir: &Path, mesh: &str, nu_factor: f64) -> AnalyticResult<Self> {
        let path = Self::path(dir, mesh, nu_factor)?;
        let text = fs::read_to_string(&path).map_err(|e| AnalyticError::Load {
            what: format!("{}: {e}", path.display()),
        })?;
        let store: BasisStore = serde_json::from_str(&text)?;
        if store.mesh != mesh {
            return Err(AnalyticError::Load {
                what: format!(
                    "{} was precomputed for mesh '{}', expected '{mesh}'",
                    path.display(),
                    store.mesh
                ),
            });
        }
        Ok(store)
    }
}
