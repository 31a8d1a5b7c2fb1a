//! YAML run and mesh-preparation documents.

use std::fs;
use std::path::{Path, PathBuf};

use pv_control::{ControlConfig, WomersleyCylinder};
use pv_mesh::PlaneDef;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

fn default_results_root() -> PathBuf {
    PathBuf::from("results")
}

fn default_mesh_dir() -> PathBuf {
    PathBuf::from("meshes")
}

fn default_basis_dir() -> PathBuf {
    PathBuf::from("precomputed")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Replays the analytic solution, optionally perturbed.
    #[default]
    AnalyticReplay,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub kind: SolverKind,
    /// Relative amplitude added to the replayed corrected fields.
    #[serde(default)]
    pub perturbation: f64,
    /// Perturbation of the tentative fields; `None` skips the tentative stage.
    #[serde(default)]
    pub tentative_perturbation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run name; derived from the problem, mesh and timing when absent.
    #[serde(default)]
    pub name: Option<String>,
    pub mesh: String,
    pub dt: f64,
    /// Simulated end time in seconds.
    pub time: f64,
    #[serde(flatten)]
    pub control: ControlConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,
    #[serde(default = "default_mesh_dir")]
    pub mesh_dir: PathBuf,
    #[serde(default = "default_basis_dir")]
    pub basis_dir: PathBuf,
    #[serde(default)]
    pub rank: u32,
}

impl RunConfig {
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        let config: RunConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.mesh.trim().is_empty() {
            return Err(AppError::Config("mesh name is empty".to_string()));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 || self.dt > 1.0 {
            return Err(AppError::Config(format!(
                "dt must be in (0, 1], got {}",
                self.dt
            )));
        }
        if !self.time.is_finite() || self.time < self.dt {
            return Err(AppError::Config(format!(
                "time must be at least one step, got {}",
                self.time
            )));
        }
        if !self.solver.perturbation.is_finite() {
            return Err(AppError::Config("solver perturbation is not finite".to_string()));
        }
        self.control.validate()?;
        Ok(())
    }

    pub fn dt_ms(&self) -> i64 {
        (self.dt * 1000.0).round() as i64
    }

    /// Number of steps to reach `time`.
    pub fn step_count(&self) -> u64 {
        (self.time / self.dt).round() as u64
    }

    /// `WCYL_<mesh>_f<factor>_t<time>_dt<ms>` unless a name is configured.
    pub fn run_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "{}_{}_f{}_t{}_dt{}",
                WomersleyCylinder::CODE,
                self.mesh,
                self.control.factor,
                self.time,
                self.dt_ms()
            ),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        self.results_root.join(self.run_name())
    }
}

/// Where the raw tetrahedral mesh comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeshSource {
    /// JSON `{ vertices, cells }`.
    File { path: PathBuf },
    /// Structured box split into tetrahedra.
    Box {
        origin: [f64; 3],
        extent: [f64; 3],
        divisions: [usize; 3],
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    pub name: String,
    pub source: MeshSource,
    /// Inflow/outflow planes in match priority order.
    pub planes: Vec<PlaneDef>,
    #[serde(default = "default_mesh_dir")]
    pub mesh_dir: PathBuf,
}

impl ClassifyConfig {
    pub fn from_yaml(text: &str) -> AppResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_control::ErrorControlMode;

    #[test]
    fn run_config_with_flattened_control() {
        let cfg = RunConfig::from_yaml(
            "mesh: cyl_c1\ndt: 0.1\ntime: 2\nerror_control: test\nfactor: 1.5\nsolver:\n  perturbation: 0.01\n",
        )
        .unwrap();
        assert_eq!(cfg.control.error_control, ErrorControlMode::Test);
        assert_eq!(cfg.control.factor, 1.5);
        assert_eq!(cfg.control.divergence_threshold, 10.0);
        assert_eq!(cfg.solver.perturbation, 0.01);
        assert_eq!(cfg.step_count(), 20);
        assert_eq!(cfg.run_name(), "WCYL_cyl_c1_f1.5_t2_dt100");
        assert_eq!(cfg.results_dir(), PathBuf::from("results/WCYL_cyl_c1_f1.5_t2_dt100"));
    }

    #[test]
    fn rejects_invalid_timing() {
        assert!(RunConfig::from_yaml("mesh: m\ndt: 0\ntime: 1\n").is_err());
        assert!(RunConfig::from_yaml("mesh: m\ndt: 0.1\ntime: 0.01\n").is_err());
        assert!(RunConfig::from_yaml("mesh: m\ndt: 0.1\ntime: 1\nsave_stride: 0\n").is_err());
    }

    #[test]
    fn classify_config_parses_planes() {
        let cfg = ClassifyConfig::from_yaml(
            r#"
name: pipe
source:
  kind: box
  origin: [-5, -5, 0]
  extent: [10, 10, 20]
  divisions: [4, 4, 2]
planes:
  - number: 2
    normal: [0, 0, -1]
    center: [0, 0, 0]
    role: inflow
    radius: 5
    reference_radius: 5
  - number: 3
    normal: [0, 0, 1]
    center: [0, 0, 20]
    role: outflow
"#,
        )
        .unwrap();
        assert_eq!(cfg.planes.len(), 2);
        assert!(matches!(cfg.source, MeshSource::Box { divisions: [4, 4, 2], .. }));
        assert_eq!(cfg.mesh_dir, PathBuf::from("meshes"));
    }
}
