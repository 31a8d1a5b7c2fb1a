//! Run metadata and manifest.

use serde::{Deserialize, Serialize};

pub type RunId = String;

/// Identifies a run and carries its resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub name: String,
    pub problem: String,
    pub mesh: String,
    pub dt: f64,
    pub time: f64,
    /// Resolved run configuration, as written into the summary table.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl RunMetadata {
    /// Metadata cell of the summary table: compact JSON, `;` replaced by `$`.
    pub fn summary_cell(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_default()
            .replace(';', "$")
    }

    pub fn dt_ms(&self) -> i64 {
        (self.dt * 1000.0).round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Failed { t: f64, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub name: String,
    pub problem: String,
    pub mesh: String,
    pub timestamp: String,
    pub outcome: RunOutcome,
    pub steps: usize,
    pub cycles: Vec<u32>,
    pub total_time_hours: f64,
    pub solver_version: String,
    pub files: Vec<String>,
}
