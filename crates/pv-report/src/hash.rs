//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};

use crate::types::RunMetadata;

pub fn compute_run_id(metadata: &RunMetadata, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let metadata_json = serde_json::to_string(metadata).unwrap_or_default();
    hasher.update(metadata_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
