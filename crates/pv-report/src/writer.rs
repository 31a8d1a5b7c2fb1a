//! Rank-gated file output.
//!
//! Tables and the manifest go to the results directory; the live status
//! record and the sentinels go to the status directory, where a batch
//! scheduler can watch them.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::ReportResult;
use crate::status::{StatusRecord, failure_file_name, ok_file_name, status_file_name};
use crate::tables::{Row, render};

#[derive(Debug, Clone)]
pub struct ReportWriter {
    results_dir: PathBuf,
    status_dir: PathBuf,
    rank: u32,
}

impl ReportWriter {
    pub fn new(results_dir: PathBuf, status_dir: PathBuf, rank: u32) -> Self {
        Self {
            results_dir,
            status_dir,
            rank,
        }
    }

    /// Only rank 0 writes.
    pub fn is_writer(&self) -> bool {
        self.rank == 0
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn status_dir(&self) -> &Path {
        &self.status_dir
    }

    fn write(&self, dir: &Path, file: &str, content: &str) -> ReportResult<Option<PathBuf>> {
        if !self.is_writer() {
            return Ok(None);
        }
        fs::create_dir_all(dir)?;
        let path = dir.join(file);
        fs::write(&path, content)?;
        debug!(path = %path.display(), "Report file written");
        Ok(Some(path))
    }

    pub fn write_table(&self, file: &str, rows: &[Row]) -> ReportResult<Option<PathBuf>> {
        self.write(&self.results_dir, file, &render(rows))
    }

    pub fn write_json<T: Serialize>(&self, file: &str, value: &T) -> ReportResult<Option<PathBuf>> {
        let json = serde_json::to_string_pretty(value)?;
        self.write(&self.results_dir, file, &json)
    }

    pub fn write_status(&self, name: &str, record: &StatusRecord<'_>) -> ReportResult<()> {
        self.write(&self.status_dir, &status_file_name(name), &record.render())?;
        Ok(())
    }

    /// Removing a status file that was never written is not an error.
    pub fn remove_status(&self, name: &str) -> ReportResult<()> {
        if !self.is_writer() {
            return Ok(());
        }
        match fs::remove_file(self.status_dir.join(status_file_name(name))) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(name, "No status file to remove");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn write_ok(&self, name: &str) -> ReportResult<Option<PathBuf>> {
        self.write(&self.status_dir, &ok_file_name(name), "")
    }

    pub fn write_failure(&self, name: &str, t: f64, trace: &str) -> ReportResult<Option<PathBuf>> {
        self.write(&self.status_dir, &failure_file_name(name, t), trace)
    }
}
