//! End-of-run reporting: tables, manifest and sentinels.

use std::fs;
use std::path::Path;

use pv_core::TimeControl;
use pv_series::SeriesRegistry;
use tracing::{info, warn};

use crate::hash::compute_run_id;
use crate::status::{StatusRecord, error_chain};
use crate::tables::{self, Row};
use crate::types::{RunManifest, RunMetadata, RunOutcome};
use crate::writer::ReportWriter;
use crate::{ReportError, ReportResult};

pub const TIME_LINES_FILE: &str = "report_time_lines.csv";
pub const SECONDS_FILE: &str = "report_seconds.csv";
pub const SUMMARY_FILE: &str = "report.csv";
pub const SUMMARY_HEADER_FILE: &str = "report_h.csv";
pub const TIMING_FILE: &str = "report_timecontrol.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// State of a run at report time.
#[derive(Clone, Copy)]
pub struct ReportInput<'a> {
    pub registry: &'a SeriesRegistry,
    pub times: &'a [f64],
    pub timing: &'a TimeControl,
}

pub struct ReportGenerator {
    writer: ReportWriter,
    metadata: RunMetadata,
    solver_version: String,
}

impl ReportGenerator {
    pub fn new(writer: ReportWriter, metadata: RunMetadata, solver_version: &str) -> Self {
        Self {
            writer,
            metadata,
            solver_version: solver_version.to_string(),
        }
    }

    pub fn writer(&self) -> &ReportWriter {
        &self.writer
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn write_status(&self, t: f64, label: &str, value: f64) -> ReportResult<()> {
        self.writer.write_status(
            &self.metadata.name,
            &StatusRecord {
                t,
                dt_ms: self.metadata.dt_ms(),
                time: self.metadata.time,
                label,
                value,
            },
        )
    }

    fn write_tables(&self, input: ReportInput<'_>, lenient: bool) -> ReportResult<Vec<String>> {
        let name = &self.metadata.name;
        let total_hours = input.timing.elapsed().as_secs_f64() / 3600.0;
        let summary = tables::summary(
            name,
            &self.metadata.summary_cell(),
            total_hours,
            input.registry,
            lenient,
        )?;
        let files: [(&str, Vec<Row>); 5] = [
            (
                TIME_LINES_FILE,
                tables::time_lines(name, input.registry, input.times, lenient)?,
            ),
            (SECONDS_FILE, tables::seconds(name, input.registry, lenient)?),
            (SUMMARY_FILE, vec![summary.data.clone()]),
            (SUMMARY_HEADER_FILE, vec![summary.header, summary.data]),
            (TIMING_FILE, tables::timing(name, &input.timing.report())),
        ];
        let mut written = Vec::new();
        for (file, rows) in files {
            if self.writer.write_table(file, &rows)?.is_some() {
                written.push(file.to_string());
            }
        }
        Ok(written)
    }

    fn manifest(&self, input: ReportInput<'_>, outcome: RunOutcome, files: Vec<String>) -> RunManifest {
        RunManifest {
            run_id: compute_run_id(&self.metadata, &self.solver_version),
            name: self.metadata.name.clone(),
            problem: self.metadata.problem.clone(),
            mesh: self.metadata.mesh.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            outcome,
            steps: input.times.len(),
            cycles: input.registry.cycles().to_vec(),
            total_time_hours: input.timing.elapsed().as_secs_f64() / 3600.0,
            solver_version: self.solver_version.clone(),
            files,
        }
    }

    /// Success path: all tables, manifest, status removed, OK sentinel.
    pub fn finish(&self, input: ReportInput<'_>) -> ReportResult<RunManifest> {
        let mut files = self.write_tables(input, false)?;
        files.push(MANIFEST_FILE.to_string());
        let manifest = self.manifest(input, RunOutcome::Completed, files);
        self.writer.write_json(MANIFEST_FILE, &manifest)?;
        self.writer.remove_status(&self.metadata.name)?;
        self.writer.write_ok(&self.metadata.name)?;
        info!(
            name = %self.metadata.name,
            run_id = %manifest.run_id,
            dir = %self.writer.results_dir().display(),
            "Report written"
        );
        Ok(manifest)
    }

    /// Failure path: partial tables, manifest, failure sentinel carrying the
    /// error chain, status removed.
    pub fn fail(
        &self,
        input: ReportInput<'_>,
        t: f64,
        error: &dyn std::error::Error,
    ) -> ReportResult<RunManifest> {
        let trace = error_chain(error);
        let mut files = match self.write_tables(input, true) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "Partial report could not be written");
                Vec::new()
            }
        };
        files.push(MANIFEST_FILE.to_string());
        let manifest = self.manifest(
            input,
            RunOutcome::Failed {
                t,
                message: error.to_string(),
            },
            files,
        );
        self.writer.write_json(MANIFEST_FILE, &manifest)?;
        self.writer
            .write_failure(&self.metadata.name, t, &trace)?;
        self.writer.remove_status(&self.metadata.name)?;
        warn!(name = %self.metadata.name, t, error = %error, "Run failed");
        Ok(manifest)
    }
}

pub fn load_manifest(results_dir: &Path) -> ReportResult<RunManifest> {
    let path = results_dir.join(MANIFEST_FILE);
    if !path.exists() {
        return Err(ReportError::NotFound { path });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Header/value pairs of `report_h.csv`.
pub fn read_summary(results_dir: &Path) -> ReportResult<Vec<(String, String)>> {
    let path = results_dir.join(SUMMARY_HEADER_FILE);
    if !path.exists() {
        return Err(ReportError::NotFound { path });
    }
    let content = fs::read_to_string(&path)?;
    let mut lines = content.lines();
    let (Some(header), Some(data)) = (lines.next(), lines.next()) else {
        return Err(ReportError::Malformed {
            path,
            what: "expected a header and a data row".to_string(),
        });
    };
    let header: Vec<&str> = header.split(';').collect();
    let data: Vec<&str> = data.split(';').collect();
    if header.len() != data.len() {
        return Err(ReportError::Malformed {
            path,
            what: format!("{} columns in header, {} in data", header.len(), data.len()),
        });
    }
    Ok(header
        .into_iter()
        .zip(data)
        .map(|(h, d)| (h.to_string(), d.to_string()))
        .collect())
}
