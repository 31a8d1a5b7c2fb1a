//! Live status record and sentinel names.

/// Overwritten every step while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRecord<'a> {
    pub t: f64,
    pub dt_ms: i64,
    /// Simulated end time.
    pub time: f64,
    pub label: &'a str,
    pub value: f64,
}

impl StatusRecord<'_> {
    pub fn progress_percent(&self) -> f64 {
        if self.time > 0.0 {
            100.0 * self.t / self.time
        } else {
            0.0
        }
    }

    pub fn render(&self) -> String {
        format!(
            "t = {:5.3} (dt={:3}ms)\nprogress = {:3.0} %\n{} = {:5.3}\n",
            self.t,
            self.dt_ms,
            self.progress_percent(),
            self.label,
            self.value
        )
    }
}

pub fn status_file_name(name: &str) -> String {
    format!("{name}.run")
}

pub fn ok_file_name(name: &str) -> String {
    format!("{name}_OK.report")
}

pub fn failure_file_name(name: &str, t: f64) -> String {
    format!("{name}_failed_at_{t:5.3}.report")
}

/// Error message followed by its source chain, one cause per line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out.push('\n');
    out
}
