//! Named stopwatches for the run timing breakdown.
//!
//! Each watch accumulates wall time across many start/end pairs. Watches are
//! registered up front with a human readable label and reported at the end of
//! a run as one row per watch.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::error::{CoreError, CoreResult};

#[derive(Debug)]
struct Watch {
    label: String,
    reported: bool,
    total: Duration,
    count: u64,
    started: Option<Instant>,
}

/// One row of the timing breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchReport {
    pub key: String,
    pub label: String,
    pub total_s: f64,
    pub count: u64,
    /// Fraction of total wall time since the `TimeControl` was created.
    pub share: f64,
}

impl WatchReport {
    pub fn average_s(&self) -> f64 {
        if self.count > 0 {
            self.total_s / self.count as f64
        } else {
            0.0
        }
    }
}

/// Registry of named stopwatches.
#[derive(Debug)]
pub struct TimeControl {
    created: Instant,
    order: Vec<String>,
    watches: BTreeMap<String, Watch>,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeControl {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            order: Vec::new(),
            watches: BTreeMap::new(),
        }
    }

    /// Register a watch. Re-registering keeps the accumulated time.
    pub fn init_watch(&mut self, key: &str, label: &str, reported: bool) {
        if self.watches.contains_key(key) {
            return;
        }
        self.order.push(key.to_string());
        self.watches.insert(
            key.to_string(),
            Watch {
                label: label.to_string(),
                reported,
                total: Duration::ZERO,
                count: 0,
                started: None,
            },
        );
    }

    pub fn start(&mut self, key: &str) -> CoreResult<()> {
        let watch = self.watch_mut(key)?;
        watch.started = Some(Instant::now());
        Ok(())
    }

    /// Stop a watch; ending a watch that is not running is a no-op.
    pub fn end(&mut self, key: &str) -> CoreResult<()> {
        let watch = self.watch_mut(key)?;
        if let Some(started) = watch.started.take() {
            watch.total += started.elapsed();
            watch.count += 1;
        }
        Ok(())
    }

    /// Record an externally measured duration.
    pub fn record(&mut self, key: &str, elapsed: Duration) -> CoreResult<()> {
        let watch = self.watch_mut(key)?;
        watch.total += elapsed;
        watch.count += 1;
        Ok(())
    }

    /// Run `f` between `start(key)` and `end(key)`.
    pub fn time<T>(&mut self, key: &str, f: impl FnOnce() -> T) -> CoreResult<T> {
        self.start(key)?;
        let out = f();
        self.end(key)?;
        Ok(out)
    }

    pub fn elapsed(&self) -> Duration {
        self.created.elapsed()
    }

    pub fn total_seconds(&self, key: &str) -> Option<f64> {
        self.watches.get(key).map(|w| w.total.as_secs_f64())
    }

    pub fn count(&self, key: &str) -> Option<u64> {
        self.watches.get(key).map(|w| w.count)
    }

    /// `true` while `key` has been started and not yet ended.
    pub fn is_running(&self, key: &str) -> bool {
        self.watches.get(key).is_some_and(|w| w.started.is_some())
    }

    /// Rows for watches flagged as reported, in registration order.
    pub fn report(&self) -> Vec<WatchReport> {
        let wall = self.elapsed().as_secs_f64().max(1e-12);
        self.order
            .iter()
            .filter_map(|key| self.watches.get(key).map(|w| (key, w)))
            .filter(|(_, w)| w.reported)
            .map(|(key, w)| {
                let total_s = w.total.as_secs_f64();
                WatchReport {
                    key: key.clone(),
                    label: w.label.clone(),
                    total_s,
                    count: w.count,
                    share: total_s / wall,
                }
            })
            .collect()
    }

    fn watch_mut(&mut self, key: &str) -> CoreResult<&mut Watch> {
        self.watches
            .get_mut(key)
            .ok_or_else(|| CoreError::UnknownWatch {
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_calls() {
        let mut tc = TimeControl::new();
        tc.init_watch("errorV", "Computed velocity error", true);
        tc.record("errorV", Duration::from_millis(5)).unwrap();
        tc.record("errorV", Duration::from_millis(15)).unwrap();
        assert_eq!(tc.count("errorV"), Some(2));
        let total = tc.total_seconds("errorV").unwrap();
        assert!((total - 0.020).abs() < 1e-9);

        let report = tc.report();
        assert_eq!(report.len(), 1);
        assert!((report[0].average_s() - 0.010).abs() < 1e-9);
    }

    #[test]
    fn unreported_watches_are_hidden() {
        let mut tc = TimeControl::new();
        tc.init_watch("status", "Wrote status file", false);
        tc.init_watch("divNorm", "Computed norm of divergence", true);
        tc.time("status", || ()).unwrap();
        let keys: Vec<_> = tc.report().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["divNorm".to_string()]);
    }

    #[test]
    fn unknown_watch_is_an_error() {
        let mut tc = TimeControl::new();
        assert!(tc.start("missing").is_err());
    }

    #[test]
    fn timed_closure_leaves_watch_stopped() {
        let mut tc = TimeControl::new();
        tc.init_watch("errorP", "Computed pressure error", true);
        let out: Result<f64, &str> = tc.time("errorP", || Err("bad field")).unwrap();
        assert!(out.is_err());
        assert!(!tc.is_running("errorP"));
        assert_eq!(tc.count("errorP"), Some(1));

        tc.start("errorP").unwrap();
        assert!(tc.is_running("errorP"));
        assert!(!tc.is_running("missing"));
    }

    #[test]
    fn end_without_start_is_noop() {
        let mut tc = TimeControl::new();
        tc.init_watch("saveP", "Saved pressure", true);
        tc.end("saveP").unwrap();
        assert_eq!(tc.count("saveP"), Some(0));
    }
}
