//! Series registry: registration, per-step append, cycle close, report rows.

use std::collections::HashMap;

use pv_core::{ratio, rms};
use tracing::{debug, warn};

use crate::cycle::{CycleBoundary, window};
use crate::series::{CalibrationId, FunctionalSeries, SeriesHandle, SeriesSpec};
use crate::{SeriesError, SeriesResult};

/// Raw values divided by the first scale value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledRow {
    pub factor: f64,
    pub values: Vec<f64>,
}

/// Rows rendered for one series.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRows {
    pub raw: Vec<f64>,
    pub scaled: Option<ScaledRow>,
    pub normalized: Option<Vec<f64>>,
    pub relative: Option<Vec<f64>>,
}

#[derive(Debug, Clone)]
struct Calibration {
    name: String,
    values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SeriesRegistry {
    steps_per_cycle: usize,
    calibrations: Vec<Calibration>,
    series: Vec<FunctionalSeries>,
    index: HashMap<String, SeriesHandle>,
    cycles: Vec<u32>,
}

impl SeriesRegistry {
    pub fn new(steps_per_cycle: usize) -> Self {
        Self {
            steps_per_cycle,
            calibrations: Vec::new(),
            series: Vec::new(),
            index: HashMap::new(),
            cycles: Vec::new(),
        }
    }

    pub fn steps_per_cycle(&self) -> usize {
        self.steps_per_cycle
    }

    /// Creates an empty calibration cell, populated later during initialization.
    pub fn add_calibration(&mut self, name: &str) -> CalibrationId {
        self.calibrations.push(Calibration {
            name: name.to_string(),
            values: Vec::new(),
        });
        CalibrationId(self.calibrations.len() - 1)
    }

    pub fn push_calibration(&mut self, id: CalibrationId, value: f64) -> SeriesResult<()> {
        let cell = self
            .calibrations
            .get_mut(id.0)
            .ok_or(SeriesError::UnknownCalibration { id: id.0 })?;
        debug!(calibration = %cell.name, value, "Calibration value set");
        cell.values.push(value);
        Ok(())
    }

    /// First value of a calibration cell, if populated.
    pub fn calibration(&self, id: CalibrationId) -> Option<f64> {
        self.calibrations
            .get(id.0)
            .and_then(|c| c.values.first().copied())
    }

    pub fn register(&mut self, spec: SeriesSpec) -> SeriesResult<SeriesHandle> {
        if self.index.contains_key(&spec.key) {
            return Err(SeriesError::DuplicateKey { key: spec.key });
        }
        for id in [spec.kind.scale(), spec.kind.normalization()]
            .into_iter()
            .flatten()
        {
            if id.0 >= self.calibrations.len() {
                return Err(SeriesError::UnknownCalibration { id: id.0 });
            }
        }
        let handle = SeriesHandle(self.series.len());
        self.index.insert(spec.key.clone(), handle);
        self.series.push(FunctionalSeries::new(spec));
        Ok(handle)
    }

    pub fn handle(&self, key: &str) -> SeriesResult<SeriesHandle> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| SeriesError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Panics if `handle` was issued by another registry; see `try_get`.
    pub fn get(&self, handle: SeriesHandle) -> &FunctionalSeries {
        &self.series[handle.0]
    }

    pub fn try_get(&self, handle: SeriesHandle) -> SeriesResult<&FunctionalSeries> {
        self.series
            .get(handle.0)
            .ok_or(SeriesError::UnknownHandle { index: handle.0 })
    }

    pub fn by_key(&self, key: &str) -> SeriesResult<&FunctionalSeries> {
        Ok(self.get(self.handle(key)?))
    }

    /// Series in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (SeriesHandle, &FunctionalSeries)> + '_ {
        self.series
            .iter()
            .enumerate()
            .map(|(i, s)| (SeriesHandle(i), s))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Panics if `handle` was issued by another registry.
    pub fn append(&mut self, handle: SeriesHandle, value: f64) {
        self.series[handle.0].values.push(value);
    }

    pub fn append_key(&mut self, key: &str, value: f64) -> SeriesResult<()> {
        let handle = self.handle(key)?;
        self.append(handle, value);
        Ok(())
    }

    /// Appends the RMS of the cycle window to `cycle_values`.
    ///
    /// Returns `None` without appending when the series has no values in the
    /// window.
    pub fn close_cycle(&mut self, handle: SeriesHandle, cycle: u32) -> Option<f64> {
        let range = window(cycle, self.steps_per_cycle);
        let series = &mut self.series[handle.0];
        let end = range.end.min(series.values.len());
        let start = range.start.min(end);
        if start == end {
            return None;
        }
        let value = rms(&series.values[start..end]);
        series.cycle_values.push(value);
        Some(value)
    }

    /// Closes the cycle on every monitored series with pending values.
    /// Unmonitored series keep no cycle values. Returns the number of series
    /// aggregated.
    pub fn close_all(&mut self, boundary: &CycleBoundary) -> usize {
        let monitored: Vec<SeriesHandle> = self
            .iter()
            .filter(|(_, s)| s.spec.monitored)
            .map(|(h, _)| h)
            .collect();
        let closed = monitored
            .into_iter()
            .filter_map(|h| self.close_cycle(h, boundary.cycle))
            .count();
        self.cycles.push(boundary.cycle);
        debug!(cycle = boundary.cycle, closed, "Closed cycle");
        closed
    }

    /// Whole seconds closed so far.
    pub fn cycles(&self) -> &[u32] {
        &self.cycles
    }

    fn scaled_row(&self, series: &FunctionalSeries, values: &[f64]) -> Option<ScaledRow> {
        let id = series.spec.kind.scale()?;
        let factor = self.calibration(id)?;
        Some(ScaledRow {
            factor,
            values: values.iter().map(|v| v / factor).collect(),
        })
    }

    fn normalized_row(&self, series: &FunctionalSeries, values: &[f64]) -> Option<Vec<f64>> {
        let id = series.spec.kind.normalization()?;
        match self.calibration(id) {
            Some(n) => Some(values.iter().map(|v| v / n).collect()),
            None => {
                warn!(
                    series = %series.spec.key,
                    calibration = %self.calibrations[id.0].name,
                    "Normalization missing, normalized row omitted"
                );
                None
            }
        }
    }

    /// Pointwise ratio against the reference series, `None` if not relative
    /// or if the series is empty.
    fn relative_values(&self, series: &FunctionalSeries) -> SeriesResult<Option<Vec<f64>>> {
        let Some(reference_key) = series.spec.kind.relative() else {
            return Ok(None);
        };
        if series.values.is_empty() {
            return Ok(None);
        }
        let reference = self.by_key(reference_key)?;
        if reference.values.len() != series.values.len() {
            return Err(SeriesError::LengthMismatch {
                key: series.spec.key.clone(),
                reference: reference_key.to_string(),
                expected: reference.values.len(),
                found: series.values.len(),
            });
        }
        Ok(Some(
            series
                .values
                .iter()
                .zip(&reference.values)
                .map(|(&v, &r)| ratio(v, r))
                .collect(),
        ))
    }

    /// Per-step rows of one series.
    pub fn derive_report_rows(&self, handle: SeriesHandle) -> SeriesResult<ReportRows> {
        let series = self.get(handle);
        Ok(ReportRows {
            raw: series.values.clone(),
            scaled: self.scaled_row(series, &series.values),
            normalized: self.normalized_row(series, &series.values),
            relative: self.relative_values(series)?,
        })
    }

    /// Per-cycle rows of one series; the relative row is the RMS of the
    /// per-step relative values over each closed cycle.
    pub fn derive_cycle_rows(&self, handle: SeriesHandle) -> SeriesResult<ReportRows> {
        let series = self.get(handle);
        let relative = self.relative_values(series)?.map(|rel| {
            self.cycles
                .iter()
                .map(|&c| {
                    let range = window(c, self.steps_per_cycle);
                    let end = range.end.min(rel.len());
                    let start = range.start.min(end);
                    rms(&rel[start..end])
                })
                .collect()
        });
        Ok(ReportRows {
            raw: series.cycle_values.clone(),
            scaled: self.scaled_row(series, &series.cycle_values),
            normalized: self.normalized_row(series, &series.cycle_values),
            relative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::SeriesKind;

    #[test]
    fn duplicate_and_unknown_keys() {
        let mut reg = SeriesRegistry::new(4);
        reg.register(SeriesSpec::plain("d", "divergence", "DC")).unwrap();
        assert!(matches!(
            reg.register(SeriesSpec::plain("d", "again", "DD")),
            Err(SeriesError::DuplicateKey { .. })
        ));
        assert!(matches!(
            reg.append_key("nope", 1.0),
            Err(SeriesError::UnknownKey { .. })
        ));
        assert!(matches!(
            reg.register(SeriesSpec::new(
                "s",
                "scaled",
                "S",
                SeriesKind::Scaled {
                    scale: CalibrationId(3)
                }
            )),
            Err(SeriesError::UnknownCalibration { id: 3 })
        ));
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let mut big = SeriesRegistry::new(4);
        big.register(SeriesSpec::plain("a", "first", "A")).unwrap();
        let second = big.register(SeriesSpec::plain("b", "second", "B")).unwrap();
        let mut small = SeriesRegistry::new(4);
        let own = small.register(SeriesSpec::plain("a", "first", "A")).unwrap();
        assert_eq!(small.try_get(own).unwrap().key(), "a");
        assert!(matches!(
            small.try_get(second),
            Err(SeriesError::UnknownHandle { index: 1 })
        ));
    }

    #[test]
    fn close_all_skips_unmonitored_series_with_values() {
        let mut reg = SeriesRegistry::new(2);
        let watched = reg.register(SeriesSpec::plain("d", "divergence", "DC").monitored()).unwrap();
        let plain = reg.register(SeriesSpec::plain("pg", "pressure gradient", "PG")).unwrap();
        for v in [3.0, 4.0] {
            reg.append(watched, v);
            reg.append(plain, v);
        }
        let closed = reg.close_all(&CycleBoundary {
            cycle: 1,
            window: 0..2,
        });
        assert_eq!(closed, 1);
        assert!((reg.get(watched).cycle_values()[0] - 12.5_f64.sqrt()).abs() < 1e-12);
        assert!(reg.get(plain).cycle_values().is_empty());
        assert_eq!(reg.get(plain).values().len(), 2);
    }

    #[test]
    fn plain_series_has_only_raw_row() {
        let mut reg = SeriesRegistry::new(4);
        let h = reg.register(SeriesSpec::plain("ap_norm", "analytic pressure norm", "APN")).unwrap();
        reg.append(h, 2.0);
        reg.append(h, 3.0);
        let rows = reg.derive_report_rows(h).unwrap();
        assert_eq!(rows.raw, vec![2.0, 3.0]);
        assert_eq!(rows.scaled, None);
        assert_eq!(rows.normalized, None);
        assert_eq!(rows.relative, None);
    }

    #[test]
    fn scaled_normalized_and_relative_rows() {
        let mut reg = SeriesRegistry::new(2);
        let scale = reg.add_calibration("scale");
        let norm = reg.add_calibration("vel");
        let reference = reg.register(SeriesSpec::plain("av", "analytic", "AV")).unwrap();
        let err = reg
            .register(SeriesSpec::new(
                "e",
                "error",
                "E",
                SeriesKind::ScaledRelativeNormalized {
                    scale,
                    reference: "av".to_string(),
                    normalization: norm,
                },
            ))
            .unwrap();
        reg.push_calibration(scale, 2.0).unwrap();
        for (e, a) in [(1.0, 4.0), (3.0, 6.0)] {
            reg.append(err, e);
            reg.append(reference, a);
        }

        // normalization never populated: omitted, not an error
        let rows = reg.derive_report_rows(err).unwrap();
        assert_eq!(rows.scaled.as_ref().unwrap().values, vec![0.5, 1.5]);
        assert_eq!(rows.normalized, None);
        assert_eq!(rows.relative, Some(vec![0.25, 0.5]));

        reg.push_calibration(norm, 10.0).unwrap();
        let rows = reg.derive_report_rows(err).unwrap();
        assert_eq!(rows.normalized, Some(vec![0.1, 0.3]));
    }

    #[test]
    fn relative_length_mismatch() {
        let mut reg = SeriesRegistry::new(4);
        let reference = reg.register(SeriesSpec::plain("av", "analytic", "AV")).unwrap();
        let err = reg
            .register(SeriesSpec::new(
                "e",
                "error",
                "E",
                SeriesKind::Relative {
                    reference: "av".to_string(),
                },
            ))
            .unwrap();
        reg.append(err, 1.0);
        reg.append(err, 1.0);
        reg.append(reference, 1.0);
        assert!(matches!(
            reg.derive_report_rows(err),
            Err(SeriesError::LengthMismatch {
                expected: 1,
                found: 2,
                ..
            })
        ));
    }

    #[test]
    fn relative_cycle_row_is_rms_of_relative_values() {
        let mut reg = SeriesRegistry::new(2);
        let reference = reg.register(SeriesSpec::plain("av", "analytic", "AV")).unwrap();
        let err = reg
            .register(
                SeriesSpec::new(
                    "e",
                    "error",
                    "E",
                    SeriesKind::Relative {
                        reference: "av".to_string(),
                    },
                )
                .monitored(),
            )
            .unwrap();
        for (e, a) in [(1.0, 1.0), (1.0, 1.0), (3.0, 1.0), (4.0, 1.0)] {
            reg.append(err, e);
            reg.append(reference, a);
        }
        assert_eq!(
            reg.close_all(&CycleBoundary {
                cycle: 2,
                window: 2..4
            }),
            1
        );
        let rows = reg.derive_cycle_rows(err).unwrap();
        // window [2, 4) holds 3 and 4
        assert_eq!(rows.raw.len(), 1);
        assert!((rows.raw[0] - 12.5_f64.sqrt()).abs() < 1e-12);
        let relative = rows.relative.unwrap();
        assert_eq!(relative.len(), 1);
        assert!((relative[0] - 12.5_f64.sqrt()).abs() < 1e-12);
    }

}
