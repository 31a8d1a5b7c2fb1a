//! Rendering of series into `;`-delimited rows.
//!
//! Row layout is `name;what;abbrev;values...`. Every series with values gets
//! a raw row followed by its derived rows: scaled (`<abbrev>s`), normalized
//! (`<abbrev>n`) and relative (`<abbrev>r`).

use pv_core::WatchReport;
use pv_series::{ReportRows, SeriesError, SeriesHandle, SeriesRegistry, SeriesResult};
use tracing::warn;

pub type Row = Vec<String>;

/// Series whose last cycle aggregate goes into the one-row summary.
pub const SUMMARY_KEYS: [&str; 13] = [
    "u_L2", "u_H1", "u_H1w", "p", "u2L2", "u2H1", "u2H1w", "p2", "pgE", "pgE2", "d", "d2",
    "force_wall",
];

/// Keys whose normalized aggregate is reported when no relative row exists.
const NORMALIZED_SUMMARY_KEYS: [&str; 2] = ["p", "p2"];

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub header: Row,
    pub data: Row,
}

pub fn number(v: f64) -> String {
    format!("{v}")
}

fn row<'a>(
    name: &str,
    what: String,
    abbrev: String,
    values: impl IntoIterator<Item = &'a f64>,
) -> Row {
    let mut out = vec![name.to_string(), what, abbrev];
    out.extend(values.into_iter().map(|v| number(*v)));
    out
}

/// Derived rows; with `lenient` a series whose rows cannot be derived is
/// reduced to its raw values instead of failing the whole table.
fn derived(
    registry: &SeriesRegistry,
    handle: SeriesHandle,
    cycles: bool,
    lenient: bool,
) -> SeriesResult<ReportRows> {
    let result = if cycles {
        registry.derive_cycle_rows(handle)
    } else {
        registry.derive_report_rows(handle)
    };
    match result {
        Ok(rows) => Ok(rows),
        Err(err @ SeriesError::LengthMismatch { .. }) if lenient => {
            let series = registry.get(handle);
            warn!(series = %series.key(), error = %err, "Derived rows omitted");
            let raw = if cycles {
                series.cycle_values().to_vec()
            } else {
                series.values().to_vec()
            };
            Ok(ReportRows {
                raw,
                scaled: None,
                normalized: None,
                relative: None,
            })
        }
        Err(err) => Err(err),
    }
}

fn push_series_rows(
    out: &mut Vec<Row>,
    name: &str,
    display: &str,
    abbrev: &str,
    rows: &ReportRows,
    scale_note: bool,
) {
    out.push(row(name, display.to_string(), abbrev.to_string(), &rows.raw));
    if let Some(scaled) = &rows.scaled {
        let mut r = row(
            name,
            format!("scaled {display}"),
            format!("{abbrev}s"),
            &scaled.values,
        );
        if scale_note {
            r.push(format!("scale factor:{}", number(scaled.factor)));
        }
        out.push(r);
    }
    if let Some(normalized) = &rows.normalized {
        out.push(row(
            name,
            format!("normalized {display}"),
            format!("{abbrev}n"),
            normalized,
        ));
    }
    if let Some(relative) = &rows.relative {
        out.push(row(
            name,
            format!("relative {display}"),
            format!("{abbrev}r"),
            relative,
        ));
    }
}

/// `report_time_lines.csv`: one block per non-empty series, columned by step time.
pub fn time_lines(
    name: &str,
    registry: &SeriesRegistry,
    times: &[f64],
    lenient: bool,
) -> SeriesResult<Vec<Row>> {
    let mut out = vec![row(name, "what".to_string(), "time".to_string(), times)];
    out[0][0] = "name".to_string();
    for (handle, series) in registry.iter() {
        if series.values().is_empty() {
            continue;
        }
        let spec = series.spec();
        let rows = derived(registry, handle, false, lenient)?;
        push_series_rows(&mut out, name, &spec.display_name, &spec.abbreviation, &rows, true);
    }
    Ok(out)
}

/// `report_seconds.csv`: one block per monitored series, columned by cycle.
pub fn seconds(name: &str, registry: &SeriesRegistry, lenient: bool) -> SeriesResult<Vec<Row>> {
    let mut header = vec!["name".to_string(), "what".to_string(), "time".to_string()];
    header.extend(registry.cycles().iter().map(|c| c.to_string()));
    let mut out = vec![header];
    for (handle, series) in registry.iter() {
        if !series.spec().monitored {
            continue;
        }
        let spec = series.spec();
        let rows = derived(registry, handle, true, lenient)?;
        push_series_rows(&mut out, name, &spec.display_name, &spec.abbreviation, &rows, false);
    }
    Ok(out)
}

/// `report.csv` / `report_h.csv`.
pub fn summary(
    name: &str,
    metadata: &str,
    total_hours: f64,
    registry: &SeriesRegistry,
    lenient: bool,
) -> SeriesResult<Summary> {
    let mut header = vec![
        "name".to_string(),
        "metadata".to_string(),
        "totalTimeHours".to_string(),
    ];
    let mut data = vec![name.to_string(), metadata.to_string(), number(total_hours)];
    for key in SUMMARY_KEYS {
        let Ok(handle) = registry.handle(key) else {
            continue;
        };
        let series = registry.get(handle);
        let abbrev = &series.spec().abbreviation;
        header.push(format!("last_cycle_{abbrev}"));
        data.push(number(series.last_cycle().unwrap_or(0.0)));

        let rows = derived(registry, handle, true, lenient)?;
        match rows.relative.as_deref() {
            Some([.., last]) => {
                header.push(format!("last_cycle_{abbrev}r"));
                data.push(number(*last));
            }
            _ if NORMALIZED_SUMMARY_KEYS.contains(&key) => {
                header.push(format!("last_cycle_{abbrev}n"));
                let last = rows
                    .normalized
                    .as_ref()
                    .and_then(|n| n.last().copied())
                    .unwrap_or(0.0);
                data.push(number(last));
            }
            _ => {}
        }
    }
    Ok(Summary { header, data })
}

/// `report_timecontrol.csv`.
pub fn timing(name: &str, watches: &[WatchReport]) -> Vec<Row> {
    let mut out = vec![
        ["name", "watch", "label", "total_s", "count", "average_s", "share"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Row>(),
    ];
    for w in watches {
        out.push(vec![
            name.to_string(),
            w.key.clone(),
            w.label.clone(),
            number(w.total_s),
            w.count.to_string(),
            number(w.average_s()),
            number(w.share),
        ]);
    }
    out
}

pub fn render(rows: &[Row]) -> String {
    let mut s = String::new();
    for r in rows {
        s.push_str(&r.join(";"));
        s.push('\n');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_series::{CycleBoundary, SeriesKind, SeriesSpec};

    fn registry() -> SeriesRegistry {
        let mut reg = SeriesRegistry::new(2);
        let scale = reg.add_calibration("scale");
        let pnorm = reg.add_calibration("pressure");
        reg.push_calibration(scale, 2.0).unwrap();
        reg.push_calibration(pnorm, 4.0).unwrap();
        let av = reg
            .register(SeriesSpec::plain("av_norm_H1", "analytic velocity H1 norm", "AVN_H1"))
            .unwrap();
        let h1 = reg
            .register(
                SeriesSpec::new(
                    "u_H1",
                    "corrected velocity H1 error",
                    "CE_H1",
                    SeriesKind::ScaledRelative {
                        scale,
                        reference: "av_norm_H1".to_string(),
                    },
                )
                .monitored(),
            )
            .unwrap();
        let p = reg
            .register(
                SeriesSpec::new(
                    "p",
                    "pressure L2(0) error",
                    "PE",
                    SeriesKind::ScaledNormalized {
                        scale,
                        normalization: pnorm,
                    },
                )
                .monitored(),
            )
            .unwrap();
        reg.register(SeriesSpec::plain("ap_norm", "analytic pressure norm", "APN"))
            .unwrap();
        for (a, e, pe) in [(2.0, 1.0, 4.0), (2.0, 1.0, 4.0)] {
            reg.append(av, a);
            reg.append(h1, e);
            reg.append(p, pe);
        }
        reg.close_all(&CycleBoundary {
            cycle: 1,
            window: 0..2,
        });
        reg
    }

    #[test]
    fn time_lines_layout() {
        let reg = registry();
        let rows = time_lines("run", &reg, &[0.5, 1.0], false).unwrap();
        assert_eq!(rows[0], vec!["name", "what", "time", "0.5", "1"]);
        assert_eq!(rows[1], vec!["run", "analytic velocity H1 norm", "AVN_H1", "2", "2"]);
        assert_eq!(rows[2][2], "CE_H1");
        assert_eq!(
            rows[3],
            vec!["run", "scaled corrected velocity H1 error", "CE_H1s", "0.5", "0.5", "scale factor:2"]
        );
        assert_eq!(rows[4][2], "CE_H1r");
        assert_eq!(rows[4][3], "0.5");
        let abbrevs: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
        // ap_norm is empty and skipped
        assert_eq!(abbrevs, vec!["time", "AVN_H1", "CE_H1", "CE_H1s", "CE_H1r", "PE", "PEs", "PEn"]);
    }

    #[test]
    fn seconds_layout() {
        let reg = registry();
        let rows = seconds("run", &reg, false).unwrap();
        assert_eq!(rows[0], vec!["name", "what", "time", "1"]);
        let abbrevs: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(abbrevs, vec!["time", "CE_H1", "CE_H1s", "CE_H1r", "PE", "PEs", "PEn"]);
        assert_eq!(rows[3][3], "0.5");
        assert_eq!(rows[6][3], "1");
    }

    #[test]
    fn summary_uses_last_cycle_and_companions() {
        let reg = registry();
        let s = summary("run", "{}", 0.25, &reg, false).unwrap();
        assert_eq!(
            s.header,
            vec![
                "name",
                "metadata",
                "totalTimeHours",
                "last_cycle_CE_H1",
                "last_cycle_CE_H1r",
                "last_cycle_PE",
                "last_cycle_PEn"
            ]
        );
        assert_eq!(s.data, vec!["run", "{}", "0.25", "1", "0.5", "4", "1"]);
    }

    #[test]
    fn summary_without_cycles_reports_zero() {
        let mut reg = SeriesRegistry::new(10);
        let d = reg
            .register(SeriesSpec::plain("d", "corrected velocity L2 divergence", "DC").monitored())
            .unwrap();
        reg.append(d, 3.0);
        let s = summary("run", "{}", 0.0, &reg, false).unwrap();
        assert_eq!(s.header[3], "last_cycle_DC");
        assert_eq!(s.data[3], "0");
        assert_eq!(s.header.len(), 4);
    }

    #[test]
    fn lenient_rendering_survives_length_mismatch() {
        let mut reg = registry();
        reg.append_key("u_H1", 9.0).unwrap();
        assert!(time_lines("run", &reg, &[0.5, 1.0, 1.5], false).is_err());
        let rows = time_lines("run", &reg, &[0.5, 1.0, 1.5], true).unwrap();
        let ce: Vec<&Row> = rows.iter().filter(|r| r[2].starts_with("CE_H1")).collect();
        assert_eq!(ce.len(), 1);
        assert_eq!(ce[0].len(), 6);
    }

    #[test]
    fn render_joins_with_semicolons() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        ];
        assert_eq!(render(&rows), "a;b\nc\n");
    }
}
