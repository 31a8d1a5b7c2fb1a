//! Calibration sidecar (`<mesh>.ini`): whitespace-delimited rows.
//!
//! ```text
//! volume 1570.79
//! in 2
//! normal 0 0 -1
//! center 0 0 0
//! radius 5
//! reference_coef 1
//! S 78.3
//! out 3
//! S 78.3
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::{MeshError, MeshResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InflowRecord {
    pub number: u32,
    pub normal: [f64; 3],
    pub center: [f64; 3],
    pub radius: f64,
    pub reference_coef: f64,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutflowRecord {
    pub number: u32,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sidecar {
    pub volume: f64,
    pub inflows: Vec<InflowRecord>,
    pub outflows: Vec<OutflowRecord>,
}

#[derive(Clone, Copy)]
enum Open {
    None,
    In(usize),
    Out(usize),
}

impl Sidecar {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = writeln!(out, "volume {}", self.volume);
        for inf in &self.inflows {
            let [nx, ny, nz] = inf.normal;
            let [cx, cy, cz] = inf.center;
            let _ = writeln!(out, "in {}", inf.number);
            let _ = writeln!(out, "normal {nx} {ny} {nz}");
            let _ = writeln!(out, "center {cx} {cy} {cz}");
            let _ = writeln!(out, "radius {}", inf.radius);
            let _ = writeln!(out, "reference_coef {}", inf.reference_coef);
            let _ = writeln!(out, "S {}", inf.area);
        }
        for outf in &self.outflows {
            let _ = writeln!(out, "out {}", outf.number);
            let _ = writeln!(out, "S {}", outf.area);
        }
        out
    }

    pub fn parse(text: &str) -> MeshResult<Self> {
        let mut volume = None;
        let mut inflows: Vec<InflowRecord> = Vec::new();
        let mut outflows: Vec<OutflowRecord> = Vec::new();
        let mut open = Open::None;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let mut tokens = raw.split_whitespace();
            let Some(key) = tokens.next() else {
                continue;
            };
            let values: Vec<&str> = tokens.collect();
            match key {
                "volume" => volume = Some(scalar(&values, line)?),
                "in" => {
                    inflows.push(InflowRecord {
                        number: number(&values, line)?,
                        normal: [0.0; 3],
                        center: [0.0; 3],
                        radius: 0.0,
                        reference_coef: 1.0,
                        area: 0.0,
                    });
                    open = Open::In(inflows.len() - 1);
                }
                "out" => {
                    outflows.push(OutflowRecord {
                        number: number(&values, line)?,
                        area: 0.0,
                    });
                    open = Open::Out(outflows.len() - 1);
                }
                "normal" | "center" | "radius" | "reference_coef" => {
                    let Open::In(idx) = open else {
                        return Err(MeshError::Sidecar {
                            line,
                            what: format!("'{key}' outside an inflow block"),
                        });
                    };
                    let record = &mut inflows[idx];
                    match key {
                        "normal" => record.normal = triple(&values, line)?,
                        "center" => record.center = triple(&values, line)?,
                        "radius" => record.radius = scalar(&values, line)?,
                        _ => record.reference_coef = scalar(&values, line)?,
                    }
                }
                "S" => {
                    let area = scalar(&values, line)?;
                    match open {
                        Open::In(idx) => inflows[idx].area = area,
                        Open::Out(idx) => outflows[idx].area = area,
                        Open::None => {
                            return Err(MeshError::Sidecar {
                                line,
                                what: "'S' before any in/out block".to_string(),
                            });
                        }
                    }
                }
                other => {
                    return Err(MeshError::Sidecar {
                        line,
                        what: format!("unknown token '{other}'"),
                    });
                }
            }
        }

        let volume = volume.ok_or(MeshError::Sidecar {
            line: 0,
            what: "missing 'volume' row".to_string(),
        })?;
        Ok(Self {
            volume,
            inflows,
            outflows,
        })
    }

    pub fn inflow(&self, number: u32) -> Option<&InflowRecord> {
        self.inflows.iter().find(|r| r.number == number)
    }

    pub fn outflow(&self, number: u32) -> Option<&OutflowRecord> {
        self.outflows.iter().find(|r| r.number == number)
    }
}

fn floats(values: &[&str], expected: usize, line: usize) -> MeshResult<Vec<f64>> {
    if values.len() != expected {
        return Err(MeshError::Sidecar {
            line,
            what: format!("expected {expected} value(s), found {}", values.len()),
        });
    }
    values
        .iter()
        .map(|v| {
            v.parse::<f64>().map_err(|_| MeshError::Sidecar {
                line,
                what: format!("'{v}' is not a number"),
            })
        })
        .collect()
}

fn scalar(values: &[&str], line: usize) -> MeshResult<f64> {
    Ok(floats(values, 1, line)?[0])
}

fn triple(values: &[&str], line: usize) -> MeshResult<[f64; 3]> {
    let v = floats(values, 3, line)?;
    Ok([v[0], v[1], v[2]])
}

fn number(values: &[&str], line: usize) -> MeshResult<u32> {
    match values {
        [v] => v.parse::<u32>().map_err(|_| MeshError::Sidecar {
            line,
            what: format!("'{v}' is not a subdomain number"),
        }),
        _ => Err(MeshError::Sidecar {
            line,
            what: "expected one subdomain number".to_string(),
        }),
    }
}
