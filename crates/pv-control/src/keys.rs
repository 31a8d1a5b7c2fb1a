//! The series a validation run records, registered once with typed handles.

use pv_series::{
    CalibrationId, SeriesHandle, SeriesKind, SeriesRegistry, SeriesResult, SeriesSpec,
};

/// Corrected/tentative variants of one functional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub corrected: SeriesHandle,
    pub tentative: SeriesHandle,
}

impl Pair {
    pub fn select(&self, is_tentative: bool) -> SeriesHandle {
        if is_tentative {
            self.tentative
        } else {
            self.corrected
        }
    }
}

/// Calibration cells shared by many series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibrations {
    pub scale: CalibrationId,
    pub velocity: CalibrationId,
    pub pressure: CalibrationId,
    pub pressure_gradient: CalibrationId,
}

impl Calibrations {
    pub fn register(registry: &mut SeriesRegistry) -> Self {
        Self {
            scale: registry.add_calibration("scale factor"),
            velocity: registry.add_calibration("velocity normalization"),
            pressure: registry.add_calibration("pressure normalization"),
            pressure_gradient: registry.add_calibration("pressure gradient normalization"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceSeries {
    pub analytic_total: SeriesHandle,
    pub analytic_normal: SeriesHandle,
    pub analytic_shear: SeriesHandle,
    pub total: SeriesHandle,
    pub normal: SeriesHandle,
    pub shear: SeriesHandle,
}

/// Series that need an analytic solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticSeries {
    pub l2: Pair,
    pub h1: Pair,
    pub l2_test: Pair,
    pub h1_test: Pair,
    pub h1_wall: Pair,
    pub pressure: Pair,
    pub pg_error: Pair,
    pub pg_abs_error: Pair,
    pub analytic_pg: SeriesHandle,
    pub av_norm_l2: SeriesHandle,
    pub av_norm_h1: SeriesHandle,
    pub av_norm_h1_wall: SeriesHandle,
    pub ap_norm: SeriesHandle,
    pub force: ForceSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesCatalog {
    pub calibrations: Calibrations,
    pub divergence: Pair,
    pub computed_pg: Pair,
    pub analytic: Option<AnalyticSeries>,
}

struct Builder<'a> {
    registry: &'a mut SeriesRegistry,
    cal: Calibrations,
}

impl Builder<'_> {
    fn add(&mut self, spec: SeriesSpec) -> SeriesResult<SeriesHandle> {
        self.registry.register(spec)
    }

    fn scaled(&self) -> SeriesKind {
        SeriesKind::Scaled {
            scale: self.cal.scale,
        }
    }

    fn scaled_normalized(&self, normalization: CalibrationId) -> SeriesKind {
        SeriesKind::ScaledNormalized {
            scale: self.cal.scale,
            normalization,
        }
    }

    fn scaled_relative(&self, reference: &str) -> SeriesKind {
        SeriesKind::ScaledRelative {
            scale: self.cal.scale,
            reference: reference.to_string(),
        }
    }

    fn relative(reference: &str) -> SeriesKind {
        SeriesKind::Relative {
            reference: reference.to_string(),
        }
    }
}

impl SeriesCatalog {
    pub fn register(registry: &mut SeriesRegistry, has_analytic_solution: bool) -> SeriesResult<Self> {
        let cal = Calibrations::register(registry);
        let mut b = Builder { registry, cal };

        let divergence = Pair {
            corrected: b.add(
                SeriesSpec::new("d", "corrected velocity L2 divergence", "DC", b.scaled()).monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new("d2", "tentative velocity L2 divergence", "DT", b.scaled()).monitored(),
            )?,
        };
        let pg = cal.pressure_gradient;
        let computed_pg = Pair {
            corrected: b.add(SeriesSpec::new(
                "pg",
                "computed pressure gradient",
                "PG",
                b.scaled_normalized(pg),
            ))?,
            tentative: b.add(SeriesSpec::new(
                "pg2",
                "computed pressure tent gradient",
                "PTG",
                b.scaled_normalized(pg),
            ))?,
        };

        let analytic = if has_analytic_solution {
            Some(Self::register_analytic(&mut b)?)
        } else {
            None
        };

        Ok(Self {
            calibrations: cal,
            divergence,
            computed_pg,
            analytic,
        })
    }

    fn register_analytic(b: &mut Builder<'_>) -> SeriesResult<AnalyticSeries> {
        let cal = b.cal;
        let vel_l2 = SeriesKind::ScaledRelativeNormalized {
            scale: cal.scale,
            reference: "av_norm_L2".to_string(),
            normalization: cal.velocity,
        };

        let l2 = Pair {
            corrected: b.add(
                SeriesSpec::new("u_L2", "corrected velocity L2 error", "CE_L2", vel_l2.clone())
                    .monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new("u2L2", "tentative velocity L2 error", "TE_L2", vel_l2).monitored(),
            )?,
        };
        let l2_test = Pair {
            corrected: b.add(SeriesSpec::new(
                "u_L2test",
                "test corrected L2 velocity error",
                "TestCE_L2",
                b.scaled(),
            ))?,
            tentative: b.add(SeriesSpec::new(
                "u2L2test",
                "test tentative L2 velocity error",
                "TestTE_L2",
                b.scaled(),
            ))?,
        };
        let h1 = Pair {
            corrected: b.add(
                SeriesSpec::new(
                    "u_H1",
                    "corrected velocity H1 error",
                    "CE_H1",
                    b.scaled_relative("av_norm_H1"),
                )
                .monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new(
                    "u2H1",
                    "tentative velocity H1 error",
                    "TE_H1",
                    b.scaled_relative("av_norm_H1"),
                )
                .monitored(),
            )?,
        };
        let h1_test = Pair {
            corrected: b.add(SeriesSpec::new(
                "u_H1test",
                "test corrected H1 velocity error",
                "TestCE_H1",
                b.scaled(),
            ))?,
            tentative: b.add(SeriesSpec::new(
                "u2H1test",
                "test tentative H1 velocity error",
                "TestTE_H1",
                b.scaled(),
            ))?,
        };
        let analytic_pg = b.add(SeriesSpec::new(
            "apg",
            "analytic pressure gradient",
            "APG",
            b.scaled_normalized(cal.pressure_gradient),
        ))?;
        let av_norm_l2 = b.add(SeriesSpec::plain("av_norm_L2", "analytic velocity L2 norm", "AVN_L2"))?;
        let av_norm_h1 = b.add(SeriesSpec::plain("av_norm_H1", "analytic velocity H1 norm", "AVN_H1"))?;
        let ap_norm = b.add(SeriesSpec::plain("ap_norm", "analytic pressure norm", "APN"))?;

        let pressure = Pair {
            corrected: b.add(
                SeriesSpec::new(
                    "p",
                    "pressure L2(0) error",
                    "PE",
                    b.scaled_normalized(cal.pressure),
                )
                .monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new(
                    "p2",
                    "pressure tent L2(0) error",
                    "PTE",
                    b.scaled_normalized(cal.pressure),
                )
                .monitored(),
            )?,
        };
        let pg_error = Pair {
            corrected: b.add(
                SeriesSpec::new(
                    "pgE",
                    "computed pressure gradient error",
                    "PGE",
                    b.scaled_normalized(cal.pressure_gradient),
                )
                .monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new(
                    "pgE2",
                    "computed tent pressure tent gradient error",
                    "PTGE",
                    b.scaled_normalized(cal.pressure_gradient),
                )
                .monitored(),
            )?,
        };
        let pg_abs_error = Pair {
            corrected: b.add(SeriesSpec::new(
                "pgEA",
                "computed absolute pressure gradient error",
                "PGEA",
                b.scaled_normalized(cal.pressure_gradient),
            ))?,
            tentative: b.add(SeriesSpec::new(
                "pgEA2",
                "computed absolute pressure tent gradient error",
                "PTGEA",
                b.scaled_normalized(cal.pressure_gradient),
            ))?,
        };

        let h1_wall = Pair {
            corrected: b.add(
                SeriesSpec::new(
                    "u_H1w",
                    "corrected velocity H1 error on wall",
                    "CE_H1w",
                    b.scaled_relative("av_norm_H1w"),
                )
                .monitored(),
            )?,
            tentative: b.add(
                SeriesSpec::new(
                    "u2H1w",
                    "tentative velocity H1 error on wall",
                    "TE_H1w",
                    b.scaled_relative("av_norm_H1w"),
                )
                .monitored(),
            )?,
        };
        let av_norm_h1_wall = b.add(SeriesSpec::plain(
            "av_norm_H1w",
            "analytic velocity H1 norm on wall",
            "AVN_H1w",
        ))?;

        let force = ForceSeries {
            analytic_total: b.add(SeriesSpec::plain("a_force_wall", "analytic force on wall", "AF"))?,
            analytic_normal: b.add(SeriesSpec::plain(
                "a_force_wall_normal",
                "analytic normal force on wall",
                "AFN",
            ))?,
            analytic_shear: b.add(SeriesSpec::plain(
                "a_force_wall_shear",
                "analytic shear force on wall",
                "AFS",
            ))?,
            total: b.add(
                SeriesSpec::new(
                    "force_wall",
                    "force error on wall",
                    "FE",
                    Builder::relative("a_force_wall"),
                )
                .monitored(),
            )?,
            normal: b.add(SeriesSpec::new(
                "force_wall_normal",
                "normal force error on wall",
                "FNE",
                Builder::relative("a_force_wall"),
            ))?,
            shear: b.add(SeriesSpec::new(
                "force_wall_shear",
                "shear force error on wall",
                "FSE",
                Builder::relative("a_force_wall"),
            ))?,
        };

        Ok(AnalyticSeries {
            l2,
            h1,
            l2_test,
            h1_test,
            h1_wall,
            pressure,
            pg_error,
            pg_abs_error,
            analytic_pg,
            av_norm_l2,
            av_norm_h1,
            av_norm_h1_wall,
            ap_norm,
            force,
        })
    }
}
