//! Error-control and run options consumed by the engine.

use serde::{Deserialize, Serialize};

use crate::{ControlError, ControlResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorControlMode {
    #[default]
    Full,
    Off,
    /// Full, plus an independent second computation of the velocity norms.
    Test,
}

impl ErrorControlMode {
    pub fn enabled(self) -> bool {
        !matches!(self, ErrorControlMode::Off)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    #[default]
    Off,
    On,
    /// On, plus differences against the analytic fields.
    Diff,
    VelocityOnly,
}

impl SaveMode {
    pub fn saves(self) -> bool {
        !matches!(self, SaveMode::Off)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialCondition {
    #[default]
    Zero,
    Analytic,
}

fn one() -> f64 {
    1.0
}

fn default_save_stride() -> u32 {
    1
}

fn default_threshold() -> f64 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default)]
    pub error_control: ErrorControlMode,
    #[serde(default)]
    pub save: SaveMode,
    /// Save only every n-th step during the first second.
    #[serde(default = "default_save_stride")]
    pub save_stride: u32,
    /// Multiplier of the reference kinematic viscosity.
    #[serde(default = "one")]
    pub nu_factor: f64,
    /// Length of the cosine ramp applied to the inflow condition, in seconds.
    #[serde(default)]
    pub onset: f64,
    #[serde(default)]
    pub initial_condition: InitialCondition,
    /// Velocity scale factor.
    #[serde(default = "one")]
    pub factor: f64,
    /// Stop when the relative H1 velocity error exceeds this.
    #[serde(default = "default_threshold")]
    pub divergence_threshold: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            error_control: ErrorControlMode::default(),
            save: SaveMode::default(),
            save_stride: default_save_stride(),
            nu_factor: one(),
            onset: 0.0,
            initial_condition: InitialCondition::default(),
            factor: one(),
            divergence_threshold: default_threshold(),
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> ControlResult<()> {
        let positive = [
            ("nu_factor", self.nu_factor),
            ("factor", self.factor),
            ("divergence_threshold", self.divergence_threshold),
        ];
        for (what, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ControlError::InvalidConfig {
                    what: format!("{what} must be positive, got {value}"),
                });
            }
        }
        if !self.onset.is_finite() || self.onset < 0.0 {
            return Err(ControlError::InvalidConfig {
                what: format!("onset must be non-negative, got {}", self.onset),
            });
        }
        if self.save_stride == 0 {
            return Err(ControlError::InvalidConfig {
                what: "save_stride must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
