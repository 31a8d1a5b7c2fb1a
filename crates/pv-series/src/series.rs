//! Series schema.

/// Index of a shared calibration cell owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalibrationId(pub(crate) usize);

/// Typed reference to a registered series.
///
/// Valid only for the registry that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesHandle(pub(crate) usize);

/// Derived columns rendered next to the raw values.
///
/// - scaled: raw / first value of the scale cell
/// - normalized: raw / first value of the normalization cell
/// - relative: raw[i] / reference[i], pointwise against another series
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesKind {
    Plain,
    Scaled {
        scale: CalibrationId,
    },
    Normalized {
        normalization: CalibrationId,
    },
    Relative {
        reference: String,
    },
    ScaledNormalized {
        scale: CalibrationId,
        normalization: CalibrationId,
    },
    ScaledRelative {
        scale: CalibrationId,
        reference: String,
    },
    ScaledRelativeNormalized {
        scale: CalibrationId,
        reference: String,
        normalization: CalibrationId,
    },
}

impl SeriesKind {
    pub fn scale(&self) -> Option<CalibrationId> {
        match self {
            SeriesKind::Scaled { scale }
            | SeriesKind::ScaledNormalized { scale, .. }
            | SeriesKind::ScaledRelative { scale, .. }
            | SeriesKind::ScaledRelativeNormalized { scale, .. } => Some(*scale),
            SeriesKind::Plain | SeriesKind::Normalized { .. } | SeriesKind::Relative { .. } => None,
        }
    }

    pub fn normalization(&self) -> Option<CalibrationId> {
        match self {
            SeriesKind::Normalized { normalization }
            | SeriesKind::ScaledNormalized { normalization, .. }
            | SeriesKind::ScaledRelativeNormalized { normalization, .. } => Some(*normalization),
            SeriesKind::Plain
            | SeriesKind::Scaled { .. }
            | SeriesKind::Relative { .. }
            | SeriesKind::ScaledRelative { .. } => None,
        }
    }

    pub fn relative(&self) -> Option<&str> {
        match self {
            SeriesKind::Relative { reference }
            | SeriesKind::ScaledRelative { reference, .. }
            | SeriesKind::ScaledRelativeNormalized { reference, .. } => Some(reference.as_str()),
            SeriesKind::Plain
            | SeriesKind::Scaled { .. }
            | SeriesKind::Normalized { .. }
            | SeriesKind::ScaledNormalized { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub key: String,
    pub display_name: String,
    pub abbreviation: String,
    pub kind: SeriesKind,
    /// Aggregated per cycle.
    pub monitored: bool,
}

impl SeriesSpec {
    pub fn new(key: &str, display_name: &str, abbreviation: &str, kind: SeriesKind) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            abbreviation: abbreviation.to_string(),
            kind,
            monitored: false,
        }
    }

    pub fn plain(key: &str, display_name: &str, abbreviation: &str) -> Self {
        Self::new(key, display_name, abbreviation, SeriesKind::Plain)
    }

    pub fn monitored(mut self) -> Self {
        self.monitored = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalSeries {
    pub(crate) spec: SeriesSpec,
    pub(crate) values: Vec<f64>,
    pub(crate) cycle_values: Vec<f64>,
}

impl FunctionalSeries {
    pub(crate) fn new(spec: SeriesSpec) -> Self {
        Self {
            spec,
            values: Vec::new(),
            cycle_values: Vec::new(),
        }
    }

    pub fn spec(&self) -> &SeriesSpec {
        &self.spec
    }

    pub fn key(&self) -> &str {
        &self.spec.key
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn cycle_values(&self) -> &[f64] {
        &self.cycle_values
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }

    pub fn last_cycle(&self) -> Option<f64> {
        self.cycle_values.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_accessors() {
        let kind = SeriesKind::ScaledRelativeNormalized {
            scale: CalibrationId(0),
            reference: "av_norm_L2".to_string(),
            normalization: CalibrationId(1),
        };
        assert_eq!(kind.scale(), Some(CalibrationId(0)));
        assert_eq!(kind.normalization(), Some(CalibrationId(1)));
        assert_eq!(kind.relative(), Some("av_norm_L2"));
        assert_eq!(SeriesKind::Plain.relative(), None);
        assert!(SeriesSpec::plain("d", "divergence", "DC").monitored().monitored);
    }
}
