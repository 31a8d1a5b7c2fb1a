//! Basis-field precomputation from the closed-form profile.

use std::collections::BTreeMap;

use pv_fields::Discretization;
use tracing::info;

use crate::calibration::{KINEMATIC_VISCOSITY, WomersleyCalibration};
use crate::store::{BasisStore, viscosity_suffix};
use crate::AnalyticResult;

/// Evaluates `parab`, `real0..7` and `imag0..7` at every node of `disc`.
///
/// The radial coordinate is the distance to the z axis.
pub fn precompute_basis(
    disc: &dyn Discretization,
    mesh: &str,
    nu_factor: f64,
) -> AnalyticResult<BasisStore> {
    viscosity_suffix(nu_factor)?;
    let calibration = if nu_factor == 1.0 {
        WomersleyCalibration::tabulated()
    } else {
        WomersleyCalibration::for_viscosity(KINEMATIC_VISCOSITY * nu_factor)?
    };

    let radii: Vec<f64> = (0..disc.node_count())
        .map(|n| {
            let p = disc.node_position(n);
            p.x.hypot(p.y)
        })
        .collect();

    let mut fields = BTreeMap::new();
    fields.insert(
        "parab".to_string(),
        radii.iter().map(|&r| calibration.parabolic(r)).collect(),
    );
    for (i, mode) in calibration.modes().iter().enumerate() {
        let profile: Vec<_> = radii.iter().map(|&r| mode.radial_profile(r)).collect();
        fields.insert(format!("real{i}"), profile.iter().map(|z| z.re).collect());
        fields.insert(format!("imag{i}"), profile.iter().map(|z| z.im).collect());
    }

    info!(
        mesh,
        nu_factor,
        nodes = radii.len(),
        viscosity = calibration.viscosity,
        "Precomputed Womersley basis"
    );
    Ok(BasisStore {
        mesh: mesh.to_string(),
        nu_factor,
        fields,
    })
}
