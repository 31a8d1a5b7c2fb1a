//! Integral functionals evaluated through a `Discretization`.
//!
//! All functions are thin quadrature sums over backend samples; none cache.

use nalgebra::Point3;
use pv_core::SubdomainId;

use crate::discretization::Discretization;
use crate::field::{ScalarField, VectorField, check_len};
use crate::{FieldError, FieldResult};

/// `∫ |v|²`
pub fn l2_norm_sq(disc: &dyn Discretization, v: &VectorField) -> FieldResult<f64> {
    Ok(disc
        .domain_samples(v)?
        .iter()
        .map(|s| s.weight * s.value.norm_squared())
        .sum())
}

/// `∫ |∇v|²` (Frobenius)
pub fn h1_seminorm_sq(disc: &dyn Discretization, v: &VectorField) -> FieldResult<f64> {
    Ok(disc
        .domain_samples(v)?
        .iter()
        .map(|s| s.weight * s.gradient.norm_squared())
        .sum())
}

pub fn l2_norm(disc: &dyn Discretization, v: &VectorField) -> FieldResult<f64> {
    Ok(l2_norm_sq(disc, v)?.sqrt())
}

/// `sqrt(∫ |v|² + |∇v|²)`, one pass over the samples.
pub fn h1_norm(disc: &dyn Discretization, v: &VectorField) -> FieldResult<f64> {
    let sum: f64 = disc
        .domain_samples(v)?
        .iter()
        .map(|s| s.weight * (s.value.norm_squared() + s.gradient.norm_squared()))
        .sum();
    Ok(sum.sqrt())
}

/// `‖div v‖_L2`
pub fn divergence_norm(disc: &dyn Discretization, v: &VectorField) -> FieldResult<f64> {
    let sum: f64 = disc
        .domain_samples(v)?
        .iter()
        .map(|s| s.weight * s.gradient.trace().powi(2))
        .sum();
    Ok(sum.sqrt())
}

pub fn scalar_l2_norm(disc: &dyn Discretization, p: &ScalarField) -> FieldResult<f64> {
    let sum: f64 = disc
        .domain_scalar_samples(p)?
        .iter()
        .map(|s| s.weight * s.value * s.value)
        .sum();
    Ok(sum.sqrt())
}

pub fn domain_volume(disc: &dyn Discretization) -> FieldResult<f64> {
    let zero = ScalarField::zeros(disc.node_count());
    Ok(disc
        .domain_scalar_samples(&zero)?
        .iter()
        .map(|s| s.weight)
        .sum())
}

/// Volume average of a scalar field.
pub fn domain_mean(disc: &dyn Discretization, p: &ScalarField) -> FieldResult<f64> {
    let samples = disc.domain_scalar_samples(p)?;
    let volume: f64 = samples.iter().map(|s| s.weight).sum();
    if volume <= 0.0 {
        return Err(FieldError::ZeroMeasure { what: "domain" });
    }
    Ok(samples.iter().map(|s| s.weight * s.value).sum::<f64>() / volume)
}

pub fn boundary_measure(disc: &dyn Discretization, id: SubdomainId) -> FieldResult<f64> {
    let zero = ScalarField::zeros(disc.node_count());
    Ok(disc
        .boundary_scalar_samples(&zero, id)?
        .iter()
        .map(|s| s.weight)
        .sum())
}

/// Area average of a scalar field over one boundary part.
pub fn boundary_mean(
    disc: &dyn Discretization,
    p: &ScalarField,
    id: SubdomainId,
) -> FieldResult<f64> {
    let samples = disc.boundary_scalar_samples(p, id)?;
    let area: f64 = samples.iter().map(|s| s.weight).sum();
    if area <= 0.0 {
        return Err(FieldError::ZeroMeasure { what: "boundary part" });
    }
    Ok(samples.iter().map(|s| s.weight * s.value).sum::<f64>() / area)
}

/// `∫_Γ |∇v|² + |v|² ds`
pub fn boundary_h1_sq(
    disc: &dyn Discretization,
    v: &VectorField,
    id: SubdomainId,
) -> FieldResult<f64> {
    Ok(disc
        .boundary_samples(v, id)?
        .iter()
        .map(|s| s.weight * (s.gradient.norm_squared() + s.value.norm_squared()))
        .sum())
}

pub fn interpolate_scalar(
    disc: &dyn Discretization,
    f: impl Fn(Point3<f64>) -> f64,
) -> ScalarField {
    ScalarField::from_values(
        (0..disc.node_count())
            .map(|n| f(disc.node_position(n)))
            .collect(),
    )
}

pub fn interpolate_vector(
    disc: &dyn Discretization,
    f: impl Fn(Point3<f64>) -> nalgebra::Vector3<f64>,
) -> VectorField {
    VectorField::from_values(
        (0..disc.node_count())
            .map(|n| f(disc.node_position(n)))
            .collect(),
    )
}

/// Checks a nodal field against the backend before sampling.
pub fn ensure_nodal(disc: &dyn Discretization, what: &'static str, len: usize) -> FieldResult<()> {
    check_len(what, disc.node_count(), len)
}
