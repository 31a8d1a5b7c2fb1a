//! Wall force: Cauchy stress of a Newtonian fluid and its traction on the wall.

use nalgebra::{Matrix3, Vector3};
use pv_core::SubdomainId;
use pv_fields::{Discretization, FieldError, FieldResult, ScalarField, VectorField};

/// `T(p, v) = −p·I + ν·(∇v + ∇vᵀ)`
pub fn stress(p: f64, grad: &Matrix3<f64>, nu: f64) -> Matrix3<f64> {
    Matrix3::identity() * -p + (grad + grad.transpose()) * nu
}

/// L2 norms over the wall of a traction field and its decomposition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TractionNorms {
    pub total: f64,
    /// `(T·n)·n`
    pub normal: f64,
    /// `(I − n⊗n)·T·n`
    pub shear: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    total: f64,
    normal: f64,
    shear: f64,
}

impl Accumulator {
    fn add(&mut self, weight: f64, normal: &Vector3<f64>, traction: &Vector3<f64>) {
        let tn = traction.dot(normal);
        let shear = traction - normal * tn;
        self.total += weight * traction.norm_squared();
        self.normal += weight * tn * tn;
        self.shear += weight * shear.norm_squared();
    }

    fn finish(self) -> TractionNorms {
        TractionNorms {
            total: self.total.sqrt(),
            normal: self.normal.sqrt(),
            shear: self.shear.sqrt(),
        }
    }
}

/// Analytic wall traction norms and the norms of the traction difference.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceComparison {
    pub analytic: TractionNorms,
    pub error: TractionNorms,
}

pub struct WallFields<'a> {
    pub velocity: &'a VectorField,
    pub pressure: &'a ScalarField,
}

/// Compares numerical and analytic wall tractions on subdomain `wall`.
pub fn compare_wall_traction(
    disc: &dyn Discretization,
    numerical: WallFields<'_>,
    analytic: WallFields<'_>,
    wall: SubdomainId,
    nu: f64,
) -> FieldResult<ForceComparison> {
    let v = disc.boundary_samples(numerical.velocity, wall)?;
    let p = disc.boundary_scalar_samples(numerical.pressure, wall)?;
    let va = disc.boundary_samples(analytic.velocity, wall)?;
    let pa = disc.boundary_scalar_samples(analytic.pressure, wall)?;
    for (what, found) in [
        ("wall pressure samples", p.len()),
        ("analytic wall velocity samples", va.len()),
        ("analytic wall pressure samples", pa.len()),
    ] {
        if found != v.len() {
            return Err(FieldError::LengthMismatch {
                what,
                expected: v.len(),
                found,
            });
        }
    }

    let mut reference = Accumulator::default();
    let mut error = Accumulator::default();
    for (((v, p), va), pa) in v.iter().zip(&p).zip(&va).zip(&pa) {
        let n = v.normal;
        let t_num = stress(p.value, &v.gradient, nu) * n;
        let t_an = stress(pa.value, &va.gradient, nu) * n;
        reference.add(v.weight, &n, &t_an);
        error.add(v.weight, &n, &(t_num - t_an));
    }
    Ok(ForceComparison {
        analytic: reference.finish(),
        error: error.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_of_pure_pressure_is_isotropic() {
        let t = stress(2.0, &Matrix3::zeros(), 3.71);
        assert_eq!(t, Matrix3::identity() * -2.0);
    }

    #[test]
    fn stress_symmetrizes_gradient() {
        let mut grad = Matrix3::zeros();
        grad[(2, 0)] = 1.0;
        let t = stress(0.0, &grad, 0.5);
        assert_eq!(t[(2, 0)], 0.5);
        assert_eq!(t[(0, 2)], 0.5);
        assert_eq!(t.trace(), 0.0);
    }

    #[test]
    fn pressure_traction_is_purely_normal() {
        let mut acc = Accumulator::default();
        let n = Vector3::new(0.6, 0.8, 0.0);
        let traction = stress(3.0, &Matrix3::zeros(), 1.0) * n;
        acc.add(2.0, &n, &traction);
        let norms = acc.finish();
        assert!((norms.total - 3.0 * 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((norms.normal - norms.total).abs() < 1e-12);
        assert!(norms.shear.abs() < 1e-12);
    }

    #[test]
    fn axial_shear_on_cylinder_wall() {
        // w = c·(R² − r²) gives ∂w/∂x = −2c·x; on the wall at (R, 0) the
        // traction is purely tangential.
        let (c, r, nu) = (0.5, 5.0, 2.0);
        let mut grad = Matrix3::zeros();
        grad[(2, 0)] = -2.0 * c * r;
        let n = Vector3::x();
        let mut acc = Accumulator::default();
        acc.add(1.0, &n, &(stress(0.0, &grad, nu) * n));
        let norms = acc.finish();
        assert!(norms.normal.abs() < 1e-12);
        assert!((norms.shear - nu * 2.0 * c * r).abs() < 1e-12);
    }
}
