//! Nodal field containers.

use nalgebra::Vector3;

use crate::{FieldError, FieldResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    values: Vec<f64>,
}

impl ScalarField {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: vec![0.0; n],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn shift(&mut self, offset: f64) {
        self.values.iter_mut().for_each(|v| *v += offset);
    }

    pub fn difference(&self, other: &ScalarField) -> FieldResult<ScalarField> {
        check_len("scalar field difference", self.len(), other.len())?;
        Ok(Self {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    values: Vec<Vector3<f64>>,
}

impl VectorField {
    pub fn zeros(n: usize) -> Self {
        Self {
            values: vec![Vector3::zeros(); n],
        }
    }

    pub fn from_values(values: Vec<Vector3<f64>>) -> Self {
        Self { values }
    }

    /// Field whose only nonzero component is the axial (z) one.
    pub fn from_axial(axial: &[f64]) -> Self {
        Self {
            values: axial.iter().map(|&w| Vector3::new(0.0, 0.0, w)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Vector3<f64>] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.values
    }

    pub fn axial(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.z).collect()
    }

    pub fn scaled(&self, factor: f64) -> VectorField {
        Self {
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    pub fn difference(&self, other: &VectorField) -> FieldResult<VectorField> {
        check_len("vector field difference", self.len(), other.len())?;
        Ok(Self {
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| a - b)
                .collect(),
        })
    }
}

pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> FieldResult<()> {
    if expected != found {
        return Err(FieldError::LengthMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axial_field_has_zero_cross_components() {
        let f = VectorField::from_axial(&[1.0, -2.0]);
        assert_eq!(f.values()[1], Vector3::new(0.0, 0.0, -2.0));
        assert_eq!(f.axial(), vec![1.0, -2.0]);
    }

    #[test]
    fn difference_requires_equal_lengths() {
        let a = VectorField::zeros(3);
        let b = VectorField::zeros(4);
        assert!(a.difference(&b).is_err());
        let p = ScalarField::from_values(vec![3.0, 1.0]);
        let q = ScalarField::from_values(vec![1.0, 1.0]);
        assert_eq!(p.difference(&q).unwrap().values(), &[2.0, 0.0]);
    }
}
