//! Value types that can be carried by finite-volume fields.
//!
//! Scalars (`f64`), vectors (`Vector3<f64>`) and second-rank tensors (`Matrix3<f64>`) share the
//! same arithmetic surface, so interpolation, flux accumulation and matrix solution can be written
//! once and used for all of them. Matrix solution works component by component.
use nalgebra::{Matrix3, Vector3};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

pub trait FieldValue:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// number of scalar components
    const N_COMPONENTS: usize;
    fn zero() -> Self;
    fn component(&self, d: usize) -> f64;
    fn set_component(&mut self, d: usize, value: f64);
    /// magnitude (absolute value, Euclidean norm or Frobenius norm)
    fn mag(&self) -> f64;
}

impl FieldValue for f64 {
    const N_COMPONENTS: usize = 1;
    fn zero() -> Self {
        0.0
    }
    fn component(&self, _d: usize) -> f64 {
        *self
    }
    fn set_component(&mut self, _d: usize, value: f64) {
        *self = value;
    }
    fn mag(&self) -> f64 {
        self.abs()
    }
}

impl FieldValue for Vector3<f64> {
    const N_COMPONENTS: usize = 3;
    fn zero() -> Self {
        Vector3::zeros()
    }
    fn component(&self, d: usize) -> f64 {
        self[d]
    }
    fn set_component(&mut self, d: usize, value: f64) {
        self[d] = value;
    }
    fn mag(&self) -> f64 {
        self.norm()
    }
}

impl FieldValue for Matrix3<f64> {
    const N_COMPONENTS: usize = 9;
    fn zero() -> Self {
        Matrix3::zeros()
    }
    fn component(&self, d: usize) -> f64 {
        self[d]
    }
    fn set_component(&mut self, d: usize, value: f64) {
        self[d] = value;
    }
    fn mag(&self) -> f64 {
        self.norm()
    }
}

/// name of the component `d` of a field called `name`, e.g. `Ux`
pub fn component_name<T: FieldValue>(name: &str, d: usize) -> String {
    match T::N_COMPONENTS {
        1 => name.to_string(),
        3 => format!("{}{}", name, ["x", "y", "z"][d]),
        _ => {
            let labels = ["xx", "yx", "zx", "xy", "yy", "zy", "xz", "yz", "zz"];
            format!("{}{}", name, labels[d])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_access_round_trips() {
        let mut v = Vector3::new(1.0, 2.0, 3.0);
        v.set_component(1, 5.0);
        assert_eq!(v.component(1), 5.0);
        assert_eq!(<Vector3<f64> as FieldValue>::N_COMPONENTS, 3);

        let mut t = Matrix3::<f64>::zero();
        t.set_component(4, 2.0);
        assert_eq!(t[(1, 1)], 2.0);
    }

    #[test]
    fn component_names_follow_convention() {
        assert_eq!(component_name::<f64>("p_rgh", 0), "p_rgh");
        assert_eq!(component_name::<Vector3<f64>>("U", 2), "Uz");
        assert_eq!(component_name::<Matrix3<f64>>("R", 1), "Ryx");
    }
}
