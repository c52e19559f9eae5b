use crate::Numerics::solver_errors::NewtonError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// relative or absolute tolerance: one value for all components of X or one value per component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tolerance {
    Scalar(f64),
    PerComponent(Vec<f64>),
}

impl Tolerance {
    /// broadcasts the tolerance to a vector of length n
    /// `name` is used only in the error message ("rtol" or "atol")
    pub fn broadcast(&self, n: usize, name: &'static str) -> Result<DVector<f64>, NewtonError> {
        let values = match self {
            Tolerance::Scalar(value) => DVector::from_element(n, *value),
            Tolerance::PerComponent(values) => {
                // a length-1 vector broadcasts the same way a scalar does
                match values.len() {
                    1 => DVector::from_element(n, values[0]),
                    len if len == n => DVector::from_column_slice(values),
                    len => return Err(NewtonError::ToleranceShape { name, len, n }),
                }
            }
        };
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(NewtonError::InvalidTolerance { name, value: *bad });
        }
        Ok(values)
    }
}

impl From<f64> for Tolerance {
    fn from(value: f64) -> Self {
        Tolerance::Scalar(value)
    }
}

impl From<Vec<f64>> for Tolerance {
    fn from(values: Vec<f64>) -> Self {
        Tolerance::PerComponent(values)
    }
}

/// rtol and atol resolved against the state dimension n
/// shared read-only by every instance of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceSpec {
    pub rtol: DVector<f64>,
    pub atol: DVector<f64>,
}

impl ToleranceSpec {
    pub fn resolve(rtol: &Tolerance, atol: &Tolerance, n: usize) -> Result<Self, NewtonError> {
        Ok(Self {
            rtol: rtol.broadcast(n, "rtol")?,
            atol: atol.broadcast(n, "atol")?,
        })
    }

    pub fn dim(&self) -> usize {
        self.rtol.len()
    }

    /// true if any component of the step is outside rtol_i*|X_i| + atol_i
    /// NaN in dx counts as "outside" so a broken iterate never looks converged
    pub fn is_exceeded(&self, dx: &DVector<f64>, x: &DVector<f64>) -> bool {
        dx.iter()
            .zip(x.iter())
            .zip(self.rtol.iter().zip(self.atol.iter()))
            .any(|((dx_i, x_i), (rtol_i, atol_i))| {
                !(dx_i.abs() <= rtol_i * x_i.abs() + atol_i)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scalar_broadcasts_to_every_component() {
        let tol = Tolerance::Scalar(1e-6).broadcast(3, "rtol").unwrap();
        assert_eq!(tol.len(), 3);
        for v in tol.iter() {
            assert_relative_eq!(*v, 1e-6);
        }
    }

    #[test]
    fn per_component_keeps_values() {
        let tol = Tolerance::PerComponent(vec![1e-3, 1e-6])
            .broadcast(2, "atol")
            .unwrap();
        assert_relative_eq!(tol[0], 1e-3);
        assert_relative_eq!(tol[1], 1e-6);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = Tolerance::PerComponent(vec![1e-3, 1e-6, 1e-9])
            .broadcast(2, "atol")
            .unwrap_err();
        assert!(matches!(
            err,
            NewtonError::ToleranceShape {
                name: "atol",
                len: 3,
                n: 2
            }
        ));
    }

    #[test]
    fn negative_or_nan_is_rejected() {
        assert!(matches!(
            Tolerance::Scalar(-1.0).broadcast(1, "rtol"),
            Err(NewtonError::InvalidTolerance { name: "rtol", .. })
        ));
        assert!(matches!(
            Tolerance::PerComponent(vec![1.0, f64::NAN]).broadcast(2, "atol"),
            Err(NewtonError::InvalidTolerance { name: "atol", .. })
        ));
    }

    #[test]
    fn exceeded_is_componentwise() {
        let spec = ToleranceSpec::resolve(&Tolerance::Scalar(1e-3), &Tolerance::Scalar(0.0), 2)
            .unwrap();
        let x = DVector::from_vec(vec![1.0, 1000.0]);
        // 0.5 is inside the bound of the second component (1.0) but not of the first (1e-3)
        assert!(spec.is_exceeded(&DVector::from_vec(vec![0.5, 0.5]), &x));
        assert!(!spec.is_exceeded(&DVector::from_vec(vec![1e-4, 0.5]), &x));
    }

    #[test]
    fn zero_state_needs_atol() {
        let spec = ToleranceSpec::resolve(&Tolerance::Scalar(1e-6), &Tolerance::Scalar(1e-30), 1)
            .unwrap();
        let zero = DVector::from_vec(vec![0.0]);
        assert!(!spec.is_exceeded(&zero, &zero));
        assert!(spec.is_exceeded(&DVector::from_vec(vec![1e-20]), &zero));
    }

    #[test]
    fn nan_step_is_never_converged() {
        let spec = ToleranceSpec::resolve(&Tolerance::Scalar(1e-6), &Tolerance::Scalar(1.0), 1)
            .unwrap();
        let x = DVector::from_vec(vec![1.0]);
        assert!(spec.is_exceeded(&DVector::from_vec(vec![f64::NAN]), &x));
    }

    #[test]
    fn untagged_serde() {
        let scalar: Tolerance = serde_json::from_str("1e-8").unwrap();
        assert_eq!(scalar, Tolerance::Scalar(1e-8));
        let vector: Tolerance = serde_json::from_str("[1e-8, 1e-4]").unwrap();
        assert_eq!(vector, Tolerance::PerComponent(vec![1e-8, 1e-4]));
    }
}
