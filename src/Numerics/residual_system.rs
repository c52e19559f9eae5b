//! Residual functions f(X, p) and the ways to get their Jacobian dF/dX.
//!
//! Every solver routine takes anything that implements [`ResidualSystem`]. Three providers are available:
//! 1) [`ForwardDual`] - the residual is written once over dual numbers (`num_dual::Dual64`); the Jacobian
//!    is exact, one forward sweep per state component, the parameters are never seeded so they are held fixed.
//! 2) [`CentralDifference`] - the residual is an ordinary `f64` function; the Jacobian is approximated by
//!    central differences with step h_j = eps^(1/3)*max(|x_j|, 1). Truncation error is O(h^2), so roughly
//!    10 significant digits are left for the Newton step. Use it when the residual cannot be made generic.
//! 3) [`SuppliedJacobian`] - any of the above plus a Jacobian written by hand. It is used as is, a wrong
//!    Jacobian is not detected and only shows up as slow or false convergence.
//!
//! All providers are stateless and are called concurrently from the rayon workers of the batch driver.
use nalgebra::{DMatrix, DVector};
use num_dual::Dual64;

/// caller-supplied Jacobian J(X, p) with the same signature as the residual
/// may borrow local data for `'a`
pub type JacobianFn<'a> = dyn Fn(&DVector<f64>, &DVector<f64>) -> DMatrix<f64> + Sync + 'a;

pub trait ResidualSystem: Sync {
    /// residual vector f(X, p)
    fn residual(&self, x: &DVector<f64>, params: &DVector<f64>) -> DVector<f64>;
    /// Jacobian of the residual with respect to X at fixed p
    fn jacobian(&self, x: &DVector<f64>, params: &DVector<f64>) -> DMatrix<f64>;

    /// replaces the Jacobian provider of this system with a hand-written one
    fn with_jacobian<J>(self, jacobian: J) -> SuppliedJacobian<Self, J>
    where
        Self: Sized,
        J: Fn(&DVector<f64>, &DVector<f64>) -> DMatrix<f64> + Sync,
    {
        SuppliedJacobian::new(self, jacobian)
    }
}

/// builds an m x n matrix from n columns; a column shorter than m (impure residual) is padded with NaN
fn matrix_from_columns(columns: &[Vec<f64>], n: usize) -> DMatrix<f64> {
    let m = columns.first().map_or(0, |col| col.len());
    DMatrix::from_fn(m, n, |i, j| columns[j].get(i).copied().unwrap_or(f64::NAN))
}

////////////////////////////////FORWARD MODE AUTODIFF////////////////////////////////

/// residual written over dual numbers, Jacobian by forward-mode automatic differentiation
/// # Examples
/// ```
/// use RootSolve::Numerics::residual_system::{ForwardDual, ResidualSystem};
/// use nalgebra::DVector;
/// use num_dual::Dual64;
/// // f(X, p) = X^2 - p
/// let system = ForwardDual::new(|x: &[Dual64], p: &[f64]| vec![x[0] * x[0] - Dual64::from(p[0])]);
/// let x = DVector::from_vec(vec![3.0]);
/// let p = DVector::from_vec(vec![4.0]);
/// assert_eq!(system.residual(&x, &p)[0], 5.0);
/// assert_eq!(system.jacobian(&x, &p)[(0, 0)], 6.0);
/// ```
pub struct ForwardDual<F> {
    function: F,
}

impl<F> ForwardDual<F>
where
    F: Fn(&[Dual64], &[f64]) -> Vec<Dual64> + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> ResidualSystem for ForwardDual<F>
where
    F: Fn(&[Dual64], &[f64]) -> Vec<Dual64> + Sync,
{
    fn residual(&self, x: &DVector<f64>, params: &DVector<f64>) -> DVector<f64> {
        let x_dual: Vec<Dual64> = x.iter().map(|&v| Dual64::from(v)).collect();
        let result = (self.function)(&x_dual, params.as_slice());
        DVector::from_iterator(result.len(), result.iter().map(|r| r.re))
    }

    fn jacobian(&self, x: &DVector<f64>, params: &DVector<f64>) -> DMatrix<f64> {
        let n = x.len();
        // column j = d f / d x_j, obtained by seeding x_j with unit derivative
        let columns: Vec<Vec<f64>> = (0..n)
            .map(|j| {
                let x_dual: Vec<Dual64> = x
                    .iter()
                    .enumerate()
                    .map(|(i, &val)| {
                        if i == j {
                            Dual64::new(val, 1.0)
                        } else {
                            Dual64::from(val)
                        }
                    })
                    .collect();
                (self.function)(&x_dual, params.as_slice())
                    .iter()
                    .map(|r| r.eps)
                    .collect()
            })
            .collect();
        matrix_from_columns(&columns, n)
    }
}

////////////////////////////////CENTRAL DIFFERENCES////////////////////////////////

/// plain f64 residual, Jacobian by central differences
pub struct CentralDifference<F> {
    function: F,
}

impl<F> CentralDifference<F>
where
    F: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> ResidualSystem for CentralDifference<F>
where
    F: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + Sync,
{
    fn residual(&self, x: &DVector<f64>, params: &DVector<f64>) -> DVector<f64> {
        (self.function)(x, params)
    }

    fn jacobian(&self, x: &DVector<f64>, params: &DVector<f64>) -> DMatrix<f64> {
        let n = x.len();
        let h_base = f64::EPSILON.cbrt();
        let mut shifted = x.clone();
        let mut columns = Vec::with_capacity(n);
        for j in 0..n {
            let h = h_base * x[j].abs().max(1.0);
            shifted[j] = x[j] + h;
            let f_plus = (self.function)(&shifted, params);
            shifted[j] = x[j] - h;
            let f_minus = (self.function)(&shifted, params);
            shifted[j] = x[j];
            let column: Vec<f64> = f_plus
                .iter()
                .zip(f_minus.iter())
                .map(|(fp, fm)| (fp - fm) / (2.0 * h))
                .collect();
            columns.push(column);
        }
        matrix_from_columns(&columns, n)
    }
}

////////////////////////////////HAND-WRITTEN JACOBIAN////////////////////////////////

/// residual of an inner system plus a Jacobian supplied by the caller
pub struct SuppliedJacobian<S, J> {
    system: S,
    jacobian: J,
}

impl<S, J> SuppliedJacobian<S, J>
where
    S: ResidualSystem,
    J: Fn(&DVector<f64>, &DVector<f64>) -> DMatrix<f64> + Sync,
{
    pub fn new(system: S, jacobian: J) -> Self {
        Self { system, jacobian }
    }
}

impl<S, J> ResidualSystem for SuppliedJacobian<S, J>
where
    S: ResidualSystem,
    J: Fn(&DVector<f64>, &DVector<f64>) -> DMatrix<f64> + Sync,
{
    fn residual(&self, x: &DVector<f64>, params: &DVector<f64>) -> DVector<f64> {
        self.system.residual(x, params)
    }

    fn jacobian(&self, x: &DVector<f64>, params: &DVector<f64>) -> DMatrix<f64> {
        (self.jacobian)(x, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_dual::DualNum;

    // f0 = x0^2 * x1 - p0, f1 = sin(x0) + exp(x1) * p1
    fn dual_system() -> ForwardDual<impl Fn(&[Dual64], &[f64]) -> Vec<Dual64> + Sync> {
        ForwardDual::new(|x: &[Dual64], p: &[f64]| {
            vec![
                x[0] * x[0] * x[1] - Dual64::from(p[0]),
                x[0].sin() + x[1].exp() * Dual64::from(p[1]),
            ]
        })
    }

    fn analytic_jacobian(x: &DVector<f64>, p: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(
            2,
            2,
            &[
                2.0 * x[0] * x[1],
                x[0] * x[0],
                x[0].cos(),
                x[1].exp() * p[1],
            ],
        )
    }

    #[test]
    fn forward_dual_residual_is_real_part() {
        let system = dual_system();
        let x = DVector::from_vec(vec![1.5, 0.5]);
        let p = DVector::from_vec(vec![2.0, 3.0]);
        let f = system.residual(&x, &p);
        assert_relative_eq!(f[0], 1.5 * 1.5 * 0.5 - 2.0);
        assert_relative_eq!(f[1], 1.5f64.sin() + 0.5f64.exp() * 3.0);
    }

    #[test]
    fn forward_dual_jacobian_is_exact() {
        let system = dual_system();
        let x = DVector::from_vec(vec![1.5, 0.5]);
        let p = DVector::from_vec(vec![2.0, 3.0]);
        let jac = system.jacobian(&x, &p);
        let expected = analytic_jacobian(&x, &p);
        assert_eq!(jac.shape(), (2, 2));
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(jac[(i, j)], expected[(i, j)], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn parameters_are_held_fixed() {
        // d(x*p)/dx = p, a derivative with respect to p would give x
        let system = ForwardDual::new(|x: &[Dual64], p: &[f64]| vec![x[0] * Dual64::from(p[0])]);
        let jac = system.jacobian(&DVector::from_vec(vec![2.0]), &DVector::from_vec(vec![7.0]));
        assert_relative_eq!(jac[(0, 0)], 7.0);
    }

    #[test]
    fn rectangular_residual_gives_m_by_n() {
        let system = ForwardDual::new(|x: &[Dual64], _p: &[f64]| {
            vec![x[0] + x[1], x[0] * x[1], x[1] * x[1]]
        });
        let jac = system.jacobian(&DVector::from_vec(vec![2.0, 3.0]), &DVector::zeros(0));
        assert_eq!(jac.shape(), (3, 2));
        assert_relative_eq!(jac[(1, 0)], 3.0);
        assert_relative_eq!(jac[(2, 1)], 6.0);
    }

    #[test]
    fn central_difference_is_close_to_exact() {
        let system = CentralDifference::new(|x: &DVector<f64>, p: &DVector<f64>| {
            DVector::from_vec(vec![
                x[0] * x[0] * x[1] - p[0],
                x[0].sin() + x[1].exp() * p[1],
            ])
        });
        let x = DVector::from_vec(vec![1.5, 0.5]);
        let p = DVector::from_vec(vec![2.0, 3.0]);
        let jac = system.jacobian(&x, &p);
        let expected = analytic_jacobian(&x, &p);
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(jac[(i, j)], expected[(i, j)], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn supplied_jacobian_is_used_verbatim() {
        // deliberately wrong Jacobian: the provider must not "fix" it
        let system = dual_system().with_jacobian(|_x: &DVector<f64>, _p: &DVector<f64>| {
            DMatrix::from_element(2, 2, 42.0)
        });
        let x = DVector::from_vec(vec![1.5, 0.5]);
        let p = DVector::from_vec(vec![2.0, 3.0]);
        assert_eq!(system.jacobian(&x, &p), DMatrix::from_element(2, 2, 42.0));
        assert_relative_eq!(system.residual(&x, &p)[0], 1.5 * 1.5 * 0.5 - 2.0);
    }
}
