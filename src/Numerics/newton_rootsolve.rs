//! Shortest way to solve f(X, p) = 0 for many guesses and parameter sets at once.
//!
//! [`newton_rootsolve`] takes the residual written over dual numbers and computes the exact Jacobian
//! by forward-mode differentiation unless a Jacobian is given. [`newton_rootsolve_numeric`] is the
//! same for a plain `f64` residual, its Jacobian falls back to central differences.
//! Both return one vector per instance, NaN-filled where the instance did not converge; use
//! [`solve_batch`] directly to get the reason of every failure.
use crate::Numerics::batch_driver::{BatchInput, solve_batch};
use crate::Numerics::newton_config::NewtonConfig;
use crate::Numerics::residual_system::{
    CentralDifference, ForwardDual, JacobianFn, ResidualSystem,
};
use crate::Numerics::solver_errors::NewtonError;
use nalgebra::DVector;
use num_dual::Dual64;

/// # Examples
/// ```
/// use RootSolve::Numerics::newton_config::NewtonConfig;
/// use RootSolve::Numerics::newton_rootsolve::newton_rootsolve;
/// use num_dual::Dual64;
/// // roots of X^2 - 4 from two different starting points
/// let config = NewtonConfig::new().with_atol(1e-12).with_max_iter(50);
/// let roots = newton_rootsolve(
///     |x: &[Dual64], p: &[f64]| vec![x[0] * x[0] - Dual64::from(p[0])],
///     vec![vec![1.0], vec![-1.0]],
///     4.0,
///     None,
///     &config,
/// )
/// .unwrap();
/// assert!((roots[0][0] - 2.0).abs() < 1e-10);
/// assert!((roots[1][0] + 2.0).abs() < 1e-10);
/// ```
pub fn newton_rootsolve<F>(
    residual: F,
    guesses: impl Into<BatchInput>,
    params: impl Into<BatchInput>,
    jacobian: Option<&JacobianFn<'_>>,
    config: &NewtonConfig,
) -> Result<Vec<DVector<f64>>, NewtonError>
where
    F: Fn(&[Dual64], &[f64]) -> Vec<Dual64> + Sync,
{
    let system = ForwardDual::new(residual);
    let solution = match jacobian {
        Some(jacobian) => solve_batch(&system.with_jacobian(jacobian), guesses, params, config)?,
        None => solve_batch(&system, guesses, params, config)?,
    };
    Ok(solution.into_solutions())
}

/// like [`newton_rootsolve`] for a residual that is available only over `f64`
pub fn newton_rootsolve_numeric<F>(
    residual: F,
    guesses: impl Into<BatchInput>,
    params: impl Into<BatchInput>,
    jacobian: Option<&JacobianFn<'_>>,
    config: &NewtonConfig,
) -> Result<Vec<DVector<f64>>, NewtonError>
where
    F: Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + Sync,
{
    let system = CentralDifference::new(residual);
    let solution = match jacobian {
        Some(jacobian) => solve_batch(&system.with_jacobian(jacobian), guesses, params, config)?,
        None => solve_batch(&system, guesses, params, config)?,
    };
    Ok(solution.into_solutions())
}
