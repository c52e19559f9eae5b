//! Damped Newton-Raphson iteration for one `(initial guess, parameters)` problem.
//!
//! Iteration k solves J(X_k, p) * step = -f(X_k, p) with LU decomposition (no explicit inverse)
//! and moves X_{k+1} = X_k + fac_k * step, where the damping factor ramps linearly during the
//! first `careful_steps` iterations:
//!
//!   fac_k = min((k + 1) / careful_steps, 1)
//!
//! The loop goes on while
//!
//!   (any |dx_i| > rtol_i*|X_i| + atol_i  AND  k < max_iter)  OR  k < careful_steps
//!
//! so at least `careful_steps` iterations are always made: a damped early step is small by
//! construction and says nothing about convergence. The iteration starts with dx = 100*X0.
//! If the loop ends with k >= max_iter the instance is reported as not converged.
use crate::Numerics::newton_config::NewtonConfig;
use crate::Numerics::residual_system::ResidualSystem;
use crate::Numerics::solver_errors::InstanceFailure;
use crate::Numerics::tolerance::ToleranceSpec;
use log::trace;
use nalgebra::DVector;

/// tagged result of one instance
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceOutcome {
    Converged {
        x: DVector<f64>,
        iterations: usize,
    },
    Failed {
        reason: InstanceFailure,
        iterations: usize,
    },
}

impl InstanceOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, InstanceOutcome::Converged { .. })
    }

    pub fn iterations(&self) -> usize {
        match self {
            InstanceOutcome::Converged { iterations, .. }
            | InstanceOutcome::Failed { iterations, .. } => *iterations,
        }
    }

    pub fn failure(&self) -> Option<&InstanceFailure> {
        match self {
            InstanceOutcome::Converged { .. } => None,
            InstanceOutcome::Failed { reason, .. } => Some(reason),
        }
    }

    /// converged solution, or a vector of n NaN for a failed instance
    pub fn to_vector(&self, n: usize) -> DVector<f64> {
        match self {
            InstanceOutcome::Converged { x, .. } => x.clone(),
            InstanceOutcome::Failed { .. } => DVector::from_element(n, f64::NAN),
        }
    }
}

/// state of one running instance, owned by its iteration and dropped when it ends
struct IterationState {
    x: DVector<f64>,
    dx: DVector<f64>,
    iteration: usize,
}

impl IterationState {
    fn new(x0: &DVector<f64>) -> Self {
        Self {
            x: x0.clone(),
            dx: x0 * 100.0,
            iteration: 0,
        }
    }

    fn keep_going(&self, tolerances: &ToleranceSpec, max_iter: usize, careful_steps: usize) -> bool {
        (tolerances.is_exceeded(&self.dx, &self.x) && self.iteration < max_iter)
            || self.iteration < careful_steps
    }
}

/// damping factor of iteration k (counted from 0); careful_steps = 0 behaves as 1
pub fn damping_factor(iteration: usize, careful_steps: usize) -> f64 {
    let careful_steps = careful_steps.max(1);
    ((iteration + 1) as f64 / careful_steps as f64).min(1.0)
}

/// full (undamped) Newton step at x
fn newton_step<S: ResidualSystem + ?Sized>(
    system: &S,
    x: &DVector<f64>,
    params: &DVector<f64>,
    iteration: usize,
) -> Result<DVector<f64>, InstanceFailure> {
    let n = x.len();
    let f = system.residual(x, params);
    if f.len() != n {
        return Err(InstanceFailure::ResidualDimension {
            expected: n,
            found: f.len(),
        });
    }
    let jac = system.jacobian(x, params);
    if jac.shape() != (n, n) {
        return Err(InstanceFailure::JacobianShape {
            rows: jac.nrows(),
            cols: jac.ncols(),
            n,
        });
    }
    let step = jac
        .lu()
        .solve(&(-f))
        .ok_or(InstanceFailure::SingularJacobian { iteration })?;
    // nearly singular systems pass the LU but blow up into inf/NaN
    if step.iter().any(|v| !v.is_finite()) {
        return Err(InstanceFailure::NonFiniteStep { iteration });
    }
    Ok(step)
}

/// solves f(X, params) = 0 starting from x0
/// `tolerances` must be already broadcast to x0.len() (see [`NewtonConfig::validate`])
pub fn solve_instance<S: ResidualSystem + ?Sized>(
    system: &S,
    x0: &DVector<f64>,
    params: &DVector<f64>,
    tolerances: &ToleranceSpec,
    config: &NewtonConfig,
) -> InstanceOutcome {
    let max_iter = config.max_iter;
    let careful_steps = config.effective_careful_steps();
    let mut state = IterationState::new(x0);

    while state.keep_going(tolerances, max_iter, careful_steps) {
        let fac = damping_factor(state.iteration, careful_steps);
        let step = match newton_step(system, &state.x, params, state.iteration) {
            Ok(step) => step,
            Err(reason) => {
                return InstanceOutcome::Failed {
                    reason,
                    iterations: state.iteration,
                };
            }
        };
        state.dx = step * fac;
        state.x += &state.dx;
        state.iteration += 1;
        trace!(
            "iteration {}: fac = {}, |dx| = {:e}",
            state.iteration,
            fac,
            state.dx.norm()
        );
    }

    if state.iteration < max_iter {
        InstanceOutcome::Converged {
            x: state.x,
            iterations: state.iteration,
        }
    } else {
        InstanceOutcome::Failed {
            reason: InstanceFailure::NotConverged { max_iter },
            iterations: state.iteration,
        }
    }
}
