//! Batched Newton-Raphson root finder.
//! Solves f(X, p) = 0 for many independent pairs (initial guess X0, parameters p) at once. Every pair is an
//! independent problem: it has its own iteration, its own convergence test and its own result. The pairs are
//! solved in parallel (rayon) and the results come back in the input order.
//! Features:
//! 1) exact Jacobian by forward-mode automatic differentiation (dual numbers), central differences for plain
//!    f64 residuals, or a Jacobian written by hand
//! 2) "careful" start: the first `careful_steps` Newton steps are damped by a factor growing linearly from
//!    1/careful_steps to 1
//! 3) per-component relative and absolute tolerances
//! 4) an instance that does not converge (or hits a singular Jacobian) returns a vector of NaN instead of
//!    stopping the whole batch
//! 5) broadcasting of a single guess or a single parameter vector over the batch
//! ----------------------------------------------------------------
//! # Examples
//! ```
//! use RootSolve::Numerics::batch_driver::solve_batch;
//! use RootSolve::Numerics::newton_config::NewtonConfig;
//! use RootSolve::Numerics::residual_system::ForwardDual;
//! use num_dual::Dual64;
//! // intersection of the circle x^2 + y^2 = r^2 with the line y = x - 1, for three radii
//! let system = ForwardDual::new(|x: &[Dual64], p: &[f64]| {
//!     vec![
//!         x[0] * x[0] + x[1] * x[1] - Dual64::from(p[0] * p[0]),
//!         x[1] - x[0] + Dual64::from(1.0),
//!     ]
//! });
//! let config = NewtonConfig::new().with_atol(1e-12).with_careful_steps(3);
//! // one shared initial guess, three parameter sets
//! let solution = solve_batch(&system, vec![3.0, 2.0], vec![vec![5.0], vec![1.0], vec![0.0]], &config).unwrap();
//! solution.pretty_print();
//! let roots = solution.solutions();
//! assert!((roots[0][0] - 4.0).abs() < 1e-9 && (roots[0][1] - 3.0).abs() < 1e-9);
//! assert!((roots[1][0] - 1.0).abs() < 1e-9 && roots[1][1].abs() < 1e-9);
//! // the line misses the circle of radius 0: NaN instead of an error
//! assert!(roots[2][0].is_nan());
//! ```

pub mod batch_driver;
pub mod newton_config;
pub mod newton_iterator;
pub mod newton_rootsolve;
pub mod residual_system;
pub mod solver_errors;
pub mod tolerance;

pub use batch_driver::{BatchInput, BatchSolution, solve_batch};
pub use newton_config::NewtonConfig;
pub use newton_iterator::{InstanceOutcome, solve_instance};
pub use newton_rootsolve::{newton_rootsolve, newton_rootsolve_numeric};
pub use residual_system::{CentralDifference, ForwardDual, ResidualSystem, SuppliedJacobian};
pub use solver_errors::{InstanceFailure, NewtonError};
pub use tolerance::{Tolerance, ToleranceSpec};
