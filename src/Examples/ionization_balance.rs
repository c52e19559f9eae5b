//! Ionization balance of pure hydrogen gas as a batch of root-finding problems.
//!
//! Unknown: ionized fraction x = n(H+)/n_H. With n_e = x*n_H the steady state reads
//!
//!   Gamma*(1 - x) + k_ci(T)*n_H*x*(1 - x) - alpha_B(T)*n_H*x^2 = 0
//!
//! photoionization + collisional ionization = case B radiative recombination.
//! Every temperature of the grid is a separate instance with parameters p = (T, n_H, Gamma).
use crate::Numerics::batch_driver::{BatchSolution, solve_batch};
use crate::Numerics::newton_config::NewtonConfig;
use crate::Numerics::residual_system::ForwardDual;
use crate::Numerics::solver_errors::NewtonError;
use num_dual::Dual64;

/// case B radiative recombination coefficient of hydrogen, cm^3/s
pub fn alpha_b(t: f64) -> f64 {
    2.59e-13 * (t / 1e4).powf(-0.7)
}

/// collisional ionization coefficient of hydrogen by electron impact, cm^3/s (Cen 1992)
pub fn k_collisional(t: f64) -> f64 {
    5.85e-11 * t.sqrt() * (-157809.1 / t).exp() / (1.0 + (t / 1e5).sqrt())
}

/// closed-form root of the quadratic, used to check the Newton results
pub fn ionized_fraction_exact(t: f64, n_h: f64, gamma: f64) -> f64 {
    let k = k_collisional(t);
    let a = alpha_b(t);
    let b = k * n_h - gamma;
    (b + (b * b + 4.0 * (k + a) * n_h * gamma).sqrt()) / (2.0 * (k + a) * n_h)
}

fn balance(x: &[Dual64], p: &[f64]) -> Vec<Dual64> {
    let (t, n_h, gamma) = (p[0], p[1], p[2]);
    let k = Dual64::from(k_collisional(t) * n_h);
    let a = Dual64::from(alpha_b(t) * n_h);
    let one = Dual64::from(1.0);
    let neutral = one - x[0];
    vec![Dual64::from(gamma) * neutral + k * x[0] * neutral - a * x[0] * x[0]]
}

/// ionized fraction over a temperature grid at fixed density (cm^-3) and photoionization rate (1/s)
pub fn ionization_equilibrium(
    temperatures: &[f64],
    n_h: f64,
    gamma: f64,
    config: &NewtonConfig,
) -> Result<BatchSolution, NewtonError> {
    let params: Vec<Vec<f64>> = temperatures.iter().map(|&t| vec![t, n_h, gamma]).collect();
    solve_batch(&ForwardDual::new(balance), vec![0.5], params, config)
}

/// log-spaced temperature grid
pub fn log_grid(t_min: f64, t_max: f64, points: usize) -> Vec<f64> {
    if points < 2 {
        return vec![t_min];
    }
    let step = (t_max / t_min).ln() / (points - 1) as f64;
    (0..points)
        .map(|i| t_min * (step * i as f64).exp())
        .collect()
}
