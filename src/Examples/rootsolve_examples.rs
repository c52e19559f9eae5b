use crate::Examples::ionization_balance::{
    ionization_equilibrium, ionized_fraction_exact, log_grid,
};
use crate::Numerics::batch_driver::{BatchInput, solve_batch};
use crate::Numerics::newton_config::NewtonConfig;
use crate::Numerics::newton_rootsolve::{newton_rootsolve, newton_rootsolve_numeric};
use crate::Numerics::residual_system::ForwardDual;
use approx::assert_relative_eq;
use log::{error, info};
use nalgebra::DVector;
use num_dual::{Dual64, DualNum};
use prettytable::{Table, row};

pub fn rootsolve_examples(task: usize) {
    match task {
        0 => {
            // SQUARE ROOT: X^2 - p = 0, two basins of attraction
            let config = NewtonConfig::new().with_atol(1e-12).with_max_iter(50);
            let roots = newton_rootsolve(
                |x: &[Dual64], p: &[f64]| vec![x[0] * x[0] - Dual64::from(p[0])],
                vec![vec![1.0], vec![-1.0]],
                4.0,
                None,
                &config,
            );
            match roots {
                Ok(roots) => {
                    println!("roots from +1 and -1: {} {}", roots[0][0], roots[1][0]);
                    assert_relative_eq!(roots[0][0], 2.0, epsilon = 1e-10);
                    assert_relative_eq!(roots[1][0], -2.0, epsilon = 1e-10);
                }
                Err(e) => error!("square root example failed: {}", e),
            }
        }
        1 => {
            // HYDROGEN IONIZATION BALANCE over a temperature grid
            let temperatures = log_grid(3e3, 3e5, 15);
            let (n_h, gamma) = (100.0, 1e-13);
            let config = NewtonConfig::new().with_atol(1e-14).with_careful_steps(3);
            let solution = match ionization_equilibrium(&temperatures, n_h, gamma, &config) {
                Ok(solution) => solution,
                Err(e) => {
                    error!("ionization balance failed: {}", e);
                    return;
                }
            };
            let mut table = Table::new();
            table.add_row(row!["T, K", "x (Newton)", "x (exact)", "iterations"]);
            for (i, t) in temperatures.iter().enumerate() {
                let outcome = &solution.outcomes[i];
                table.add_row(row![
                    format!("{:.3e}", t),
                    format!("{:.6e}", outcome.to_vector(1)[0]),
                    format!("{:.6e}", ionized_fraction_exact(*t, n_h, gamma)),
                    outcome.iterations()
                ]);
            }
            println!("\n=== IONIZED FRACTION OF HYDROGEN, n_H = {} cm^-3 ===", n_h);
            table.printstd();
        }
        2 => {
            // CAREFUL STEPS: arctan(x) = 0 diverges from x0 = 2 with plain Newton
            let system = ForwardDual::new(|x: &[Dual64], _p: &[f64]| vec![x[0].atan()]);
            for careful_steps in [1, 3, 10] {
                let config = NewtonConfig::new()
                    .with_atol(1e-12)
                    .with_max_iter(40)
                    .with_careful_steps(careful_steps);
                match solve_batch(&system, vec![2.0], BatchInput::empty(), &config) {
                    Ok(solution) => {
                        info!("careful_steps = {}", careful_steps);
                        solution.pretty_print();
                    }
                    Err(e) => error!("arctan example failed: {}", e),
                }
            }
        }
        3 => {
            // PLAIN f64 RESIDUAL, Jacobian by central differences, config from JSON
            let config = match NewtonConfig::from_json_str(
                r#"{ "rtol": 1e-9, "atol": [1e-12, 1e-12], "careful_steps": 2 }"#,
            ) {
                Ok(config) => config,
                Err(e) => {
                    error!("bad config: {}", e);
                    return;
                }
            };
            // x^2 + y^2 = 10, x - y = 4
            let roots = newton_rootsolve_numeric(
                |x: &DVector<f64>, p: &DVector<f64>| {
                    DVector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - p[0], x[0] - x[1] - p[1]])
                },
                vec![1.0, 1.0],
                vec![10.0, 4.0],
                None,
                &config,
            );
            match roots {
                Ok(roots) => println!("x = {}, y = {}", roots[0][0], roots[0][1]),
                Err(e) => error!("numeric example failed: {}", e),
            }
        }
        _ => println!("no example with number {}", task),
    }
}
