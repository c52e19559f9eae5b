//! Errors of the batched Newton solver.
//!
//! Two levels are distinguished:
//! 1) [`NewtonError`] - structural problems with the whole call (shapes that cannot be
//!    broadcast, bad tolerances, unreadable config). They are reported before any iteration starts.
//! 2) [`InstanceFailure`] - something went wrong inside one `(guess, params)` problem. It never
//!    leaves the batch as an `Err`, it is stored in that instance's outcome and the instance
//!    result is replaced by a vector of NaN.
use thiserror::Error;

/// error of the whole solver call
#[derive(Debug, Error)]
pub enum NewtonError {
    #[error("state vector is empty: initial guesses must have at least one component")]
    EmptyState,
    #[error("initial guess #{index} has {found} components, expected {expected}")]
    RaggedGuesses {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("parameter set #{index} has {found} components, expected {expected}")]
    RaggedParams {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("batch size mismatch: {guesses} initial guesses but {params} parameter sets")]
    BatchSizeMismatch { guesses: usize, params: usize },
    #[error("{name} has {len} components and cannot be broadcast to state dimension {n}")]
    ToleranceShape {
        name: &'static str,
        len: usize,
        n: usize,
    },
    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("residual returned {found} components for a state of dimension {expected}")]
    ResidualDimension { expected: usize, found: usize },
    #[error("failed to read solver config: {0}")]
    ConfigIo(#[from] std::io::Error),
    #[error("failed to parse solver config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

/// reason why a single instance returned the NaN sentinel
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InstanceFailure {
    #[error("no convergence within {max_iter} iterations")]
    NotConverged { max_iter: usize },
    #[error("singular Jacobian at iteration {iteration}")]
    SingularJacobian { iteration: usize },
    #[error("non-finite Newton step at iteration {iteration}")]
    NonFiniteStep { iteration: usize },
    #[error("Jacobian has shape {rows}x{cols}, expected {n}x{n}")]
    JacobianShape { rows: usize, cols: usize, n: usize },
    #[error("residual returned {found} components, expected {expected}")]
    ResidualDimension { expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_numbers() {
        let err = NewtonError::BatchSizeMismatch {
            guesses: 3,
            params: 2,
        };
        assert_eq!(
            err.to_string(),
            "batch size mismatch: 3 initial guesses but 2 parameter sets"
        );
        let failure = InstanceFailure::JacobianShape {
            rows: 2,
            cols: 3,
            n: 2,
        };
        assert_eq!(failure.to_string(), "Jacobian has shape 2x3, expected 2x2");
    }

    #[test]
    fn json_errors_convert() {
        let parse_err = serde_json::from_str::<f64>("not a number").unwrap_err();
        let err: NewtonError = parse_err.into();
        assert!(matches!(err, NewtonError::ConfigParse(_)));
    }
}
