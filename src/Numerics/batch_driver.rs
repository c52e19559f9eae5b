//! Runs the Newton iteration independently over a batch of `(initial guess, parameters)` pairs.
//!
//! # Broadcasting
//! Guesses and parameters are each either a single vector ([`BatchInput::Single`]) or a batch of
//! N vectors ([`BatchInput::Batch`]):
//!
//! | guesses    | params     | batch size | note                                         |
//! |------------|------------|------------|----------------------------------------------|
//! | Single     | Single     | 1          |                                              |
//! | Batch(N)   | Single     | N          | the parameter vector is reused by every guess |
//! | Single     | Batch(N)   | N          | the guess is reused for every parameter set  |
//! | Batch(N)   | Batch(N)   | N          | paired by index                              |
//! | Batch(N)   | Batch(M)   | error      | `NewtonError::BatchSizeMismatch`, N != M     |
//!
//! Only `Single` inputs are replicated: a `Batch` of one vector is not stretched to N.
//! All vectors of one batch must have the same length, the guesses must not be empty.
//! Every structural check happens before the first iteration.
//!
//! # Results
//! Instances share nothing but the (read-only) residual system, tolerances and config, so they
//! run on the rayon pool in any order; the result keeps the input order. A failed instance never
//! disturbs the others, its slot in [`BatchSolution::solutions`] is a vector of NaN.
use crate::Numerics::newton_config::NewtonConfig;
use crate::Numerics::newton_iterator::{InstanceOutcome, solve_instance};
use crate::Numerics::residual_system::ResidualSystem;
use crate::Numerics::solver_errors::NewtonError;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use prettytable::{Table, row};
use rayon::prelude::*;

/// guesses or parameters of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// one vector shared by every instance
    Single(DVector<f64>),
    /// one vector per instance
    Batch(Vec<DVector<f64>>),
}

impl BatchInput {
    /// no parameters at all (residuals that depend on X only)
    pub fn empty() -> Self {
        BatchInput::Single(DVector::zeros(0))
    }

    /// number of instances, None for a broadcastable single vector
    pub fn batch_len(&self) -> Option<usize> {
        match self {
            BatchInput::Single(_) => None,
            BatchInput::Batch(vectors) => Some(vectors.len()),
        }
    }

    /// common length of the vectors, None for an empty batch
    /// returns (index, expected, found) of the first row with a different length
    fn component_len(&self) -> Result<Option<usize>, (usize, usize, usize)> {
        match self {
            BatchInput::Single(vector) => Ok(Some(vector.len())),
            BatchInput::Batch(vectors) => {
                let Some(first) = vectors.first() else {
                    return Ok(None);
                };
                let expected = first.len();
                match vectors.iter().position(|v| v.len() != expected) {
                    Some(index) => Err((index, expected, vectors[index].len())),
                    None => Ok(Some(expected)),
                }
            }
        }
    }

    /// vector of instance `index` (the single vector for every index)
    pub fn get(&self, index: usize) -> &DVector<f64> {
        match self {
            BatchInput::Single(vector) => vector,
            BatchInput::Batch(vectors) => &vectors[index],
        }
    }
}

impl Default for BatchInput {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<f64> for BatchInput {
    fn from(value: f64) -> Self {
        BatchInput::Single(DVector::from_element(1, value))
    }
}

impl From<Vec<f64>> for BatchInput {
    fn from(values: Vec<f64>) -> Self {
        BatchInput::Single(DVector::from_vec(values))
    }
}

impl From<&[f64]> for BatchInput {
    fn from(values: &[f64]) -> Self {
        BatchInput::Single(DVector::from_column_slice(values))
    }
}

impl From<DVector<f64>> for BatchInput {
    fn from(vector: DVector<f64>) -> Self {
        BatchInput::Single(vector)
    }
}

impl From<Vec<Vec<f64>>> for BatchInput {
    fn from(rows: Vec<Vec<f64>>) -> Self {
        BatchInput::Batch(rows.into_iter().map(DVector::from_vec).collect())
    }
}

impl From<Vec<DVector<f64>>> for BatchInput {
    fn from(vectors: Vec<DVector<f64>>) -> Self {
        BatchInput::Batch(vectors)
    }
}

/// N x n matrix: every row is one instance
impl From<DMatrix<f64>> for BatchInput {
    fn from(matrix: DMatrix<f64>) -> Self {
        BatchInput::Batch(
            matrix
                .row_iter()
                .map(|row| row.transpose().into_owned())
                .collect(),
        )
    }
}

/// batch size after broadcasting
pub fn broadcast_size(guesses: &BatchInput, params: &BatchInput) -> Result<usize, NewtonError> {
    match (guesses.batch_len(), params.batch_len()) {
        (None, None) => Ok(1),
        (Some(size), None) | (None, Some(size)) => Ok(size),
        (Some(g), Some(p)) if g == p => Ok(g),
        (Some(g), Some(p)) => Err(NewtonError::BatchSizeMismatch {
            guesses: g,
            params: p,
        }),
    }
}

/// outcomes of all instances, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSolution {
    pub outcomes: Vec<InstanceOutcome>,
    /// state dimension n
    pub dim: usize,
}

impl BatchSolution {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// one vector per instance: the root, or n NaN if the instance failed
    pub fn solutions(&self) -> Vec<DVector<f64>> {
        self.outcomes.iter().map(|o| o.to_vector(self.dim)).collect()
    }

    pub fn into_solutions(self) -> Vec<DVector<f64>> {
        let dim = self.dim;
        self.outcomes
            .into_iter()
            .map(|outcome| match outcome {
                InstanceOutcome::Converged { x, .. } => x,
                InstanceOutcome::Failed { .. } => DVector::from_element(dim, f64::NAN),
            })
            .collect()
    }

    /// N x n matrix of solutions, failed instances are NaN rows
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let solutions = self.solutions();
        DMatrix::from_row_iterator(
            solutions.len(),
            self.dim,
            solutions.iter().flat_map(|v| v.iter().copied()),
        )
    }

    pub fn converged_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converged()).count()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.is_converged())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_all_converged(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_converged())
    }

    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["#", "Status", "Iterations", "Solution"]);
        for (i, outcome) in self.outcomes.iter().enumerate() {
            let status = match outcome.failure() {
                None => "converged".to_string(),
                Some(reason) => reason.to_string(),
            };
            let solution = outcome
                .to_vector(self.dim)
                .iter()
                .map(|v| format!("{:.6e}", v))
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(row![i, status, outcome.iterations(), format!("[{}]", solution)]);
        }
        table
    }

    pub fn pretty_print(&self) {
        println!(
            "\n=== NEWTON BATCH: {} of {} instances converged ===",
            self.converged_count(),
            self.len()
        );
        self.summary_table().printstd();
    }
}

/// solves f(X, p) = 0 for every (guess, params) pair of the batch
///
/// Before the batch starts the residual is evaluated once more at the first guess, on the calling
/// thread, to check that it returns n components. This call is not counted in `max_iter`.
/// # Errors
/// structural problems only (see module docs); failures of single instances are in the outcomes
pub fn solve_batch<S: ResidualSystem + ?Sized>(
    system: &S,
    guesses: impl Into<BatchInput>,
    params: impl Into<BatchInput>,
    config: &NewtonConfig,
) -> Result<BatchSolution, NewtonError> {
    let guesses = guesses.into();
    let params = params.into();
    let size = broadcast_size(&guesses, &params)?;

    let n = guesses
        .component_len()
        .map_err(|(index, expected, found)| NewtonError::RaggedGuesses {
            index,
            expected,
            found,
        })?;
    let n_p = params
        .component_len()
        .map_err(|(index, expected, found)| NewtonError::RaggedParams {
            index,
            expected,
            found,
        })?;

    if size == 0 {
        info!("empty Newton batch, nothing to solve");
        return Ok(BatchSolution {
            outcomes: Vec::new(),
            dim: n.unwrap_or(0),
        });
    }
    let n = match n {
        Some(n) if n > 0 => n,
        _ => return Err(NewtonError::EmptyState),
    };
    let tolerances = config.validate(n)?;

    // Newton needs a square system; check it once on the first instance
    let probe = system.residual(guesses.get(0), params.get(0));
    if probe.len() != n {
        return Err(NewtonError::ResidualDimension {
            expected: n,
            found: probe.len(),
        });
    }

    info!(
        "Newton batch: {} instances, n = {}, n_p = {}, parallel = {}",
        size,
        n,
        n_p.unwrap_or(0),
        config.parallel
    );
    let solve_one =
        |i: usize| solve_instance(system, guesses.get(i), params.get(i), &tolerances, config);
    let outcomes: Vec<InstanceOutcome> = if config.parallel {
        (0..size).into_par_iter().map(solve_one).collect()
    } else {
        (0..size).map(solve_one).collect()
    };

    let solution = BatchSolution { outcomes, dim: n };
    for (i, outcome) in solution.outcomes.iter().enumerate() {
        if let Some(reason) = outcome.failure() {
            warn!("instance {} returned NaN: {}", i, reason);
        }
    }
    info!(
        "Newton batch finished: {} converged, {} failed",
        solution.converged_count(),
        solution.len() - solution.converged_count()
    );
    Ok(solution)
}
