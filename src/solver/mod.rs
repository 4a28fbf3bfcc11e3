// Solver module - pluggable QUBO backends
// This file defines the "solve a QUBO within a time budget" capability and
// re-exports the local reference solvers and the remote annealing client
//
// Numan Thabit 2025 Nov

pub mod anneal;
pub mod exhaustive;
#[cfg(feature = "http-solver")]
pub mod http;
pub mod retry;

use serde::Serialize;
use std::time::Duration;

use crate::errors::SolverError;
use crate::qubo::QuboModel;

pub use anneal::{AnnealSchedule, SimulatedAnnealer};
pub use exhaustive::ExhaustiveSolver;
#[cfg(feature = "http-solver")]
pub use http::HttpAnnealer;
pub use retry::RetryingSolver;

/// Best sample returned by a backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverOutput {
    pub assignment: Vec<bool>,
    pub objective: f64,
}

/// Anything that can minimize a QUBO within a time budget.
///
/// Implementations are anytime: when the budget runs out they return the best
/// assignment found so far instead of failing.
pub trait QuboSolver {
    fn name(&self) -> &str;

    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError>;
}

impl<S: QuboSolver + ?Sized> QuboSolver for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        (**self).solve(model, time_limit)
    }
}

impl<S: QuboSolver + ?Sized> QuboSolver for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        (**self).solve(model, time_limit)
    }
}
