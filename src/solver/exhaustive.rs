// Exhaustive reference solver
// This file enumerates every assignment of a small QUBO in Gray-code order
// with incremental energy updates
//
// Numan Thabit 2025 Nov

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{QuboSolver, SolverOutput};
use crate::errors::SolverError;
use crate::qubo::QuboModel;

/// Deterministic brute force for test environments and tiny instances
#[derive(Debug, Clone)]
pub struct ExhaustiveSolver {
    pub max_variables: usize,
}

impl Default for ExhaustiveSolver {
    fn default() -> Self {
        Self { max_variables: 20 }
    }
}

impl ExhaustiveSolver {
    pub fn new(max_variables: usize) -> Self {
        Self { max_variables }
    }
}

impl QuboSolver for ExhaustiveSolver {
    fn name(&self) -> &str {
        "exhaustive"
    }

    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        let n = model.num_variables();
        if n > self.max_variables || n >= usize::BITS as usize {
            return Err(SolverError::TooLarge {
                variables: n,
                max: self.max_variables,
            });
        }

        let (linear, neighbors) = model.adjacency();
        // a budget too large to represent means no deadline
        let deadline = Instant::now().checked_add(time_limit);
        let mut x = vec![false; n];
        let mut energy = 0.0;
        let mut best = SolverOutput {
            assignment: x.clone(),
            objective: 0.0,
        };

        let states: u64 = 1 << n;
        for step in 1..states {
            if step % 4096 == 0 && deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(explored = step, states, "exhaustive search hit time limit");
                break;
            }
            let i = step.trailing_zeros() as usize;
            let field = linear[i]
                + neighbors[i]
                    .iter()
                    .filter(|(j, _)| x[*j])
                    .map(|(_, c)| c)
                    .sum::<f64>();
            if x[i] {
                energy -= field;
            } else {
                energy += field;
            }
            x[i] = !x[i];

            if energy < best.objective {
                best.objective = energy;
                best.assignment.clone_from(&x);
            }
        }

        debug!(variables = n, objective = best.objective, "exhaustive search done");
        Ok(best)
    }
}
