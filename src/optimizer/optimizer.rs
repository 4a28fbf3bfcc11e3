// Route optimizer
// This file orchestrates Hamiltonian construction, the solver call and the
// decoding of the returned assignment into an optimization report
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::report::{decode, OptimizationReport};
use crate::errors::OptimizeError;
use crate::graph::Graph;
use crate::metrics::{SOLVER_ERRORS, SOLVE_LATENCY};
use crate::qubo::{Hamiltonian, HamiltonianBuilder, PenaltyWeights, DEFAULT_ALPHA};
use crate::router::{Candidates, Transaction};
use crate::solver::{QuboSolver, SolverOutput};

/// Per-call optimization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeConfig {
    pub alpha: f64,
    /// Distance weight; derived from the mean amount when unset
    pub beta: Option<f64>,
    pub time_limit: Duration,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: None,
            time_limit: Duration::from_secs(60),
        }
    }
}

/// Selects one route per transaction by minimizing the routing QUBO
pub struct RouteOptimizer<S> {
    solver: S,
}

impl<S: QuboSolver> RouteOptimizer<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Build the Hamiltonian, solve it and decode the best assignment
    #[tracing::instrument(skip_all, fields(solver = self.solver.name(), transactions = transactions.len()))]
    pub fn optimize(
        &self,
        graph: &Graph,
        transactions: &[Transaction],
        candidates: &Candidates,
        config: &OptimizeConfig,
    ) -> Result<OptimizationReport, OptimizeError> {
        let hamiltonian = build_hamiltonian(graph, transactions, candidates, config)?;
        let variables = hamiltonian.index.len();

        let started = Instant::now();
        let output = if variables == 0 {
            warn!("no routable transaction; skipping solver");
            SolverOutput {
                assignment: Vec::new(),
                objective: 0.0,
            }
        } else {
            self.solve(&hamiltonian, config.time_limit)?
        };
        let elapsed = started.elapsed();

        if output.assignment.len() != variables {
            return Err(OptimizeError::AssignmentLength {
                expected: variables,
                got: output.assignment.len(),
            });
        }

        let report = assemble(
            self.solver.name(),
            &hamiltonian,
            graph,
            transactions,
            candidates,
            output,
            elapsed,
        )?;
        info!(
            routed = report.stats.routed,
            infeasible = report.stats.infeasible,
            unroutable = report.stats.unroutable,
            overloaded = report.stats.overloaded_channels,
            objective = report.objective,
            elapsed_ms = elapsed.as_millis() as u64,
            "optimization finished"
        );
        Ok(report)
    }

    /// Score a caller-provided assignment as if a solver had returned it
    pub fn evaluate(
        &self,
        graph: &Graph,
        transactions: &[Transaction],
        candidates: &Candidates,
        config: &OptimizeConfig,
        assignment: Vec<bool>,
    ) -> Result<OptimizationReport, OptimizeError> {
        let hamiltonian = build_hamiltonian(graph, transactions, candidates, config)?;
        let objective = if assignment.len() == hamiltonian.index.len() {
            hamiltonian.model.energy(&assignment)
        } else {
            0.0
        };
        assemble(
            "manual",
            &hamiltonian,
            graph,
            transactions,
            candidates,
            SolverOutput {
                assignment,
                objective,
            },
            Duration::ZERO,
        )
    }

    fn solve(&self, hamiltonian: &Hamiltonian, time_limit: Duration) -> Result<SolverOutput, OptimizeError> {
        let name = self.solver.name();
        let timer = SOLVE_LATENCY.with_label_values(&[name]).start_timer();
        let result = self.solver.solve(&hamiltonian.model, time_limit);
        timer.observe_duration();
        result.map_err(|err| {
            SOLVER_ERRORS.with_label_values(&[name, err.kind()]).inc();
            warn!(solver = name, error = %err, "solver failed");
            OptimizeError::Solver(err)
        })
    }
}

fn build_hamiltonian(
    graph: &Graph,
    transactions: &[Transaction],
    candidates: &Candidates,
    config: &OptimizeConfig,
) -> Result<Hamiltonian, OptimizeError> {
    if let Some(&unknown) = candidates
        .keys()
        .find(|id| !transactions.iter().any(|t| t.id == **id))
    {
        return Err(OptimizeError::UnknownTransaction(unknown));
    }
    let weights = PenaltyWeights::for_transactions(transactions, config.alpha, config.beta);
    Ok(HamiltonianBuilder::new(graph, transactions, candidates, weights).build())
}

fn assemble(
    solver: &str,
    hamiltonian: &Hamiltonian,
    graph: &Graph,
    transactions: &[Transaction],
    candidates: &Candidates,
    output: SolverOutput,
    elapsed: Duration,
) -> Result<OptimizationReport, OptimizeError> {
    let decoded = decode(hamiltonian, graph, transactions, candidates, &output.assignment)?;
    Ok(OptimizationReport {
        solver: solver.to_string(),
        energy: hamiltonian.breakdown(&output.assignment),
        assignment: output.assignment,
        outcomes: decoded.outcomes,
        channels: decoded.channels,
        objective: output.objective,
        stats: decoded.stats,
        elapsed,
        variable_info: hamiltonian.info.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SolverError;
    use crate::optimizer::RouteStatus;
    use crate::qubo::QuboModel;
    use crate::router::CandidateRoute;
    use crate::solver::{ExhaustiveSolver, RetryingSolver};
    use std::cell::Cell;

    /// Returns a fixed answer and counts calls
    struct Canned {
        answer: Result<SolverOutput, SolverError>,
        calls: Cell<usize>,
    }

    impl Canned {
        fn new(answer: Result<SolverOutput, SolverError>) -> Self {
            Self {
                answer,
                calls: Cell::new(0),
            }
        }
    }

    impl QuboSolver for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        fn solve(&self, _: &QuboModel, _: Duration) -> Result<SolverOutput, SolverError> {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
    }

    /// Transport failure on every call, under a label no other test touches
    struct Offline;

    impl QuboSolver for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn solve(&self, _: &QuboModel, _: Duration) -> Result<SolverOutput, SolverError> {
            Err(SolverError::Transport("connection refused".into()))
        }
    }

    fn line() -> (Graph, Vec<Transaction>, Candidates) {
        let graph = Graph::from_channels(3, [(0, 1, 100, 0.1), (1, 2, 100, 0.1), (0, 2, 100, 0.1)])
            .unwrap();
        let txs = vec![Transaction::new(0, 0, 2, 10).unwrap()];
        let mut candidates = Candidates::new();
        candidates.insert(
            0,
            vec![
                CandidateRoute::new(&graph, &txs[0], vec![0, 2]).unwrap(),
                CandidateRoute::new(&graph, &txs[0], vec![0, 1, 2]).unwrap(),
            ],
        );
        (graph, txs, candidates)
    }

    /// Weights large enough to outweigh the capacity reward of longer routes
    fn config() -> OptimizeConfig {
        OptimizeConfig {
            alpha: 1e6,
            beta: Some(5_000.0),
            time_limit: Duration::from_secs(5),
        }
    }

    #[test]
    fn exhaustive_picks_the_short_route() {
        let (graph, txs, candidates) = line();
        let report = RouteOptimizer::new(ExhaustiveSolver::default())
            .optimize(&graph, &txs, &candidates, &config())
            .unwrap();
        assert!(report.is_feasible());
        let selected = report.outcome(0).unwrap().selected.as_ref().unwrap();
        assert_eq!(selected.nodes, vec![0, 2]);
        assert_eq!(report.assignment, vec![true, false]);
        assert!((report.energy.total - report.objective).abs() < 1e-6);
        assert_eq!(report.energy.distance, 5_000.0);
    }

    #[test]
    fn solver_failure_is_surfaced() {
        let (graph, txs, candidates) = line();
        let solver = Canned::new(Err(SolverError::Authentication("401".into())));
        let err = RouteOptimizer::new(&solver)
            .optimize(&graph, &txs, &candidates, &config())
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Solver(SolverError::Authentication(_))));
    }

    #[test]
    fn retried_failure_counts_once_per_attempt() {
        let (graph, txs, candidates) = line();
        let errors = SOLVER_ERRORS.with_label_values(&["offline", "transport"]);
        let before = errors.get();
        let solver = RetryingSolver::new(Offline, 3)
            .with_intervals(Duration::from_millis(1), Duration::from_secs(5));
        let err = RouteOptimizer::new(solver)
            .optimize(&graph, &txs, &candidates, &config())
            .unwrap_err();
        assert!(matches!(err, OptimizeError::Solver(SolverError::Transport(_))));
        // three retried attempts plus the final failure
        assert_eq!(errors.get() - before, 4.0);
    }

    #[test]
    fn short_assignment_breaks_the_contract() {
        let (graph, txs, candidates) = line();
        let solver = Canned::new(Ok(SolverOutput {
            assignment: vec![true],
            objective: 0.0,
        }));
        let err = RouteOptimizer::new(&solver)
            .optimize(&graph, &txs, &candidates, &config())
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::AssignmentLength { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn candidates_for_unknown_transactions_are_rejected() {
        let (graph, txs, mut candidates) = line();
        let stray = candidates[&0].clone();
        candidates.insert(9, stray);
        let err = RouteOptimizer::new(ExhaustiveSolver::default())
            .optimize(&graph, &txs, &candidates, &config())
            .unwrap_err();
        assert!(matches!(err, OptimizeError::UnknownTransaction(9)));
    }

    #[test]
    fn nothing_to_solve_skips_the_solver() {
        let (graph, txs, _) = line();
        let solver = Canned::new(Err(SolverError::Transport("unreachable".into())));
        let report = RouteOptimizer::new(&solver)
            .optimize(&graph, &txs, &Candidates::new(), &config())
            .unwrap();
        assert_eq!(solver.calls.get(), 0);
        assert_eq!(report.objective, 0.0);
        assert_eq!(report.outcomes[0].status, RouteStatus::Unroutable);
        assert_eq!(report.stats.unroutable, 1);
    }

    #[test]
    fn evaluate_scores_a_manual_assignment() {
        let (graph, txs, candidates) = line();
        let report = RouteOptimizer::new(ExhaustiveSolver::default())
            .evaluate(&graph, &txs, &candidates, &config(), vec![false, true])
            .unwrap();
        assert_eq!(report.solver, "manual");
        assert_eq!(report.outcome(0).unwrap().selected.as_ref().unwrap().hop_count, 2);
        assert_eq!(report.objective, report.energy.total);
    }
}
