// End-to-end routing scenarios over small hand-built networks
//
// Numan Thabit 2025 Nov

use std::time::Duration;

use anneal_router::errors::{OptimizeError, SolverError};
use anneal_router::graph::Graph;
use anneal_router::optimizer::{OptimizeConfig, RouteOptimizer, RouteStatus};
use anneal_router::qubo::{PenaltyWeights, QuboModel};
use anneal_router::router::{CandidateRoute, Candidates, RouteFinder, Transaction};
use anneal_router::solver::{
    ExhaustiveSolver, QuboSolver, RetryingSolver, SimulatedAnnealer, SolverOutput,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rstest::rstest;

/// Six nodes in a cycle, 300 capacity on every channel; channel `i` joins `i` and `i + 1`
fn ring() -> Graph {
    Graph::from_channels(6, (0..6).map(|i| (i, (i + 1) % 6, 300, 0.1))).unwrap()
}

/// Route-constraint weight that dominates the capacity reward
fn strict_config() -> OptimizeConfig {
    OptimizeConfig {
        alpha: 1e6,
        beta: Some(1.0),
        time_limit: Duration::from_secs(5),
    }
}

fn ring_scenario() -> (Graph, Vec<Transaction>, Candidates) {
    let graph = ring();
    let txs = vec![Transaction::new(0, 0, 3, 250).unwrap()];
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let candidates = RouteFinder::new(&graph).find_all_routes(&txs, 2, &mut rng);
    (graph, txs, candidates)
}

fn check_ring_solution<S: QuboSolver>(solver: S) {
    let (graph, txs, candidates) = ring_scenario();
    assert_eq!(candidates[&0].len(), 2);

    let report = RouteOptimizer::new(solver)
        .optimize(&graph, &txs, &candidates, &strict_config())
        .unwrap();

    assert!(report.is_feasible());
    assert_eq!(report.assignment.iter().filter(|x| **x).count(), 1);
    let outcome = report.outcome(0).unwrap();
    assert_eq!(outcome.status, RouteStatus::Routed);
    let route = outcome.selected.as_ref().unwrap();
    assert_eq!(route.hop_count, 3);
    assert!(route.nodes == vec![0, 1, 2, 3] || route.nodes == vec![0, 5, 4, 3]);

    assert_eq!(report.channels.len(), 3);
    for usage in &report.channels {
        assert_eq!(usage.usage, 250);
        assert!(usage.usage <= usage.capacity && usage.feasible);
    }
    assert_eq!(report.stats.routed, 1);
    assert_eq!(report.stats.avg_hops, 3.0);
}

#[test]
fn ring_exhaustive() {
    check_ring_solution(ExhaustiveSolver::default());
}

#[test]
fn ring_simulated_annealing() {
    check_ring_solution(SimulatedAnnealer::new(3));
}

#[test]
fn hand_built_assignment_pays_beta_per_hop() {
    let (graph, txs, candidates) = ring_scenario();
    let config = OptimizeConfig {
        beta: None,
        ..strict_config()
    };
    let report = RouteOptimizer::new(ExhaustiveSolver::default())
        .evaluate(&graph, &txs, &candidates, &config, vec![true, false])
        .unwrap();

    let beta = PenaltyWeights::default_beta(&txs);
    assert_eq!(beta, 250.0 * 250.0 * 100.0);
    assert_eq!(report.variable_info.beta, beta);
    assert!(report.is_feasible());
    assert_eq!(report.energy.distance, beta * 3.0);
}

/// Two payments on the ring: t0 0 -> 3 for 250, t1 2 -> 3 for 100
fn two_payments() -> (Graph, Vec<Transaction>, Candidates) {
    let graph = ring();
    let txs = vec![
        Transaction::new(0, 0, 3, 250).unwrap(),
        Transaction::new(1, 2, 3, 100).unwrap(),
    ];
    let mut candidates = Candidates::new();
    candidates.insert(
        0,
        vec![
            CandidateRoute::new(&graph, &txs[0], vec![0, 1, 2, 3]).unwrap(),
            CandidateRoute::new(&graph, &txs[0], vec![0, 5, 4, 3]).unwrap(),
        ],
    );
    candidates.insert(
        1,
        vec![
            CandidateRoute::new(&graph, &txs[1], vec![2, 3]).unwrap(),
            CandidateRoute::new(&graph, &txs[1], vec![2, 1, 0, 5, 4, 3]).unwrap(),
        ],
    );
    (graph, txs, candidates)
}

fn evaluate(assignment: Vec<bool>) -> anneal_router::optimizer::OptimizationReport {
    let (graph, txs, candidates) = two_payments();
    RouteOptimizer::new(ExhaustiveSolver::default())
        .evaluate(&graph, &txs, &candidates, &strict_config(), assignment)
        .unwrap()
}

#[test]
fn disjoint_selection_is_feasible() {
    let report = evaluate(vec![false, true, true, false]);
    assert!(report.is_feasible());
    assert_eq!(report.stats.routed, 2);
    assert_eq!(report.stats.total_hops, 4);
}

#[test]
fn double_selection_flags_only_that_transaction() {
    let report = evaluate(vec![true, true, true, false]);
    assert_eq!(report.outcome(0).unwrap().status, RouteStatus::Conflicting);
    assert_eq!(report.outcome(1).unwrap().status, RouteStatus::Routed);
    assert!(report.channels.iter().all(|c| c.feasible));
    assert_eq!(report.stats.infeasible, 1);
    assert!(!report.is_feasible());
}

#[test]
fn overload_flags_only_the_shared_channel() {
    // both payments cross channel 2 (nodes 2-3): 250 + 100 > 300
    let report = evaluate(vec![true, false, true, false]);
    let overloaded: Vec<_> = report
        .channels
        .iter()
        .filter(|c| !c.feasible)
        .map(|c| c.channel_id)
        .collect();
    assert_eq!(overloaded, vec![2]);
    assert_eq!(report.channel_usage(2).unwrap().usage, 350);
    assert!(report.outcomes.iter().all(|o| o.is_feasible()));
    assert!(!report.is_feasible());
}

#[test]
fn isolated_destination_is_unroutable() {
    let graph = Graph::from_channels(4, [(0, 1, 300, 0.1), (1, 2, 300, 0.1), (0, 2, 300, 0.1)])
        .unwrap();
    assert!(!graph.is_connected());
    let txs = vec![
        Transaction::new(0, 0, 3, 50).unwrap(),
        Transaction::new(1, 0, 2, 50).unwrap(),
    ];
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let candidates = RouteFinder::new(&graph).find_all_routes(&txs, 2, &mut rng);
    assert!(candidates[&0].is_empty());

    let report = RouteOptimizer::new(ExhaustiveSolver::default())
        .optimize(&graph, &txs, &candidates, &strict_config())
        .unwrap();
    assert_eq!(report.outcome(0).unwrap().status, RouteStatus::Unroutable);
    assert_eq!(report.outcome(1).unwrap().status, RouteStatus::Routed);
    assert_eq!(report.stats.unroutable, 1);
    assert_eq!(report.variable_info.used_variables, candidates[&1].len());
}

struct Unavailable(SolverError);

impl QuboSolver for Unavailable {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn solve(&self, _: &QuboModel, _: Duration) -> Result<SolverOutput, SolverError> {
        Err(self.0.clone())
    }
}

#[rstest]
#[case::timeout(SolverError::Timeout("deadline".into()))]
#[case::auth(SolverError::Authentication("403".into()))]
fn solver_failure_is_a_distinct_error(#[case] failure: SolverError) {
    let (graph, txs, candidates) = ring_scenario();
    let solver = RetryingSolver::new(Unavailable(failure.clone()), 1)
        .with_intervals(Duration::from_millis(1), Duration::from_secs(1));
    let err = RouteOptimizer::new(solver)
        .optimize(&graph, &txs, &candidates, &strict_config())
        .unwrap_err();
    match err {
        OptimizeError::Solver(inner) => assert_eq!(inner, failure),
        other => panic!("unexpected error {other:?}"),
    }
}
