// Simulated annealing solver
// This file implements a seeded single-flip Metropolis annealer with
// geometric cooling, random restarts and a greedy polish step
//
// Numan Thabit 2025 Nov

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{QuboSolver, SolverOutput};
use crate::errors::SolverError;
use crate::qubo::{QuboModel, Variable};

/// Cooling schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealSchedule {
    pub sweeps: usize,
    pub restarts: usize,
    /// Starting temperature; derived from the largest local field when unset
    pub initial_temperature: Option<f64>,
    /// Final temperature as a fraction of the initial one
    pub final_ratio: f64,
}

impl Default for AnnealSchedule {
    fn default() -> Self {
        Self {
            sweeps: 1_000,
            restarts: 4,
            initial_temperature: None,
            final_ratio: 1e-4,
        }
    }
}

/// Local heuristic backend, deterministic for a given seed
#[derive(Debug, Clone)]
pub struct SimulatedAnnealer {
    schedule: AnnealSchedule,
    seed: u64,
}

struct Landscape {
    linear: Vec<f64>,
    neighbors: Vec<Vec<(Variable, f64)>>,
}

impl Landscape {
    /// Energy change of flipping `i` in `x`
    fn delta(&self, x: &[bool], i: Variable) -> f64 {
        let field = self.linear[i]
            + self.neighbors[i]
                .iter()
                .filter(|(j, _)| x[*j])
                .map(|(_, c)| c)
                .sum::<f64>();
        if x[i] {
            -field
        } else {
            field
        }
    }

    fn temperature_scale(&self) -> f64 {
        let scale = self
            .linear
            .iter()
            .zip(&self.neighbors)
            .map(|(l, ns)| l.abs() + ns.iter().map(|(_, c)| c.abs()).sum::<f64>())
            .fold(0.0, f64::max);
        if scale > 0.0 {
            scale
        } else {
            1.0
        }
    }

    /// Flip improving bits until none is left
    fn descend(&self, x: &mut [bool], energy: &mut f64) {
        loop {
            let mut improved = false;
            for i in 0..x.len() {
                let delta = self.delta(x, i);
                if delta < 0.0 {
                    x[i] = !x[i];
                    *energy += delta;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
    }
}

impl SimulatedAnnealer {
    pub fn new(seed: u64) -> Self {
        Self {
            schedule: AnnealSchedule::default(),
            seed,
        }
    }

    pub fn with_schedule(mut self, schedule: AnnealSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> &AnnealSchedule {
        &self.schedule
    }
}

impl QuboSolver for SimulatedAnnealer {
    fn name(&self) -> &str {
        "simulated_annealing"
    }

    #[tracing::instrument(skip_all, fields(variables = model.num_variables(), seed = self.seed))]
    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        let n = model.num_variables();
        if n == 0 {
            return Ok(SolverOutput {
                assignment: Vec::new(),
                objective: 0.0,
            });
        }

        let (linear, neighbors) = model.adjacency();
        let landscape = Landscape { linear, neighbors };
        // a budget too large to represent means no deadline
        let deadline = Instant::now().checked_add(time_limit);
        let mut rng = ChaCha20Rng::seed_from_u64(self.seed);

        let t0 = self
            .schedule
            .initial_temperature
            .unwrap_or_else(|| landscape.temperature_scale());
        let steps = self.schedule.sweeps.saturating_sub(1).max(1) as f64;
        let cooling = self.schedule.final_ratio.powf(1.0 / steps);

        let mut best: Option<SolverOutput> = None;
        let mut timed_out = false;

        for restart in 0..self.schedule.restarts.max(1) {
            let mut x: Vec<bool> = (0..n).map(|_| rng.gen_bool(0.5)).collect();
            let mut energy = model.energy(&x);
            let mut temperature = t0;

            for _ in 0..self.schedule.sweeps {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    timed_out = true;
                    break;
                }
                for i in 0..n {
                    let delta = landscape.delta(&x, i);
                    if delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature).exp() {
                        x[i] = !x[i];
                        energy += delta;
                    }
                }
                temperature *= cooling;
            }
            landscape.descend(&mut x, &mut energy);

            debug!(restart, energy, "annealing run finished");
            if best.as_ref().map_or(true, |b| energy < b.objective) {
                best = Some(SolverOutput {
                    assignment: x,
                    objective: energy,
                });
            }
            if timed_out {
                warn!(restart, "annealing hit time limit; returning best sample so far");
                break;
            }
        }

        let mut best = best.unwrap_or_else(|| SolverOutput {
            assignment: vec![false; n],
            objective: 0.0,
        });
        // incremental sums drift; report the exact energy
        best.objective = model.energy(&best.assignment);
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ExhaustiveSolver;

    fn frustrated_model() -> QuboModel {
        let mut model = QuboModel::new(6);
        for v in 0..6 {
            model.add_linear(v, -2.0 + v as f64 * 0.3);
        }
        for u in 0..6 {
            for v in (u + 1)..6 {
                model.add(u, v, if (u + v) % 2 == 0 { 1.5 } else { -0.7 });
            }
        }
        model
    }

    #[test]
    fn matches_exhaustive_on_small_model() {
        let model = frustrated_model();
        let exact = ExhaustiveSolver::default()
            .solve(&model, Duration::from_secs(5))
            .unwrap();
        let annealed = SimulatedAnnealer::new(42)
            .solve(&model, Duration::from_secs(5))
            .unwrap();
        assert!((annealed.objective - exact.objective).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_sample() {
        let model = frustrated_model();
        let schedule = AnnealSchedule {
            sweeps: 50,
            restarts: 2,
            ..AnnealSchedule::default()
        };
        let a = SimulatedAnnealer::new(7)
            .with_schedule(schedule)
            .solve(&model, Duration::from_secs(5))
            .unwrap();
        let b = SimulatedAnnealer::new(7)
            .with_schedule(schedule)
            .solve(&model, Duration::from_secs(5))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_budget_still_returns_a_sample() {
        let model = frustrated_model();
        let out = SimulatedAnnealer::new(1)
            .solve(&model, Duration::ZERO)
            .unwrap();
        assert_eq!(out.assignment.len(), 6);
        assert!((model.energy(&out.assignment) - out.objective).abs() < 1e-12);
    }

    #[test]
    fn unbounded_budget_runs_the_full_schedule() {
        let model = frustrated_model();
        let schedule = AnnealSchedule {
            sweeps: 20,
            restarts: 1,
            ..AnnealSchedule::default()
        };
        let out = SimulatedAnnealer::new(1)
            .with_schedule(schedule)
            .solve(&model, Duration::MAX)
            .unwrap();
        assert_eq!(out.assignment.len(), 6);
    }

    #[test]
    fn empty_model_is_trivial() {
        let out = SimulatedAnnealer::new(1)
            .solve(&QuboModel::new(0), Duration::from_secs(1))
            .unwrap();
        assert!(out.assignment.is_empty());
        assert_eq!(out.objective, 0.0);
    }
}
