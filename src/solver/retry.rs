// Retry wrapper for flaky solver backends
// This file re-submits a model when a backend fails with a transient error,
// backing off exponentially between attempts
//
// Numan Thabit 2025 Nov

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::cell::Cell;
use std::time::Duration;
use tracing::warn;

use super::{QuboSolver, SolverOutput};
use crate::errors::SolverError;
use crate::metrics::SOLVER_ERRORS;
use crate::qubo::QuboModel;

/// Wraps a backend and retries timeouts and transport failures
#[derive(Debug, Clone)]
pub struct RetryingSolver<S> {
    inner: S,
    max_retries: u32,
    initial_interval: Duration,
    max_elapsed: Duration,
}

impl<S: QuboSolver> RetryingSolver<S> {
    pub fn new(inner: S, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries,
            initial_interval: Duration::from_millis(200),
            max_elapsed: Duration::from_secs(60),
        }
    }

    pub fn with_intervals(mut self, initial: Duration, max_elapsed: Duration) -> Self {
        self.initial_interval = initial;
        self.max_elapsed = max_elapsed;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

impl<S: QuboSolver> QuboSolver for RetryingSolver<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        let attempts = Cell::new(0u32);
        let op = || {
            let attempt = attempts.get();
            attempts.set(attempt + 1);
            match self.inner.solve(model, time_limit) {
                Ok(out) => Ok(out),
                Err(err) => {
                    if err.is_transient() && attempt < self.max_retries {
                        // the final failure is counted by whoever receives it
                        SOLVER_ERRORS
                            .with_label_values(&[self.inner.name(), err.kind()])
                            .inc();
                        warn!(solver = self.inner.name(), attempt, error = %err, "solver failed; retrying");
                        Err(backoff::Error::transient(err))
                    } else {
                        Err(backoff::Error::permanent(err))
                    }
                }
            }
        };

        backoff::retry(self.policy(), op).map_err(|err| match err {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails with the queued errors, then succeeds
    struct Flaky {
        failures: std::cell::RefCell<Vec<SolverError>>,
        calls: Cell<usize>,
    }

    impl Flaky {
        fn new(mut failures: Vec<SolverError>) -> Self {
            failures.reverse();
            Self {
                failures: std::cell::RefCell::new(failures),
                calls: Cell::new(0),
            }
        }
    }

    impl QuboSolver for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn solve(&self, model: &QuboModel, _: Duration) -> Result<SolverOutput, SolverError> {
            self.calls.set(self.calls.get() + 1);
            match self.failures.borrow_mut().pop() {
                Some(err) => Err(err),
                None => Ok(SolverOutput {
                    assignment: vec![false; model.num_variables()],
                    objective: 0.0,
                }),
            }
        }
    }

    /// Always reports a transport failure under its own metric label
    struct Unreachable;

    impl QuboSolver for Unreachable {
        fn name(&self) -> &str {
            "unreachable_backend"
        }

        fn solve(&self, _: &QuboModel, _: Duration) -> Result<SolverOutput, SolverError> {
            Err(SolverError::Transport("connection refused".into()))
        }
    }

    fn fast<S: QuboSolver>(inner: S, retries: u32) -> RetryingSolver<S> {
        RetryingSolver::new(inner, retries)
            .with_intervals(Duration::from_millis(1), Duration::from_secs(5))
    }

    #[test]
    fn recovers_from_transient_failures() {
        let solver = fast(
            Flaky::new(vec![
                SolverError::Transport("reset".into()),
                SolverError::Timeout("slow".into()),
            ]),
            3,
        );
        let out = solver.solve(&QuboModel::new(2), Duration::from_secs(1)).unwrap();
        assert_eq!(out.assignment, vec![false, false]);
        assert_eq!(solver.inner().calls.get(), 3);
    }

    #[test]
    fn authentication_is_not_retried() {
        let solver = fast(
            Flaky::new(vec![SolverError::Authentication("bad token".into())]),
            5,
        );
        let err = solver.solve(&QuboModel::new(1), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SolverError::Authentication(_)));
        assert_eq!(solver.inner().calls.get(), 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let failures = (0..10)
            .map(|i| SolverError::Transport(format!("attempt {i}")))
            .collect();
        let solver = fast(Flaky::new(failures), 2);
        let err = solver.solve(&QuboModel::new(1), Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, SolverError::Transport("attempt 2".into()));
        assert_eq!(solver.inner().calls.get(), 3);
    }

    #[test]
    fn counts_only_the_attempts_it_retries() {
        let errors = SOLVER_ERRORS.with_label_values(&["unreachable_backend", "transport"]);
        let before = errors.get();
        let solver = fast(Unreachable, 2);
        solver.solve(&QuboModel::new(1), Duration::from_secs(1)).unwrap_err();
        assert_eq!(errors.get() - before, 2.0);
    }
}
