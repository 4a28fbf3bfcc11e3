// Metrics and observability module
// This file registers the prometheus collectors used by the solvers and the
// route optimizer
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "router_request_latency_seconds",
        "latency for remote solver calls",
        &["service", "method"]
    )
    .unwrap()
});

pub static SOLVE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "router_solve_latency_seconds",
        "wall time spent inside a QUBO solver",
        &["solver"]
    )
    .unwrap()
});

pub static SOLVER_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_solver_errors_total",
        "solver failures by backend and kind",
        &["solver", "kind"]
    )
    .unwrap()
});

pub static INFEASIBLE_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_infeasible_outcomes_total",
        "constraint violations found while decoding solver samples",
        &["kind"]
    )
    .unwrap()
});

/// Text exposition of everything in the default registry
pub fn render() -> String {
    let mut buf = Vec::new();
    if TextEncoder::new()
        .encode(&prometheus::gather(), &mut buf)
        .is_err()
    {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_touched_collectors() {
        INFEASIBLE_OUTCOMES.with_label_values(&["channel"]).inc();
        assert!(render().contains("router_infeasible_outcomes_total"));
    }
}
