// Library root module for anneal-router
// This file defines the public API and module structure for the anneal-router library
// It exports the payment-network routing pipeline: graph generation, candidate
// route discovery, QUBO construction, pluggable solvers and report decoding
//
// Numan Thabit 2025 Nov

pub mod config;
pub mod errors;
pub mod graph;
pub mod metrics;
pub mod optimizer;
pub mod qubo;
pub mod router;
pub mod solver;
