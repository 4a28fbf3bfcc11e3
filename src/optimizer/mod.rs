// Optimizer module - solve orchestration and report decoding
// This file exposes the route optimizer and the report types it produces
//
// Numan Thabit 2025 Nov

pub mod report;

#[allow(clippy::module_inception)]
pub mod optimizer;

pub use optimizer::{OptimizeConfig, RouteOptimizer};
pub use report::{
    decode, ChannelUsage, Decoded, OptimizationReport, ReportStats, RouteStatus, SelectedRoute,
    TransactionOutcome,
};
