// Router module - transactions and candidate route discovery
// This file wires together the route types and the penalized
// shortest-path finder that feeds the optimizer
//
// Numan Thabit 2025 Nov

pub mod finder;
pub mod routes;

pub use finder::RouteFinder;
pub use routes::{CandidateRoute, Candidates, RouteInfo, Transaction, TransactionId};
