// Error types and error handling module
// This file defines the typed errors raised by graph construction,
// route discovery, solver backends and the optimization pipeline
//
// Numan Thabit 2025 Nov

use thiserror::Error;

use crate::graph::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("a network needs at least 2 nodes, got {0}")]
    TooFewNodes(usize),
    #[error("{channels} channels cannot connect {nodes} nodes (need at least {})", .nodes.saturating_sub(1))]
    InsufficientChannels { nodes: usize, channels: usize },
    #[error("invalid capacity range {min}..={max}")]
    InvalidCapacityRange { min: u64, max: u64 },
    #[error("channel endpoint {node} is outside the node set (size {nodes})")]
    UnknownNode { node: NodeId, nodes: usize },
    #[error("channel {0} -> {0} is a self loop")]
    SelfLoop(NodeId),
    #[error("duplicate channel between {0} and {1}")]
    DuplicateChannel(NodeId, NodeId),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouteError {
    #[error("invalid amount range {min}..={max}")]
    InvalidAmountRange { min: u64, max: u64 },
    #[error("transactions need a graph with at least 2 nodes, got {0}")]
    TooFewNodes(usize),
    #[error("edge penalty must be finite and positive, got {0}")]
    InvalidEdgePenalty(f64),
    #[error("transaction {0} has identical source and destination")]
    SameEndpoints(usize),
    #[error("route for transaction {transaction_id} is not a path: {reason}")]
    InvalidPath {
        transaction_id: usize,
        reason: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("solver timed out: {0}")]
    Timeout(String),
    #[error("solver rejected credentials: {0}")]
    Authentication(String),
    #[error("solver transport error: {0}")]
    Transport(String),
    #[error("invalid solver response: {0}")]
    InvalidResponse(String),
    #[error("model has {variables} variables, solver accepts at most {max}")]
    TooLarge { variables: usize, max: usize },
}

impl SolverError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            SolverError::Timeout(_) => "timeout",
            SolverError::Authentication(_) => "authentication",
            SolverError::Transport(_) => "transport",
            SolverError::InvalidResponse(_) => "invalid_response",
            SolverError::TooLarge { .. } => "too_large",
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SolverError::Timeout(_) | SolverError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),
    #[error("solver returned {got} values for a model with {expected} variables")]
    AssignmentLength { expected: usize, got: usize },
    #[error("candidate routes reference unknown transaction {0}")]
    UnknownTransaction(usize),
}
