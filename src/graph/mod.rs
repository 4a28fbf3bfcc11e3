// Graph module - payment network model and generator
//
// Numan Thabit 2025 Nov

pub mod generator;
pub mod network;

pub use generator::{generate, GraphGenerator};
pub use network::{Channel, ChannelId, Graph, GraphStats, NodeId};
