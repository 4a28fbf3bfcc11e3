// Transaction and candidate route types
// This file defines payment transactions, validated candidate paths and
// per-route summaries used when scoring routing decisions
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::RouteError;
use crate::graph::{ChannelId, Graph, NodeId};

pub type TransactionId = usize;

/// Candidate routes per transaction, keyed by transaction id
pub type Candidates = BTreeMap<TransactionId, Vec<CandidateRoute>>;

/// A payment to be routed from `source` to `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source: NodeId,
    pub destination: NodeId,
    pub amount: u64,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        source: NodeId,
        destination: NodeId,
        amount: u64,
    ) -> Result<Self, RouteError> {
        if source == destination {
            return Err(RouteError::SameEndpoints(id));
        }
        Ok(Self {
            id,
            source,
            destination,
            amount,
        })
    }
}

/// One possible path for a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRoute {
    pub transaction_id: TransactionId,
    nodes: Vec<NodeId>,
    channels: Vec<ChannelId>,
}

impl CandidateRoute {
    /// Validate `nodes` against `graph` and the transaction endpoints
    pub fn new(graph: &Graph, tx: &Transaction, nodes: Vec<NodeId>) -> Result<Self, RouteError> {
        let invalid = |reason: String| RouteError::InvalidPath {
            transaction_id: tx.id,
            reason,
        };

        if nodes.len() < 2 {
            return Err(invalid(format!("{} node(s)", nodes.len())));
        }
        if nodes.first() != Some(&tx.source) || nodes.last() != Some(&tx.destination) {
            return Err(invalid(format!(
                "expected {} -> {}, got {:?}",
                tx.source, tx.destination, nodes
            )));
        }

        let mut seen = std::collections::HashSet::with_capacity(nodes.len());
        if let Some(repeat) = nodes.iter().find(|n| !seen.insert(**n)) {
            return Err(invalid(format!("node {repeat} visited twice")));
        }

        let channels = nodes
            .windows(2)
            .map(|hop| {
                graph
                    .channel_between(hop[0], hop[1])
                    .map(|c| c.id)
                    .ok_or_else(|| invalid(format!("no channel {} - {}", hop[0], hop[1])))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            transaction_id: tx.id,
            nodes,
            channels,
        })
    }

    /// Build from a path already known to be valid, e.g. one produced by a graph search
    pub(crate) fn from_parts(
        transaction_id: TransactionId,
        nodes: Vec<NodeId>,
        channels: Vec<ChannelId>,
    ) -> Self {
        debug_assert_eq!(nodes.len(), channels.len() + 1);
        Self {
            transaction_id,
            nodes,
            channels,
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Channels traversed, in path order
    pub fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    pub fn hop_count(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn uses_channel(&self, channel: ChannelId) -> bool {
        self.channels.contains(&channel)
    }
}

/// Route summary for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    pub num_hops: usize,
    pub total_fee: f64,
    pub channels: Vec<(NodeId, NodeId)>,
    pub capacities: Vec<u64>,
    pub avg_capacity: f64,
}

impl RouteInfo {
    pub fn for_route(graph: &Graph, route: &CandidateRoute) -> Self {
        let hops: Vec<_> = route
            .channels()
            .iter()
            .filter_map(|&id| graph.channel(id))
            .collect();
        let capacities: Vec<u64> = hops.iter().map(|c| c.capacity).collect();
        let avg_capacity = if capacities.is_empty() {
            0.0
        } else {
            capacities.iter().sum::<u64>() as f64 / capacities.len() as f64
        };

        Self {
            num_hops: route.hop_count(),
            total_fee: hops.iter().map(|c| c.fee).sum(),
            channels: route.nodes().windows(2).map(|w| (w[0], w[1])).collect(),
            capacities,
            avg_capacity,
        }
    }
}
