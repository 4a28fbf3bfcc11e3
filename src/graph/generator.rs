// Scale-free network generator
// This file grows a payment-channel topology by preferential attachment and
// annotates every channel with a capacity and a forwarding fee
//
// Numan Thabit 2025 Nov

use rand::Rng;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use tracing::{debug, info};

use super::network::{Graph, NodeId};
use crate::errors::GraphError;

/// Base forwarding fee, scaled per channel by a random multiplier
pub const BASE_FEE: f64 = 0.1;
const FEE_MULTIPLIER: RangeInclusive<f64> = 0.01..=2.0;
/// Top-up attempts allowed per missing edge before giving up
const ATTEMPTS_PER_EDGE: usize = 20;

/// Preferential-attachment graph generator
#[derive(Debug, Clone)]
pub struct GraphGenerator {
    pub num_nodes: usize,
    pub num_channels: usize,
    pub capacity_range: RangeInclusive<u64>,
}

impl GraphGenerator {
    pub fn new(num_nodes: usize, num_channels: usize, capacity_range: RangeInclusive<u64>) -> Self {
        Self {
            num_nodes,
            num_channels,
            capacity_range,
        }
    }

    fn validate(&self) -> Result<(), GraphError> {
        if self.num_nodes < 2 {
            return Err(GraphError::TooFewNodes(self.num_nodes));
        }
        if self.num_channels < self.num_nodes - 1 {
            return Err(GraphError::InsufficientChannels {
                nodes: self.num_nodes,
                channels: self.num_channels,
            });
        }
        let (min, max) = (*self.capacity_range.start(), *self.capacity_range.end());
        if min > max {
            return Err(GraphError::InvalidCapacityRange { min, max });
        }
        Ok(())
    }

    /// Generate a graph using randomness from `rng` only
    #[tracing::instrument(skip_all, fields(nodes = self.num_nodes, channels = self.num_channels))]
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Graph, GraphError> {
        self.validate()?;

        let n = self.num_nodes;
        let max_edges = n * (n - 1) / 2;
        let target = self.num_channels.min(max_edges);
        let m = (target / n).clamp(1, n - 1);

        let mut edges: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
        // every node appears once per incident edge, so a uniform pick is degree-weighted
        let mut endpoints: Vec<NodeId> = Vec::with_capacity(target * 2);

        // seed: star on nodes 0..=m
        for leaf in 1..=m {
            edges.insert((0, leaf));
            endpoints.extend([0, leaf]);
        }

        for node in (m + 1)..n {
            let mut targets = BTreeSet::new();
            while targets.len() < m {
                targets.insert(endpoints[rng.gen_range(0..endpoints.len())]);
            }
            for t in targets {
                edges.insert((t, node));
                endpoints.extend([t, node]);
            }
        }
        debug!(
            attach_per_node = m,
            edges = edges.len(),
            "preferential attachment pass complete"
        );

        let mut attempts = (target - edges.len().min(target)) * ATTEMPTS_PER_EDGE;
        while edges.len() < target && attempts > 0 {
            attempts -= 1;
            let u = rng.gen_range(0..n);
            let v = endpoints[rng.gen_range(0..endpoints.len())];
            if u == v {
                continue;
            }
            if edges.insert((u.min(v), u.max(v))) {
                endpoints.extend([u, v]);
            }
        }

        let mut graph = Graph::empty(n);
        for (a, b) in edges {
            let capacity = rng.gen_range(self.capacity_range.clone());
            let fee = BASE_FEE * rng.gen_range(FEE_MULTIPLIER);
            graph.insert_channel(a, b, capacity, fee)?;
        }

        info!(
            nodes = graph.node_count(),
            channels = graph.channel_count(),
            requested_channels = self.num_channels,
            "generated payment network"
        );
        Ok(graph)
    }
}

/// Convenience wrapper around [`GraphGenerator::generate`]
pub fn generate<R: Rng + ?Sized>(
    num_nodes: usize,
    num_channels: usize,
    capacity_range: RangeInclusive<u64>,
    rng: &mut R,
) -> Result<Graph, GraphError> {
    GraphGenerator::new(num_nodes, num_channels, capacity_range).generate(rng)
}
