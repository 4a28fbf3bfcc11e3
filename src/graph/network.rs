// Payment channel network model
// This file defines channels, the immutable capacity-annotated graph and
// its summary statistics
//
// Numan Thabit 2025 Nov

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::errors::GraphError;

pub type NodeId = usize;
pub type ChannelId = usize;

/// Undirected, capacity-bounded edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub a: NodeId,
    pub b: NodeId,
    /// Maximum aggregate flow the channel may carry
    pub capacity: u64,
    /// Forwarding fee charged per hop through this channel
    pub fee: f64,
}

impl Channel {
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint at all
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Immutable payment network. Nodes are `0..node_count()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphParts", into = "GraphParts")]
pub struct Graph {
    node_count: usize,
    channels: Vec<Channel>,
    adjacency: Vec<Vec<(NodeId, ChannelId)>>,
    index: HashMap<(NodeId, NodeId), ChannelId>,
}

/// Serialized shape of a graph; adjacency is rebuilt on load
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphParts {
    node_count: usize,
    channels: Vec<Channel>,
}

impl TryFrom<GraphParts> for Graph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> Result<Self, Self::Error> {
        Graph::from_channels(
            parts.node_count,
            parts
                .channels
                .into_iter()
                .map(|c| (c.a, c.b, c.capacity, c.fee)),
        )
    }
}

impl From<Graph> for GraphParts {
    fn from(graph: Graph) -> Self {
        Self {
            node_count: graph.node_count,
            channels: graph.channels,
        }
    }
}

fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Graph {
    /// Build a graph from an explicit `(a, b, capacity, fee)` channel list.
    /// Channel ids follow list order.
    pub fn from_channels<I>(node_count: usize, channels: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (NodeId, NodeId, u64, f64)>,
    {
        let mut graph = Self::empty(node_count);
        for (a, b, capacity, fee) in channels {
            graph.insert_channel(a, b, capacity, fee)?;
        }
        Ok(graph)
    }

    pub(crate) fn empty(node_count: usize) -> Self {
        Self {
            node_count,
            channels: Vec::new(),
            adjacency: vec![Vec::new(); node_count],
            index: HashMap::new(),
        }
    }

    pub(crate) fn insert_channel(
        &mut self,
        a: NodeId,
        b: NodeId,
        capacity: u64,
        fee: f64,
    ) -> Result<ChannelId, GraphError> {
        for node in [a, b] {
            if node >= self.node_count {
                return Err(GraphError::UnknownNode {
                    node,
                    nodes: self.node_count,
                });
            }
        }
        if a == b {
            return Err(GraphError::SelfLoop(a));
        }
        if self.index.contains_key(&key(a, b)) {
            return Err(GraphError::DuplicateChannel(a, b));
        }

        let id = self.channels.len();
        self.channels.push(Channel {
            id,
            a,
            b,
            capacity,
            fee,
        });
        self.adjacency[a].push((b, id));
        self.adjacency[b].push((a, id));
        self.index.insert(key(a, b), id);
        Ok(id)
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn nodes(&self) -> std::ops::Range<NodeId> {
        0..self.node_count
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Channel joining `a` and `b` in either direction
    pub fn channel_between(&self, a: NodeId, b: NodeId) -> Option<&Channel> {
        self.index.get(&key(a, b)).map(|&id| &self.channels[id])
    }

    pub fn has_channel(&self, a: NodeId, b: NodeId) -> bool {
        self.index.contains_key(&key(a, b))
    }

    /// `(neighbor, channel)` pairs incident to `node`
    pub fn neighbors(&self, node: NodeId) -> &[(NodeId, ChannelId)] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    pub fn is_connected(&self) -> bool {
        if self.node_count == 0 {
            return true;
        }
        let mut seen = vec![false; self.node_count];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;
        let mut reached = 1;
        while let Some(node) = queue.pop_front() {
            for &(next, _) in self.neighbors(node) {
                if !seen[next] {
                    seen[next] = true;
                    reached += 1;
                    queue.push_back(next);
                }
            }
        }
        reached == self.node_count
    }

    pub fn stats(&self) -> GraphStats {
        let degrees: Vec<usize> = self.nodes().map(|n| self.degree(n)).collect();
        let capacities: Vec<u64> = self.channels.iter().map(|c| c.capacity).collect();
        let edges = self.channels.len();

        GraphStats {
            num_nodes: self.node_count,
            num_channels: edges,
            avg_degree: mean(degrees.iter().map(|&d| d as f64), degrees.len()),
            min_degree: degrees.iter().copied().min().unwrap_or(0),
            max_degree: degrees.iter().copied().max().unwrap_or(0),
            avg_capacity: mean(capacities.iter().map(|&c| c as f64), edges),
            min_capacity: capacities.iter().copied().min().unwrap_or(0),
            max_capacity: capacities.iter().copied().max().unwrap_or(0),
            avg_fee: mean(self.channels.iter().map(|c| c.fee), edges),
            is_connected: self.is_connected(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>, len: usize) -> f64 {
    if len == 0 {
        0.0
    } else {
        values.sum::<f64>() / len as f64
    }
}

/// Summary statistics for monitoring and logging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats {
    pub num_nodes: usize,
    pub num_channels: usize,
    pub avg_degree: f64,
    pub min_degree: usize,
    pub max_degree: usize,
    pub avg_capacity: f64,
    pub min_capacity: u64,
    pub max_capacity: u64,
    pub avg_fee: f64,
    pub is_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn triangle() -> Graph {
        Graph::from_channels(3, [(0, 1, 100, 0.1), (1, 2, 200, 0.2), (2, 0, 300, 0.3)])
            .expect("valid triangle")
    }

    #[test]
    fn channel_lookup_ignores_direction() {
        let graph = triangle();
        assert_eq!(graph.channel_between(1, 0).map(|c| c.id), Some(0));
        assert_eq!(graph.channel_between(0, 2).map(|c| c.capacity), Some(300));
        assert_eq!(graph.channel(1).and_then(|c| c.other(2)), Some(1));
    }

    #[rstest]
    #[case::unknown_node(vec![(0, 5, 10, 0.1)], GraphError::UnknownNode { node: 5, nodes: 3 })]
    #[case::self_loop(vec![(1, 1, 10, 0.1)], GraphError::SelfLoop(1))]
    #[case::duplicate(vec![(0, 1, 10, 0.1), (1, 0, 20, 0.1)], GraphError::DuplicateChannel(1, 0))]
    fn from_channels_rejects_bad_lists(
        #[case] channels: Vec<(NodeId, NodeId, u64, f64)>,
        #[case] expected: GraphError,
    ) {
        let err = Graph::from_channels(3, channels).unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn stats_summarize_degrees_and_capacities() {
        let stats = triangle().stats();
        assert_eq!(stats.num_nodes, 3);
        assert_eq!(stats.num_channels, 3);
        assert_eq!(stats.min_degree, 2);
        assert_eq!(stats.max_degree, 2);
        assert_eq!(stats.min_capacity, 100);
        assert_eq!(stats.max_capacity, 300);
        assert!((stats.avg_capacity - 200.0).abs() < 1e-9);
        assert!(stats.is_connected);
    }

    #[test]
    fn detects_disconnected_graph() {
        let graph = Graph::from_channels(4, [(0, 1, 10, 0.1), (2, 3, 10, 0.1)]).unwrap();
        assert!(!graph.is_connected());
    }

    #[test]
    fn serde_rebuilds_adjacency() {
        let graph = triangle();
        let json = serde_json::to_string(&graph).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.channel_between(2, 1).map(|c| c.id), Some(1));
        assert_eq!(back.degree(0), 2);
    }
}
