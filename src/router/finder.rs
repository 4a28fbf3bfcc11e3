// Candidate route discovery
// This file samples payment transactions and finds diverse candidate paths
// for each one with a penalized shortest-path search
//
// Numan Thabit 2025 Nov

use rand::Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

use crate::errors::RouteError;
use crate::graph::{ChannelId, Graph, NodeId};
use crate::router::routes::{CandidateRoute, Candidates, RouteInfo, Transaction};

/// Weight added to every channel of a discovered path before the next search
pub const DEFAULT_EDGE_PENALTY: f64 = 1.0;
/// Searches allowed per requested candidate
const ATTEMPTS_PER_CANDIDATE: usize = 4;

/// Finds transactions and their candidate routes over a fixed graph
pub struct RouteFinder<'g> {
    graph: &'g Graph,
    edge_penalty: f64,
}

impl<'g> RouteFinder<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            edge_penalty: DEFAULT_EDGE_PENALTY,
        }
    }

    /// Override the per-discovery edge penalty; it must be finite and positive
    /// so every discovery makes the found path strictly more expensive
    pub fn with_edge_penalty(mut self, penalty: f64) -> Result<Self, RouteError> {
        if !penalty.is_finite() || penalty <= 0.0 {
            return Err(RouteError::InvalidEdgePenalty(penalty));
        }
        self.edge_penalty = penalty;
        Ok(self)
    }

    /// Sample `count` transactions with distinct endpoints and uniform amounts
    pub fn generate_transactions<R: Rng + ?Sized>(
        &self,
        count: usize,
        amount_range: RangeInclusive<u64>,
        rng: &mut R,
    ) -> Result<Vec<Transaction>, RouteError> {
        let (min, max) = (*amount_range.start(), *amount_range.end());
        if min > max {
            return Err(RouteError::InvalidAmountRange { min, max });
        }
        let n = self.graph.node_count();
        if n < 2 {
            return Err(RouteError::TooFewNodes(n));
        }

        let transactions = (0..count)
            .map(|id| {
                let source = rng.gen_range(0..n);
                let mut destination = rng.gen_range(0..n - 1);
                if destination >= source {
                    destination += 1;
                }
                Transaction {
                    id,
                    source,
                    destination,
                    amount: rng.gen_range(amount_range.clone()),
                }
            })
            .collect::<Vec<_>>();

        debug!(count = transactions.len(), min, max, "generated transactions");
        Ok(transactions)
    }

    /// Collect up to `k` distinct candidate routes for `tx`.
    ///
    /// Channel weights start at one hop plus a jitter small enough that hop
    /// count always dominates; the jitter breaks ties between equal-length
    /// paths. Every channel on a discovered path is then penalized so the next
    /// search prefers an alternative. Returns fewer than `k` routes when no
    /// further distinct path shows up within the attempt budget, and none when
    /// the endpoints are disconnected.
    #[tracing::instrument(skip_all, fields(tx = tx.id, k = k))]
    pub fn find_routes<R: Rng + ?Sized>(
        &self,
        tx: &Transaction,
        k: usize,
        rng: &mut R,
    ) -> Vec<CandidateRoute> {
        let n = self.graph.node_count();
        if k == 0 || tx.source == tx.destination || tx.source >= n || tx.destination >= n {
            return Vec::new();
        }

        let jitter_bound = 1.0 / (2.0 * (n as f64 + 1.0));
        let mut weights: Vec<f64> = self
            .graph
            .channels()
            .iter()
            .map(|_| 1.0 + rng.gen::<f64>() * jitter_bound)
            .collect();

        let mut routes: Vec<CandidateRoute> = Vec::with_capacity(k);
        for attempt in 0..k * ATTEMPTS_PER_CANDIDATE {
            let Some((nodes, channels)) = self.shortest_path(tx.source, tx.destination, &weights)
            else {
                break;
            };
            for &ch in &channels {
                weights[ch] += self.edge_penalty;
            }

            if routes.iter().any(|r| r.nodes() == nodes.as_slice()) {
                debug!(attempt, "search returned a known route");
                continue;
            }
            routes.push(CandidateRoute::from_parts(tx.id, nodes, channels));
            if routes.len() >= k {
                break;
            }
        }

        if routes.is_empty() {
            warn!(
                tx = tx.id,
                source = tx.source,
                destination = tx.destination,
                "no route found for transaction"
            );
        } else if routes.len() < k {
            debug!(found = routes.len(), "fewer candidates than requested");
        }
        routes
    }

    /// Candidate routes for every transaction; unroutable ones map to an empty list
    pub fn find_all_routes<R: Rng + ?Sized>(
        &self,
        transactions: &[Transaction],
        k: usize,
        rng: &mut R,
    ) -> Candidates {
        let candidates: Candidates = transactions
            .iter()
            .map(|tx| (tx.id, self.find_routes(tx, k, rng)))
            .collect();

        info!(
            transactions = transactions.len(),
            candidates = candidates.values().map(Vec::len).sum::<usize>(),
            unroutable = candidates.values().filter(|r| r.is_empty()).count(),
            "candidate routes discovered"
        );
        candidates
    }

    pub fn route_info(&self, route: &CandidateRoute) -> RouteInfo {
        RouteInfo::for_route(self.graph, route)
    }

    fn shortest_path(
        &self,
        source: NodeId,
        target: NodeId,
        weights: &[f64],
    ) -> Option<(Vec<NodeId>, Vec<ChannelId>)> {
        let n = self.graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<(NodeId, ChannelId)>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[source] = 0.0;
        heap.push(Frontier {
            cost: 0.0,
            node: source,
        });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if node == target {
                break;
            }
            if cost > dist[node] {
                continue;
            }
            for &(next, ch) in self.graph.neighbors(node) {
                let candidate = cost + weights[ch];
                if candidate < dist[next] {
                    dist[next] = candidate;
                    prev[next] = Some((node, ch));
                    heap.push(Frontier {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }

        if dist[target].is_infinite() {
            return None;
        }

        let mut nodes = vec![target];
        let mut channels = Vec::new();
        let mut cursor = target;
        while let Some((from, ch)) = prev[cursor] {
            nodes.push(from);
            channels.push(ch);
            cursor = from;
        }
        nodes.reverse();
        channels.reverse();
        Some((nodes, channels))
    }
}

/// Min-heap entry for Dijkstra
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
