// Optimization report and solution decoding
// This file turns a raw binary assignment into selected routes, per-channel
// usage and feasibility flags, and aggregate routing statistics
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::OptimizeError;
use crate::graph::{ChannelId, Graph, NodeId};
use crate::metrics::INFEASIBLE_OUTCOMES;
use crate::qubo::{EnergyBreakdown, Hamiltonian, VariableInfo};
use crate::router::{Candidates, RouteInfo, Transaction, TransactionId};

/// Decoded state of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Exactly one candidate selected
    Routed,
    /// Candidates existed but none was selected
    NoSelection,
    /// More than one candidate selected
    Conflicting,
    /// No candidate route exists
    Unroutable,
}

impl RouteStatus {
    pub fn is_feasible(self) -> bool {
        self == RouteStatus::Routed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Routed => "routed",
            RouteStatus::NoSelection => "no_selection",
            RouteStatus::Conflicting => "conflicting",
            RouteStatus::Unroutable => "unroutable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedRoute {
    pub candidate_index: usize,
    pub nodes: Vec<NodeId>,
    pub channels: Vec<ChannelId>,
    pub hop_count: usize,
    pub fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionOutcome {
    pub transaction_id: TransactionId,
    pub amount: u64,
    pub status: RouteStatus,
    pub selected: Option<SelectedRoute>,
}

impl TransactionOutcome {
    pub fn is_feasible(&self) -> bool {
        self.status.is_feasible()
    }
}

/// Flow carried by a channel under the decoded routes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelUsage {
    pub channel_id: ChannelId,
    pub endpoints: (NodeId, NodeId),
    pub capacity: u64,
    pub usage: u64,
    pub feasible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportStats {
    pub num_transactions: usize,
    pub routed: usize,
    pub unroutable: usize,
    /// Transactions with no or conflicting selection
    pub infeasible: usize,
    pub overloaded_channels: usize,
    pub total_hops: usize,
    pub avg_hops: f64,
    pub total_fee: f64,
    pub avg_fee: f64,
}

/// Outcome of decoding an assignment, independent of how it was produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub outcomes: Vec<TransactionOutcome>,
    pub channels: Vec<ChannelUsage>,
    pub stats: ReportStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub solver: String,
    pub assignment: Vec<bool>,
    pub outcomes: Vec<TransactionOutcome>,
    pub channels: Vec<ChannelUsage>,
    /// Objective reported by the solver
    pub objective: f64,
    pub energy: EnergyBreakdown,
    pub stats: ReportStats,
    pub elapsed: Duration,
    pub variable_info: VariableInfo,
}

impl OptimizationReport {
    /// Every transaction routed and every channel within capacity
    pub fn is_feasible(&self) -> bool {
        self.outcomes.iter().all(TransactionOutcome::is_feasible)
            && self.channels.iter().all(|c| c.feasible)
    }

    pub fn outcome(&self, tx: TransactionId) -> Option<&TransactionOutcome> {
        self.outcomes.iter().find(|o| o.transaction_id == tx)
    }

    pub fn channel_usage(&self, channel: ChannelId) -> Option<&ChannelUsage> {
        self.channels.iter().find(|c| c.channel_id == channel)
    }
}

/// Decode `assignment` against the variable layout of `hamiltonian`.
///
/// Infeasible transactions and overloaded channels are flagged, never repaired.
pub fn decode(
    hamiltonian: &Hamiltonian,
    graph: &Graph,
    transactions: &[Transaction],
    candidates: &Candidates,
    assignment: &[bool],
) -> Result<Decoded, OptimizeError> {
    let expected = hamiltonian.index.len();
    if assignment.len() != expected {
        return Err(OptimizeError::AssignmentLength {
            expected,
            got: assignment.len(),
        });
    }

    let mut outcomes = Vec::with_capacity(transactions.len());
    let mut loads: BTreeMap<ChannelId, u64> = BTreeMap::new();
    let mut stats = ReportStats {
        num_transactions: transactions.len(),
        ..ReportStats::default()
    };

    for tx in transactions {
        let vars = hamiltonian.index.variables_for(tx.id);
        let chosen: Vec<usize> = vars
            .clone()
            .filter(|&v| assignment[v])
            .map(|v| v - vars.start)
            .collect();

        let (status, selected) = if vars.is_empty() {
            (RouteStatus::Unroutable, None)
        } else {
            match chosen.as_slice() {
                [] => (RouteStatus::NoSelection, None),
                [j] => {
                    let route = candidates
                        .get(&tx.id)
                        .and_then(|routes| routes.get(*j))
                        .ok_or(OptimizeError::UnknownTransaction(tx.id))?;
                    let info = RouteInfo::for_route(graph, route);
                    (
                        RouteStatus::Routed,
                        Some(SelectedRoute {
                            candidate_index: *j,
                            nodes: route.nodes().to_vec(),
                            channels: route.channels().to_vec(),
                            hop_count: info.num_hops,
                            fee: info.total_fee,
                        }),
                    )
                }
                _ => (RouteStatus::Conflicting, None),
            }
        };

        match status {
            RouteStatus::Routed => stats.routed += 1,
            RouteStatus::Unroutable => stats.unroutable += 1,
            RouteStatus::NoSelection | RouteStatus::Conflicting => {
                stats.infeasible += 1;
                INFEASIBLE_OUTCOMES.with_label_values(&["transaction"]).inc();
                warn!(tx = tx.id, status = status.as_str(), selected = chosen.len(), "infeasible transaction");
            }
        }

        if let Some(route) = &selected {
            stats.total_hops += route.hop_count;
            stats.total_fee += route.fee;
            for &channel in &route.channels {
                *loads.entry(channel).or_default() += tx.amount;
            }
        }

        outcomes.push(TransactionOutcome {
            transaction_id: tx.id,
            amount: tx.amount,
            status,
            selected,
        });
    }

    let mut channels = Vec::with_capacity(loads.len());
    for (channel_id, usage) in loads {
        let Some(channel) = graph.channel(channel_id) else {
            continue;
        };
        let feasible = usage <= channel.capacity;
        if !feasible {
            stats.overloaded_channels += 1;
            INFEASIBLE_OUTCOMES.with_label_values(&["channel"]).inc();
            warn!(channel = channel_id, usage, capacity = channel.capacity, "channel over capacity");
        }
        channels.push(ChannelUsage {
            channel_id,
            endpoints: channel.endpoints(),
            capacity: channel.capacity,
            usage,
            feasible,
        });
    }

    if stats.routed > 0 {
        stats.avg_hops = stats.total_hops as f64 / stats.routed as f64;
        stats.avg_fee = stats.total_fee / stats.routed as f64;
    }
    debug!(
        routed = stats.routed,
        infeasible = stats.infeasible,
        unroutable = stats.unroutable,
        loaded_channels = channels.len(),
        "assignment decoded"
    );

    Ok(Decoded {
        outcomes,
        channels,
        stats,
    })
}
