// Hamiltonian construction for route selection
// This file binds (transaction, candidate) pairs to binary variables and
// builds the capacity, route-constraint and distance cost terms
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use tracing::{debug, info, warn};

use super::model::{QuboModel, Variable};
use crate::graph::{ChannelId, Graph};
use crate::router::{CandidateRoute, Candidates, Transaction, TransactionId};

/// Default weight of the one-route-per-transaction penalty
pub const DEFAULT_ALPHA: f64 = 2.0;
/// Default distance weight is the squared mean amount times this factor
pub const BETA_AMOUNT_SCALE: f64 = 100.0;

/// Weights of the route-constraint (alpha) and distance (beta) terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PenaltyWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl PenaltyWeights {
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// `alpha` as given; `beta` as given or `(mean amount)^2 * 100`, which keeps
    /// the distance term on the same scale as the amount-squared capacity term
    pub fn for_transactions(transactions: &[Transaction], alpha: f64, beta: Option<f64>) -> Self {
        Self {
            alpha,
            beta: beta.unwrap_or_else(|| Self::default_beta(transactions)),
        }
    }

    pub fn default_beta(transactions: &[Transaction]) -> f64 {
        if transactions.is_empty() {
            return 0.0;
        }
        let mean = transactions.iter().map(|t| t.amount as f64).sum::<f64>()
            / transactions.len() as f64;
        mean * mean * BETA_AMOUNT_SCALE
    }
}

/// Mapping between decision variables and (transaction, candidate) pairs.
/// Variables of one transaction are contiguous, transactions in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableIndex {
    pairs: Vec<(TransactionId, usize)>,
    ranges: BTreeMap<TransactionId, Range<Variable>>,
}

impl VariableIndex {
    fn build(transactions: &[Transaction], candidates: &Candidates) -> Self {
        let mut index = Self::default();
        for tx in transactions {
            let count = candidates.get(&tx.id).map(Vec::len).unwrap_or(0);
            if count == 0 || index.ranges.contains_key(&tx.id) {
                continue;
            }
            let start = index.pairs.len();
            index.pairs.extend((0..count).map(|j| (tx.id, j)));
            index.ranges.insert(tx.id, start..start + count);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn variable(&self, tx: TransactionId, candidate: usize) -> Option<Variable> {
        self.ranges
            .get(&tx)
            .filter(|r| candidate < r.len())
            .map(|r| r.start + candidate)
    }

    pub fn pair(&self, variable: Variable) -> Option<(TransactionId, usize)> {
        self.pairs.get(variable).copied()
    }

    /// Variables of `tx`; empty when the transaction has no candidates
    pub fn variables_for(&self, tx: TransactionId) -> Range<Variable> {
        self.ranges.get(&tx).cloned().unwrap_or(0..0)
    }

    pub fn contains_transaction(&self, tx: TransactionId) -> bool {
        self.ranges.contains_key(&tx)
    }
}

/// Size summary of the encoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    pub num_transactions: usize,
    /// Largest candidate count of any transaction
    pub num_route_candidates: usize,
    /// Dense `transactions x candidates` size
    pub total_variables: usize,
    /// Variables actually allocated
    pub used_variables: usize,
    pub alpha: f64,
    pub beta: f64,
}

/// Each cost term as its own model
#[derive(Debug, Clone, PartialEq)]
pub struct HamiltonianTerms {
    pub capacity: QuboModel,
    pub route: QuboModel,
    pub distance: QuboModel,
}

/// Energy of an assignment split by term
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyBreakdown {
    pub capacity: f64,
    pub route: f64,
    pub distance: f64,
    pub total: f64,
}

/// Built cost function plus what is needed to decode a solution
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    pub model: QuboModel,
    pub terms: HamiltonianTerms,
    pub index: VariableIndex,
    pub weights: PenaltyWeights,
    pub info: VariableInfo,
}

impl Hamiltonian {
    pub fn breakdown(&self, assignment: &[bool]) -> EnergyBreakdown {
        EnergyBreakdown {
            capacity: self.terms.capacity.energy(assignment),
            route: self.terms.route.energy(assignment),
            distance: self.terms.distance.energy(assignment),
            total: self.model.energy(assignment),
        }
    }
}

/// Builds the combined QUBO for a set of transactions and their candidates
pub struct HamiltonianBuilder<'a> {
    graph: &'a Graph,
    weights: PenaltyWeights,
    index: VariableIndex,
    num_transactions: usize,
    entries: Vec<(Variable, &'a Transaction, &'a CandidateRoute)>,
}

impl<'a> HamiltonianBuilder<'a> {
    /// Transactions without candidates get no variables; candidate lists for
    /// ids absent from `transactions` are ignored
    pub fn new(
        graph: &'a Graph,
        transactions: &'a [Transaction],
        candidates: &'a Candidates,
        weights: PenaltyWeights,
    ) -> Self {
        let index = VariableIndex::build(transactions, candidates);
        let mut entries = Vec::with_capacity(index.len());
        let mut seen = HashSet::new();
        for tx in transactions {
            let range = index.variables_for(tx.id);
            if range.is_empty() || !seen.insert(tx.id) {
                continue;
            }
            for (var, route) in range.zip(&candidates[&tx.id]) {
                entries.push((var, tx, route));
            }
        }

        Self {
            graph,
            weights,
            index,
            num_transactions: transactions.len(),
            entries,
        }
    }

    pub fn index(&self) -> &VariableIndex {
        &self.index
    }

    /// Sum over channels of `(load - capacity)^2`, constant dropped
    pub fn capacity_term(&self) -> QuboModel {
        let mut model = QuboModel::new(self.index.len());
        let mut contributors: BTreeMap<ChannelId, Vec<(Variable, f64)>> = BTreeMap::new();
        for &(var, tx, route) in &self.entries {
            for &channel in route.channels() {
                contributors
                    .entry(channel)
                    .or_default()
                    .push((var, tx.amount as f64));
            }
        }

        for (channel, loads) in &contributors {
            let Some(capacity) = self.graph.channel(*channel).map(|c| c.capacity as f64) else {
                warn!(channel, "candidate references a channel outside the graph");
                continue;
            };
            for (i, &(u, a)) in loads.iter().enumerate() {
                model.add_linear(u, a * a - 2.0 * capacity * a);
                for &(v, b) in &loads[i + 1..] {
                    model.add(u, v, 2.0 * a * b);
                }
            }
        }
        debug!(channels = contributors.len(), entries = model.len(), "capacity term built");
        model
    }

    /// `alpha * (sum_j x_ij - 1)^2` per transaction, constant dropped
    pub fn route_constraint_term(&self) -> QuboModel {
        let alpha = self.weights.alpha;
        let mut model = QuboModel::new(self.index.len());
        for range in self.index.ranges.values() {
            for u in range.clone() {
                model.add_linear(u, -alpha);
                for v in (u + 1)..range.end {
                    model.add(u, v, 2.0 * alpha);
                }
            }
        }
        model
    }

    /// `beta * hop_count` per variable
    pub fn distance_term(&self) -> QuboModel {
        let mut model = QuboModel::new(self.index.len());
        for &(var, _, route) in &self.entries {
            model.add_linear(var, self.weights.beta * route.hop_count() as f64);
        }
        model
    }

    pub fn variable_info(&self) -> VariableInfo {
        let max_candidates = self
            .index
            .ranges
            .values()
            .map(|r| r.len())
            .max()
            .unwrap_or(0);
        VariableInfo {
            num_transactions: self.num_transactions,
            num_route_candidates: max_candidates,
            total_variables: self.num_transactions * max_candidates,
            used_variables: self.index.len(),
            alpha: self.weights.alpha,
            beta: self.weights.beta,
        }
    }

    #[tracing::instrument(skip_all, fields(variables = self.index.len()))]
    pub fn build(self) -> Hamiltonian {
        let terms = HamiltonianTerms {
            capacity: self.capacity_term(),
            route: self.route_constraint_term(),
            distance: self.distance_term(),
        };
        let mut model = QuboModel::new(self.index.len());
        model += &terms.capacity;
        model += &terms.route;
        model += &terms.distance;

        let info = self.variable_info();
        info!(
            variables = info.used_variables,
            entries = model.len(),
            alpha = self.weights.alpha,
            beta = self.weights.beta,
            "hamiltonian built"
        );

        Hamiltonian {
            model,
            terms,
            index: self.index,
            weights: self.weights,
            info,
        }
    }
}
