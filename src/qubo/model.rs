// Sparse symmetric QUBO model
// This file implements the coefficient accumulator shared by every cost
// term and the energy evaluation used to score binary assignments
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;

pub type Variable = usize;

/// Quadratic unconstrained binary model.
///
/// Entries are stored once per unordered pair under `(min, max)`; `(v, v)`
/// holds the linear coefficient of `v`. Cost of an assignment `x` is the sum
/// of `coefficient(u, v) * x[u] * x[v]` over stored entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuboModel {
    num_variables: usize,
    terms: BTreeMap<(Variable, Variable), f64>,
}

fn pair(u: Variable, v: Variable) -> (Variable, Variable) {
    if u <= v {
        (u, v)
    } else {
        (v, u)
    }
}

impl QuboModel {
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            terms: BTreeMap::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Number of stored (non-merged) entries
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Accumulate `coefficient` onto the unordered pair `{u, v}`.
    /// Grows the variable count to cover both indices.
    pub fn add(&mut self, u: Variable, v: Variable, coefficient: f64) {
        if coefficient == 0.0 {
            return;
        }
        self.num_variables = self.num_variables.max(u.max(v) + 1);
        *self.terms.entry(pair(u, v)).or_insert(0.0) += coefficient;
    }

    pub fn add_linear(&mut self, v: Variable, coefficient: f64) {
        self.add(v, v, coefficient);
    }

    pub fn coefficient(&self, u: Variable, v: Variable) -> f64 {
        self.terms.get(&pair(u, v)).copied().unwrap_or(0.0)
    }

    pub fn linear(&self, v: Variable) -> f64 {
        self.coefficient(v, v)
    }

    /// Stored entries as `(u, v, coefficient)` with `u <= v`
    pub fn iter(&self) -> impl Iterator<Item = (Variable, Variable, f64)> + '_ {
        self.terms.iter().map(|(&(u, v), &c)| (u, v, c))
    }

    /// Cost of a binary assignment; missing positions count as 0
    pub fn energy(&self, assignment: &[bool]) -> f64 {
        let on = |v: Variable| assignment.get(v).copied().unwrap_or(false);
        self.iter()
            .filter(|&(u, v, _)| on(u) && on(v))
            .map(|(_, _, c)| c)
            .sum()
    }

    /// Per-variable neighbour lists for local search: `(other, coefficient)`
    /// excluding the diagonal, plus the linear coefficients
    pub fn adjacency(&self) -> (Vec<f64>, Vec<Vec<(Variable, f64)>>) {
        let mut linear = vec![0.0; self.num_variables];
        let mut neighbors = vec![Vec::new(); self.num_variables];
        for (u, v, c) in self.iter() {
            if u == v {
                linear[u] += c;
            } else {
                neighbors[u].push((v, c));
                neighbors[v].push((u, c));
            }
        }
        (linear, neighbors)
    }
}

impl AddAssign<&QuboModel> for QuboModel {
    fn add_assign(&mut self, other: &QuboModel) {
        self.num_variables = self.num_variables.max(other.num_variables);
        for (u, v, c) in other.iter() {
            self.add(u, v, c);
        }
    }
}
