// QUBO module - sparse symmetric model and Hamiltonian construction
//
// Numan Thabit 2025 Nov

pub mod hamiltonian;
pub mod model;

pub use hamiltonian::{
    EnergyBreakdown, Hamiltonian, HamiltonianBuilder, HamiltonianTerms, PenaltyWeights,
    VariableIndex, VariableInfo, DEFAULT_ALPHA,
};
pub use model::{QuboModel, Variable};
