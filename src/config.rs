// Configuration management module
// This file handles loading and parsing of configuration settings
// from environment variables
//
// Numan Thabit 2025 Nov

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::time::Duration;
use url::Url;

use crate::optimizer::OptimizeConfig;
use crate::qubo::DEFAULT_ALPHA;
use crate::solver::AnnealSchedule;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seed for graph generation, transaction sampling and route search
    pub seed: u64,
    pub graph: GraphConfig,
    pub transactions: TransactionConfig,
    pub routing: RoutingConfig,
    pub optimizer: OptimizerConfig,
    pub solver: SolverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            graph: GraphConfig::default(),
            transactions: TransactionConfig::default(),
            routing: RoutingConfig::default(),
            optimizer: OptimizerConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub num_nodes: usize,
    pub num_channels: usize,
    pub capacity_min: u64,
    pub capacity_max: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            num_nodes: 100,
            num_channels: 500,
            capacity_min: 200,
            capacity_max: 900,
        }
    }
}

impl GraphConfig {
    pub fn capacity_range(&self) -> RangeInclusive<u64> {
        self.capacity_min..=self.capacity_max
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub count: usize,
    pub amount_min: u64,
    pub amount_max: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            count: 4,
            amount_min: 200,
            amount_max: 600,
        }
    }
}

impl TransactionConfig {
    pub fn amount_range(&self) -> RangeInclusive<u64> {
        self.amount_min..=self.amount_max
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Candidate routes searched per transaction
    pub candidates: usize,
    pub edge_penalty: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            candidates: 3,
            edge_penalty: crate::router::finder::DEFAULT_EDGE_PENALTY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub alpha: f64,
    /// Unset derives beta from the mean transaction amount
    pub beta: Option<f64>,
    pub time_limit_seconds: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            beta: None,
            time_limit_seconds: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// One of `anneal`, `exhaustive`, `http`
    pub backend: String,
    /// Remote annealing endpoint, required for the `http` backend
    pub endpoint: Option<Url>,
    /// Bearer token for the remote endpoint
    pub token: Option<String>,
    /// Retries on transient remote failures
    pub retries: u32,
    pub sweeps: usize,
    pub restarts: usize,
    /// Annealer seed; defaults to the top-level seed
    pub seed: Option<u64>,
    pub max_variables: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        let schedule = AnnealSchedule::default();
        Self {
            backend: "anneal".to_string(),
            endpoint: None,
            token: None,
            retries: 3,
            sweeps: schedule.sweeps,
            restarts: schedule.restarts,
            seed: None,
            max_variables: 20,
        }
    }
}

/// Validated solver selection
#[derive(Debug, Clone, PartialEq)]
pub enum SolverBackend {
    Anneal {
        schedule: AnnealSchedule,
        seed: u64,
    },
    Exhaustive {
        max_variables: usize,
    },
    Http {
        endpoint: Url,
        token: Option<String>,
        retries: u32,
    },
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("ROUTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn optimize_config(&self) -> Result<OptimizeConfig> {
        let time_limit = Duration::try_from_secs_f64(self.optimizer.time_limit_seconds)
            .with_context(|| {
                format!(
                    "invalid optimizer time limit: {}",
                    self.optimizer.time_limit_seconds
                )
            })?;
        Ok(OptimizeConfig {
            alpha: self.optimizer.alpha,
            beta: self.optimizer.beta,
            time_limit,
        })
    }

    pub fn solver_backend(&self) -> Result<SolverBackend> {
        let solver = &self.solver;
        match solver.backend.to_ascii_lowercase().as_str() {
            "anneal" | "sa" => Ok(SolverBackend::Anneal {
                schedule: AnnealSchedule {
                    sweeps: solver.sweeps,
                    restarts: solver.restarts,
                    ..AnnealSchedule::default()
                },
                seed: solver.seed.unwrap_or(self.seed),
            }),
            "exhaustive" => Ok(SolverBackend::Exhaustive {
                max_variables: solver.max_variables,
            }),
            "http" => {
                let endpoint = solver.endpoint.clone().with_context(|| {
                    "ROUTER__SOLVER__ENDPOINT is required for the http backend"
                })?;
                Ok(SolverBackend::Http {
                    endpoint,
                    token: solver.token.clone(),
                    retries: solver.retries,
                })
            }
            other => bail!("unsupported solver backend: {other}"),
        }
    }
}
