// Remote annealing service client
// This file submits QUBO models to an HTTP/JSON annealing backend and maps
// transport, authentication and timeout failures onto solver errors
//
// Numan Thabit 2025 Nov

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::{QuboSolver, SolverOutput};
use crate::errors::SolverError;
use crate::metrics::REQ_LATENCY;
use crate::qubo::{QuboModel, Variable};

/// Extra time granted to the HTTP round trip on top of the solve budget
const TRANSPORT_SLACK: Duration = Duration::from_secs(10);

/// Upper bound on a single request so the client deadline stays representable
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize)]
struct SolveRequest<'a> {
    num_variables: usize,
    time_limit_ms: u64,
    terms: Vec<TermPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TermPayload {
    i: Variable,
    j: Variable,
    coefficient: f64,
}

#[derive(Debug, Deserialize)]
struct SolveResponse {
    assignment: Vec<u8>,
    objective: f64,
}

/// Client for a vendor-hosted annealer
#[derive(Debug, Clone)]
pub struct HttpAnnealer {
    http: Client,
    endpoint: Url,
    token: Option<String>,
    label: Option<String>,
}

impl HttpAnnealer {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            token: None,
            label: None,
        }
    }

    /// Bearer token sent with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Free-form job label forwarded to the service
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn payload<'a>(&'a self, model: &QuboModel, time_limit: Duration) -> SolveRequest<'a> {
        SolveRequest {
            num_variables: model.num_variables(),
            time_limit_ms: u64::try_from(time_limit.as_millis()).unwrap_or(u64::MAX),
            terms: model
                .iter()
                .map(|(i, j, coefficient)| TermPayload { i, j, coefficient })
                .collect(),
            label: self.label.as_deref(),
        }
    }
}

fn request_timeout(time_limit: Duration) -> Duration {
    time_limit.saturating_add(TRANSPORT_SLACK).min(MAX_REQUEST_TIMEOUT)
}

fn map_send_error(err: reqwest::Error) -> SolverError {
    if err.is_timeout() {
        SolverError::Timeout(format!("annealer request: {err}"))
    } else {
        SolverError::Transport(format!("annealer send: {err}"))
    }
}

impl QuboSolver for HttpAnnealer {
    fn name(&self) -> &str {
        "http_annealer"
    }

    #[tracing::instrument(skip_all, fields(endpoint = %self.endpoint, variables = model.num_variables()))]
    fn solve(&self, model: &QuboModel, time_limit: Duration) -> Result<SolverOutput, SolverError> {
        let started = Instant::now();
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .timeout(request_timeout(time_limit))
            .json(&self.payload(model, time_limit));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().map_err(map_send_error)?;
        REQ_LATENCY
            .with_label_values(&["annealer", "solve"])
            .observe(started.elapsed().as_secs_f64());

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SolverError::Authentication(format!("http {}", resp.status())));
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                return Err(SolverError::Timeout(format!("http {}", resp.status())));
            }
            status if !status.is_success() => {
                return Err(SolverError::Transport(format!("http {status}")));
            }
            _ => {}
        }

        let body: SolveResponse = resp
            .json()
            .map_err(|e| SolverError::InvalidResponse(format!("json parse: {e}")))?;
        if let Some(bad) = body.assignment.iter().find(|v| **v > 1) {
            return Err(SolverError::InvalidResponse(format!(
                "non-binary value {bad} in assignment"
            )));
        }

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "annealer responded");
        info!(objective = body.objective, "remote annealing finished");
        Ok(SolverOutput {
            assignment: body.assignment.into_iter().map(|v| v == 1).collect(),
            objective: body.objective,
        })
    }
}
