use serde::{Deserialize, Serialize};

/// Body of `POST /lyra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timestamp: String,
    /// Simulation time, rounded to 2 decimals.
    pub t: f64,
    pub memory_traces: usize,
    pub alert: bool,
}

/// Body of `POST /reset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
    pub timestamp: String,
}

impl ResetResponse {
    pub fn done() -> Self {
        Self {
            status: "reset".to_string(),
            timestamp: now(),
        }
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
