//! Research request and result types.

use serde::{Deserialize, Serialize};

use qr_core::Error;

use crate::depth::Depth;

/// Message returned when a request carries no usable query.
pub const NO_QUERY_MESSAGE: &str = "No query provided";

/// Placeholder `raw_response` for pipeline failures.
pub const SERVER_ERROR_RAW_RESPONSE: &str = "Server error occurred";

/// A validated research question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchQuery {
    text: String,
    depth: Depth,
}

impl ResearchQuery {
    /// Build a query; blank text is rejected.
    pub fn new(text: impl Into<String>, depth: Depth) -> Result<Self, Error> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_request(NO_QUERY_MESSAGE));
        }
        Ok(Self {
            text: trimmed.to_string(),
            depth,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }
}

/// The structured result of a research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub topic: String,
    pub summary: String,
    pub sources: Vec<String>,
    pub tools_used: Vec<String>,
    /// Cross-source agreement, 0.0 to 1.0.
    pub confidence_score: f64,
}

impl ResearchRecord {
    /// True when text fields are non-blank and the score is a finite value in [0, 1].
    pub fn is_well_formed(&self) -> bool {
        !self.topic.trim().is_empty()
            && !self.summary.trim().is_empty()
            && self.confidence_score.is_finite()
            && (0.0..=1.0).contains(&self.confidence_score)
    }
}

/// The envelope returned to callers: exactly one of `result` or
/// `error` + `raw_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Success {
        result: ResearchRecord,
    },
    Failure {
        error: String,
        raw_response: String,
    },
}

impl AgentResponse {
    pub fn success(result: ResearchRecord) -> Self {
        AgentResponse::Success { result }
    }

    pub fn failure(error: impl Into<String>, raw_response: impl Into<String>) -> Self {
        AgentResponse::Failure {
            error: error.into(),
            raw_response: raw_response.into(),
        }
    }

    /// Map a pipeline error to the failure envelope. A retired model gets a
    /// message telling the operator what to change.
    pub fn from_error(err: &Error) -> Self {
        let message = match err {
            Error::ModelDecommissioned { model, message } => format!(
                "The configured model '{}' has been decommissioned by the provider. \
                 Set `llm.model` (or QR_LLM__MODEL) to a supported model and restart. \
                 Provider said: {}",
                model, message
            ),
            other => other.to_string(),
        };
        AgentResponse::failure(message, SERVER_ERROR_RAW_RESPONSE)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AgentResponse::Success { .. })
    }
}
