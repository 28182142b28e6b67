//! The research endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use qr_agents::{AgentResponse, Depth, ResearchQuery, NO_QUERY_MESSAGE};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Body of `POST /ask`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// Any JSON value; only a recognised depth name selects a tier.
    #[serde(default)]
    pub depth: Option<Value>,
}

impl AskRequest {
    /// Validate into a query, applying `default_depth` for absent or
    /// unknown depth names.
    pub fn into_query(self, default_depth: Depth) -> Result<ResearchQuery> {
        let depth = self
            .depth
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|d| d.parse::<Depth>().ok())
            .unwrap_or(default_depth);
        let text = self.query.unwrap_or_default();
        ResearchQuery::new(text, depth)
            .map_err(|_| ServerError::BadRequest(NO_QUERY_MESSAGE.to_string()))
    }
}

/// `POST /ask`: run the research pipeline for one query.
pub async fn ask_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AgentResponse>> {
    let Json(request) =
        payload.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
    let query = request.into_query(state.default_depth)?;

    info!(depth = %query.depth(), "Research request received");
    let outcome = state.researcher.research(&query).await?;
    info!(stage = outcome.stage.as_str(), "Research request complete");

    Ok(Json(AgentResponse::success(outcome.record)))
}
