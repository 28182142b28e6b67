//! The research pipeline: prompt, bounded agent run, normalization.

use std::sync::Arc;

use tracing::{info, warn};

use qr_core::{Agent, AgentConfig, Error, Message, Provider, ToolRegistry, DEFAULT_MAX_ITERATIONS};

use crate::normalize::{normalize_outcome, Normalized};
use crate::prompt::build_system_prompt;
use crate::record::{AgentResponse, ResearchQuery};

/// Per-run knobs for the research agent.
#[derive(Debug, Clone)]
pub struct ResearchSettings {
    pub max_iterations: usize,
    /// Model override; the provider default is used when `None`.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Answers research queries with a tool-using agent.
///
/// Holds no per-request state, so one instance can serve concurrent
/// requests behind an `Arc`.
pub struct Researcher {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    settings: ResearchSettings,
}

impl Researcher {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        settings: ResearchSettings,
    ) -> Self {
        Self {
            provider,
            tools: Arc::new(tools),
            settings,
        }
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    fn agent_config(&self, query: &ResearchQuery) -> AgentConfig {
        let mut config = AgentConfig::new("researcher")
            .with_system_prompt(build_system_prompt(query.depth()))
            .with_max_iterations(self.settings.max_iterations);
        if let Some(model) = &self.settings.model {
            config = config.with_model(model.as_str());
        }
        if let Some(temperature) = self.settings.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }

    /// Run the agent and normalize its output. Only provider failures are
    /// returned as errors.
    pub async fn research(&self, query: &ResearchQuery) -> Result<Normalized, Error> {
        info!(depth = %query.depth(), query_len = query.text().len(), "Research starting");

        let raw = Agent::run_once(
            Arc::clone(&self.provider),
            Arc::clone(&self.tools),
            self.agent_config(query),
            vec![Message::user(query.text())],
        )
        .await?;

        let outcome = normalize_outcome(&raw, query.text());
        if outcome.is_degraded() {
            warn!(
                stage = outcome.stage.as_str(),
                raw_len = raw.len(),
                "Agent output did not match the record schema; salvaged"
            );
        } else {
            info!(topic = %outcome.record.topic, "Research complete");
        }
        Ok(outcome)
    }

    /// Like [`research`](Self::research), folding failures into the
    /// response envelope.
    pub async fn answer(&self, query: &ResearchQuery) -> AgentResponse {
        match self.research(query).await {
            Ok(outcome) => AgentResponse::success(outcome.record),
            Err(err) => {
                warn!(error = %err, "Research failed");
                AgentResponse::from_error(&err)
            }
        }
    }
}
