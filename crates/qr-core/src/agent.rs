//! Bounded tool-using agent loop.
//!
//! Each iteration makes one completion call. A response carrying tool calls
//! has every call dispatched in order and the outputs appended to the
//! context; a response without tool calls is the terminal answer.
//!
//! The loop never fails because of what the model said. Unknown tools and
//! undecodable arguments become corrective tool results, and running out of
//! iterations yields the best partial text seen so far. Only provider errors
//! propagate.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Error;
use crate::message::{Message, ToolCall, Usage};
use crate::provider::{CompletionRequest, FinishReason, Provider};
use crate::tool::ToolRegistry;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Configuration for an agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name, used in logs.
    pub name: String,
    /// System prompt for the agent.
    pub system_prompt: Option<String>,
    /// Maximum agentic loop iterations (completion calls).
    pub max_iterations: usize,
    /// Model override; the provider default is used when `None`.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Completion token cap per call.
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    /// Create a new agent configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the maximum iterations. Zero is bumped to one.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A stateless LLM agent.
pub struct Agent;

impl Agent {
    /// Run a one-shot task with the given context.
    ///
    /// Returns the terminal answer, or the best partial text if the
    /// iteration budget runs out. The returned text is never empty.
    pub async fn run_once(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        context: Vec<Message>,
    ) -> Result<String, Error> {
        debug!(
            agent = %config.name,
            context_messages = context.len(),
            tools_available = tools.len(),
            max_iterations = config.max_iterations,
            "Agent run_once starting"
        );

        let mut messages = Vec::with_capacity(context.len() + 1);
        if let Some(system) = &config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        messages.extend(context);

        let definitions = tools.definitions();
        let mut partial = PartialAnswer::default();
        let mut usage = Usage::default();

        for iteration in 0..config.max_iterations {
            debug!(
                agent = %config.name,
                iteration = iteration + 1,
                message_count = messages.len(),
                "Agent iteration starting"
            );

            let mut request =
                CompletionRequest::new(messages.clone()).with_tools(definitions.clone());
            if let Some(model) = &config.model {
                request = request.with_model(model.as_str());
            }
            if let Some(temperature) = config.temperature {
                request = request.with_temperature(temperature);
            }
            if let Some(max_tokens) = config.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = provider.complete(request).await?;
            usage.accumulate(&response.usage);
            debug!(
                agent = %config.name,
                finish_reason = ?response.finish_reason,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "Completion received"
            );
            if response.finish_reason == FinishReason::Length {
                warn!(
                    agent = %config.name,
                    max_tokens = ?config.max_tokens,
                    "Completion was cut off at the token limit"
                );
            }
            let content = response.message.content;
            let tool_calls = response.message.tool_calls;
            partial.note_text(&content);

            if tool_calls.is_empty() {
                debug!(
                    agent = %config.name,
                    iterations = iteration + 1,
                    response_len = content.len(),
                    total_tokens = usage.total_tokens,
                    "Agent produced terminal answer"
                );
                if content.trim().is_empty() {
                    return Ok(partial.into_text(&config.name, iteration + 1));
                }
                return Ok(content);
            }

            debug!(
                agent = %config.name,
                tool_count = tool_calls.len(),
                "Agent executing tools"
            );

            messages.push(Message::assistant_with_tool_calls(content, tool_calls.clone()));

            for tool_call in &tool_calls {
                debug!(agent = %config.name, tool = %tool_call.name, "Executing tool");
                let result = execute_tool(&tools, tool_call).await;
                partial.note_tool_output(&result);
                messages.push(Message::tool_result(&tool_call.id, result));
            }
        }

        warn!(
            agent = %config.name,
            max_iterations = config.max_iterations,
            total_tokens = usage.total_tokens,
            "Agent exhausted iteration budget; returning partial output"
        );
        Ok(partial.into_text(&config.name, config.max_iterations))
    }
}

/// Best text seen so far, used when the loop ends without a usable answer.
#[derive(Default)]
struct PartialAnswer {
    last_text: Option<String>,
    last_tool_output: Option<String>,
}

impl PartialAnswer {
    fn note_text(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.last_text = Some(text.to_string());
        }
    }

    fn note_tool_output(&mut self, output: &str) {
        if !output.trim().is_empty() {
            self.last_tool_output = Some(output.to_string());
        }
    }

    fn into_text(self, agent: &str, iterations: usize) -> String {
        self.last_text
            .or(self.last_tool_output)
            .unwrap_or_else(|| {
                format!(
                    "Agent {} stopped after {} iterations without a final answer.",
                    agent, iterations
                )
            })
    }
}

/// Execute a single tool call, rendering every failure as text.
async fn execute_tool(registry: &ToolRegistry, tool_call: &ToolCall) -> String {
    let Some(tool) = registry.get(&tool_call.name) else {
        warn!(tool = %tool_call.name, "Model requested unknown tool");
        return format!(
            "Invalid action: unknown tool '{}'. Available tools: {}. Retry with one of them.",
            tool_call.name,
            registry.names().join(", ")
        );
    };

    if tool_call.arguments.is_null() {
        warn!(tool = %tool_call.name, "Model sent undecodable tool arguments");
        return format!(
            "Invalid action: arguments for '{}' were not valid JSON. Retry with a JSON object matching the tool schema.",
            tool_call.name
        );
    }

    match tool.execute(tool_call.arguments.clone()).await {
        Ok(output) => {
            if output.is_error {
                format!("Error: {}", output.content)
            } else {
                output.content
            }
        }
        Err(e) => format!("Error executing tool: {}", e),
    }
}
