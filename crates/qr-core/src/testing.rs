//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::message::{Message, ToolCall, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::tool::{Tool, ToolDefinition, ToolOutput};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
    next_call_id: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
            next_call_id: AtomicUsize::new(0),
        }
    }

    fn push(&self, response: Result<CompletionResponse, Error>) {
        // FIFO: first queued = first returned.
        self.responses.lock().unwrap().insert(0, response);
    }

    fn respond(message: Message, finish_reason: FinishReason) -> CompletionResponse {
        CompletionResponse {
            message,
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason,
        }
    }

    /// Queue a plain text (terminal) response.
    pub fn queue_response(&self, content: &str) {
        self.push(Ok(Self::respond(Message::assistant(content), FinishReason::Stop)));
    }

    /// Queue a text response that hit the completion token cap.
    pub fn queue_truncated_response(&self, content: &str) {
        self.push(Ok(Self::respond(Message::assistant(content), FinishReason::Length)));
    }

    /// Queue a response that requests a single tool call and carries no text.
    pub fn queue_tool_call(&self, name: &str, arguments: Value) {
        self.queue_tool_call_with_text("", name, arguments);
    }

    /// Queue a response that requests a tool call alongside some text.
    pub fn queue_tool_call_with_text(&self, content: &str, name: &str, arguments: Value) {
        let id = format!("call-{}", self.next_call_id.fetch_add(1, Ordering::SeqCst));
        let message =
            Message::assistant_with_tool_calls(content, vec![ToolCall::new(id, name, arguments)]);
        self.push(Ok(Self::respond(message, FinishReason::ToolCalls)));
    }

    /// Queue an error for the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.push(Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop() {
            Some(response) => response,
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// A tool that records its arguments and always returns the same text.
pub struct MockTool {
    name: String,
    output: String,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: output.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded arguments; stays valid after the tool is registered.
    pub fn calls(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock tool"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description())
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        self.calls.lock().unwrap().push(arguments);
        Ok(ToolOutput::success(self.output.clone()))
    }
}
