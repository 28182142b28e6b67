//! Append research output to a text file.
//!
//! Appends from concurrent requests are serialized twice: an async mutex
//! inside the process and an exclusive advisory lock on the file itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use qr_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

pub const DEFAULT_SAVE_PATH: &str = "research_output.txt";

pub struct SaveTool {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl SaveTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Render one output block. Strings are written as-is, anything else as
/// indented JSON.
pub fn format_block(data: &Value, timestamp: &str) -> String {
    let payload = match data {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    format!(
        "--- Research Output ---\nTimestamp: {}\n\n{}\n\n",
        timestamp, payload
    )
}

/// The payload is `data` when present, otherwise the whole argument value.
fn payload(arguments: Value) -> Value {
    match arguments {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn append_locked(path: &Path, block: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock_exclusive()?;
    let written = file.write_all(block.as_bytes()).and_then(|_| file.flush());
    let unlocked = FileExt::unlock(&file);
    written.and(unlocked)
}

#[async_trait]
impl Tool for SaveTool {
    fn name(&self) -> &str {
        "save_text_to_file"
    }

    fn description(&self) -> &str {
        "Saves structured research data to a text file."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "data",
                PropertySchema::string("The research text or record to save"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let data = payload(arguments);
        if data.is_null() {
            return Ok(ToolOutput::error("Invalid arguments: nothing to save"));
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let block = format_block(&data, &timestamp);
        let path = self.path.clone();

        let _guard = self.write_lock.lock().await;
        let result = tokio::task::spawn_blocking(move || append_locked(&path, &block))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "Saved research output");
                Ok(ToolOutput::success(format!(
                    "Data successfully saved to {}",
                    self.path.display()
                )))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to save research output");
                Ok(ToolOutput::error(format!("Error saving file: {}", e)))
            }
        }
    }
}
