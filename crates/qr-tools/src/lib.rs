//! qr-tools: Research tool adapters for quick-research
//!
//! This crate provides the tools available to the research agent:
//! - Search: web results from DuckDuckGo
//! - Wikipedia: top page summary for a query
//! - Save: append research output to a text file

pub mod save;
pub mod web;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use qr_core::{Tool, ToolRegistry};

pub use save::{SaveTool, DEFAULT_SAVE_PATH};
pub use web::{parse_search_results, truncate_chars, SearchHit, SearchTool, WikipediaTool};

/// Settings shared by the research tools.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Per-request timeout for search and Wikipedia calls.
    pub timeout: Duration,
    pub search_max_results: usize,
    pub wikipedia_max_chars: usize,
    pub wikipedia_lang: String,
    /// Where the save tool appends. `None` disables the save tool.
    pub save_path: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            search_max_results: 5,
            wikipedia_max_chars: 1000,
            wikipedia_lang: "en".to_string(),
            save_path: Some(PathBuf::from(DEFAULT_SAVE_PATH)),
        }
    }
}

/// Create the research tools (Arc version)
pub fn create_research_tools_arc(config: &ToolsConfig) -> Vec<Arc<dyn Tool>> {
    let mut tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(SearchTool::new(config.timeout, config.search_max_results)),
        Arc::new(WikipediaTool::new(
            config.timeout,
            &config.wikipedia_lang,
            config.wikipedia_max_chars,
        )),
    ];

    if let Some(path) = &config.save_path {
        tools.push(Arc::new(SaveTool::new(path.clone())));
    }

    tools
}

/// Build a registry holding the research tools.
pub fn create_research_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in create_research_tools_arc(config) {
        registry.register(tool);
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = create_research_registry(&ToolsConfig::default());
        assert_eq!(registry.names(), vec!["save_text_to_file", "search", "wikipedia"]);
    }

    #[test]
    fn test_registry_without_save() {
        let config = ToolsConfig {
            save_path: None,
            ..ToolsConfig::default()
        };
        let registry = create_research_registry(&config);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("save_text_to_file").is_none());
    }
}
