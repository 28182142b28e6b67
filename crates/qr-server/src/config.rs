//! Layered configuration: defaults, then `qr.toml`, then `QR_` environment
//! variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use qr_agents::{Depth, ResearchSettings, Researcher};
use qr_core::{Error, DEFAULT_MAX_ITERATIONS};
use qr_providers::{OpenAIProvider, GROQ_BASE_URL};
use qr_tools::{create_research_registry, ToolsConfig, DEFAULT_SAVE_PATH};

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "qr.toml";

/// Environment variables consulted, in order, when `llm.api_key` is unset.
pub const API_KEY_FALLBACK_VARS: &[&str] = &["GROQ_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion token cap per LLM call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            api_key: None,
            model: "llama-3.1-8b-instant".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    pub max_iterations: usize,
    pub default_depth: Depth,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            default_depth: Depth::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsSection {
    pub timeout_secs: u64,
    pub search_max_results: usize,
    pub wikipedia_max_chars: usize,
    pub wikipedia_lang: String,
    pub save_path: PathBuf,
    pub enable_save: bool,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            search_max_results: 5,
            wikipedia_max_chars: 1000,
            wikipedia_lang: "en".to_string(),
            save_path: PathBuf::from(DEFAULT_SAVE_PATH),
            enable_save: true,
        }
    }
}

impl ToolsSection {
    pub fn to_tools_config(&self) -> ToolsConfig {
        ToolsConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            search_max_results: self.search_max_results,
            wikipedia_max_chars: self.wikipedia_max_chars,
            wikipedia_lang: self.wikipedia_lang.clone(),
            save_path: self.enable_save.then(|| self.save_path.clone()),
        }
    }
}

impl Config {
    /// Build the layered figment. An explicit path must exist; the default
    /// `qr.toml` is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment, Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match path {
            Some(path) if !path.exists() => {
                return Err(Error::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }

        Ok(figment.merge(Env::prefixed("QR_").split("__")))
    }

    /// Load configuration. Call after `.env` has been applied so its values
    /// are visible to the environment layer.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::from_figment(Self::figment(path)?)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, Error> {
        let mut config: Config = figment
            .extract()
            .map_err(|e| Error::config(e.to_string()))?;
        if config.llm.api_key.is_none() {
            config.llm.api_key = fallback_api_key();
        }
        Ok(config)
    }

    /// The configured key, or an error naming where to set one.
    pub fn api_key(&self) -> Result<&str, Error> {
        self.llm
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "No LLM API key configured. Set llm.api_key, QR_LLM__API_KEY or one of {}",
                    API_KEY_FALLBACK_VARS.join(", ")
                ))
            })
    }

    pub fn research_settings(&self) -> ResearchSettings {
        ResearchSettings {
            max_iterations: self.agent.max_iterations,
            model: Some(self.llm.model.clone()),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
        }
    }

    /// Assemble the provider, tools and settings into a researcher.
    pub fn build_researcher(&self) -> Result<Researcher, Error> {
        let provider = OpenAIProvider::new(self.api_key()?)
            .with_base_url(self.llm.base_url.as_str())
            .with_default_model(self.llm.model.as_str())
            .with_timeout(Duration::from_secs(self.llm.timeout_secs));

        let tools = create_research_registry(&self.tools.to_tools_config());

        Ok(Researcher::new(
            Arc::new(provider),
            tools,
            self.research_settings(),
        ))
    }
}

fn fallback_api_key() -> Option<String> {
    API_KEY_FALLBACK_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.llm.base_url, GROQ_BASE_URL);
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.default_depth, Depth::Detailed);
        assert_eq!(config.tools.save_path, PathBuf::from("research_output.txt"));
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "qr.toml",
                r#"
                [llm]
                model = "llama-3.3-70b-versatile"
                api_key = "from-file"
                max_tokens = 2048

                [agent]
                default_depth = "quick"

                [tools]
                enable_save = false
                "#,
            )?;
            jail.set_env("QR_SERVER__BIND", "127.0.0.1:8080");
            jail.set_env("QR_AGENT__MAX_ITERATIONS", "3");

            let config = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.server.bind, "127.0.0.1:8080");
            assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
            assert_eq!(config.api_key().map_err(|e| e.to_string())?, "from-file");
            assert_eq!(config.agent.max_iterations, 3);
            assert_eq!(config.research_settings().max_tokens, Some(2048));
            assert_eq!(config.agent.default_depth, Depth::Quick);
            assert!(config.tools.to_tools_config().save_path.is_none());
            // Untouched keys keep their defaults.
            assert_eq!(config.tools.search_max_results, 5);
            Ok(())
        });
    }

    #[test]
    fn test_api_key_fallback_env() {
        Jail::expect_with(|jail| {
            jail.set_env("GROQ_API_KEY", "gsk-test");
            let config = Config::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.llm.api_key.as_deref(), Some("gsk-test"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here/qr.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_api_key_message() {
        let config = Config {
            llm: LlmSection {
                api_key: Some("  ".to_string()),
                ..LlmSection::default()
            },
            ..Config::default()
        };
        let err = config.api_key().unwrap_err();
        assert!(err.to_string().contains("GROQ_API_KEY"));
        assert!(config.build_researcher().is_err());
    }

    #[test]
    fn test_build_researcher_tools() {
        let config = Config {
            llm: LlmSection {
                api_key: Some("gsk-test".to_string()),
                ..LlmSection::default()
            },
            ..Config::default()
        };
        let researcher = config.build_researcher().unwrap();
        assert_eq!(researcher.tool_names(), vec!["save_text_to_file", "search", "wikipedia"]);
        assert_eq!(researcher.settings().model.as_deref(), Some("llama-3.1-8b-instant"));
    }
}
