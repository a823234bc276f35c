//! Agent configuration with documented defaults
//!
//! Loaded from a TOML file (every section optional) and then patched with
//! environment overrides. Only the keys the pipeline actually reads live
//! here; front-end specific settings belong to the front ends.

use crate::core::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which completion backend the planner talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    OpenAi,
    OpenRouter,
    Anthropic,
    /// No generative planning; template misses degrade to the echo plan
    None,
}

impl LlmProvider {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "deepseek" => Some(Self::OpenAi),
            "openrouter" => Some(Self::OpenRouter),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }

    /// Endpoint used when the config does not name one
    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAi => "https://api.openai.com/v1/chat/completions",
            Self::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            Self::Anthropic => "https://api.anthropic.com/v1/messages",
            Self::None => "",
        }
    }
}

/// `[llm]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides `LlmProvider::default_url`
    pub url: Option<String>,
    pub api_key: String,
    /// Ceiling for one planning request, connect included
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "llama3".into(),
            url: None,
            api_key: String::new(),
            timeout_secs: 45,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    pub fn endpoint(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.provider.default_url().to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[execution]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Ceiling for a single `run_command` child process
    pub command_timeout_secs: u64,
    /// Ceiling for any single dispatched step
    ///
    /// Kept above `command_timeout_secs` so a slow command reports its own
    /// timeout rather than the generic step one.
    pub step_timeout_secs: u64,
    /// Command output beyond this many characters is cut off in results
    pub output_limit: usize,
    /// Where `take_screenshot` writes its images
    pub screenshot_dir: PathBuf,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 45,
            step_timeout_secs: 55,
            output_limit: 500,
            screenshot_dir: PathBuf::from("/tmp/deskhand"),
        }
    }
}

impl ExecutionConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub execution: ExecutionConfig,
}

impl AgentConfig {
    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            let parsed = Self::from_toml_str(&content)?;
            tracing::info!("Config loaded from {}", path.display());
            parsed
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate().map_err(AgentError::Config)?;
        Ok(config)
    }

    /// `~/.deskhand/config.toml`, or `./.deskhand/config.toml` without a home
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".deskhand")
            .join("config.toml")
    }

    /// Apply `DESKHAND_LLM_PROVIDER`, `LLM_API_KEY`, `LLM_API_URL` and `LLM_MODEL`
    pub fn apply_env_overrides(&mut self) {
        if let Some(provider) = std::env::var("DESKHAND_LLM_PROVIDER")
            .ok()
            .and_then(|raw| LlmProvider::parse(&raw))
        {
            self.llm.provider = provider;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(url) = std::env::var("LLM_API_URL") {
            self.llm.url = Some(url);
        }
        if let Ok(model) = std::env::var("LLM_MODEL") {
            self.llm.model = model;
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.llm.timeout_secs == 0 {
            return Err("llm.timeout_secs must be positive".into());
        }
        if self.execution.command_timeout_secs == 0 || self.execution.step_timeout_secs == 0 {
            return Err("Execution timeouts must be positive".into());
        }
        if self.execution.command_timeout_secs >= self.execution.step_timeout_secs {
            return Err(format!(
                "command_timeout_secs ({}) should be < step_timeout_secs ({})",
                self.execution.command_timeout_secs, self.execution.step_timeout_secs
            ));
        }
        if self.execution.output_limit == 0 {
            return Err("output_limit must be positive".into());
        }
        Ok(())
    }
}
