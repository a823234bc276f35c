//! Async HTTP client for completion providers
//!
//! Model-agnostic: speaks Ollama's generate API, the OpenAI-compatible chat
//! completions API (OpenAI, OpenRouter, DeepSeek) and the Anthropic messages
//! API. The whole prompt goes out as a single user message.

use crate::core::config::{LlmConfig, LlmProvider};
use crate::core::error::{AgentError, Result};
use crate::llm::{CompletionError, CompletionService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// API format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Ollama,
    Anthropic,
    OpenAI,
}

impl ApiFormat {
    fn for_provider(provider: LlmProvider, url: &str) -> Self {
        match provider {
            LlmProvider::Ollama => ApiFormat::Ollama,
            LlmProvider::Anthropic => ApiFormat::Anthropic,
            // Custom URLs pointing at Anthropic still get its format
            _ if url.contains("anthropic.com") => ApiFormat::Anthropic,
            _ => ApiFormat::OpenAI,
        }
    }
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
    max_tokens: u32,
    temperature: f32,
    timeout_secs: u64,
}

impl LlmClient {
    /// Build a client for the configured provider
    ///
    /// `Ok(None)` when the provider is `none`. Hosted providers without an
    /// API key are a configuration error.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        if config.provider == LlmProvider::None {
            return Ok(None);
        }
        if config.provider != LlmProvider::Ollama && config.api_key.is_empty() {
            return Err(AgentError::Llm(format!(
                "provider {:?} needs an api_key (or LLM_API_KEY)",
                config.provider
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        let endpoint = config.endpoint();
        let api_format = ApiFormat::for_provider(config.provider, &endpoint);
        let api_url = match api_format {
            ApiFormat::Ollama if !endpoint.ends_with("/api/generate") => {
                format!("{}/api/generate", endpoint.trim_end_matches('/'))
            }
            _ => endpoint,
        };

        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            url = %api_url,
            "Completion client ready"
        );

        Ok(Some(Self {
            client,
            api_key: config.api_key.clone(),
            api_url,
            model: config.model.clone(),
            api_format,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }))
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete_ollama(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        let completion: OllamaResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        non_empty(completion.response)
    }

    async fn complete_anthropic(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        completion
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .map_or(Err(CompletionError::EmptyResponse), non_empty)
    }

    async fn complete_openai(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        let request = OpenAIRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .header("X-Title", "deskhand")
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .map_or(Err(CompletionError::EmptyResponse), non_empty)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<reqwest::Response, CompletionError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "Provider returned an error");
        Err(status_error(status.as_u16(), body, &self.model))
    }

    fn transport_error(&self, error: reqwest::Error) -> CompletionError {
        if error.is_timeout() {
            CompletionError::Timeout(self.timeout_secs)
        } else if error.is_connect() {
            CompletionError::Unreachable(format!("{}: {}", self.api_url, error))
        } else if error.is_decode() {
            CompletionError::Provider {
                status: 200,
                body: error.to_string(),
            }
        } else {
            CompletionError::Unreachable(error.to_string())
        }
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, CompletionError> {
        match self.api_format {
            ApiFormat::Ollama => self.complete_ollama(prompt).await,
            ApiFormat::Anthropic => self.complete_anthropic(prompt).await,
            ApiFormat::OpenAI => self.complete_openai(prompt).await,
        }
    }
}

/// Map a non-2xx status onto the error taxonomy
pub fn status_error(status: u16, body: String, model: &str) -> CompletionError {
    match status {
        401 | 403 => CompletionError::Unauthorized,
        402 => CompletionError::InsufficientCredits,
        404 => CompletionError::ModelNotFound(model.to_string()),
        429 => CompletionError::RateLimited,
        _ => CompletionError::Provider { status, body },
    }
}

fn non_empty(text: String) -> std::result::Result<String, CompletionError> {
    if text.trim().is_empty() {
        Err(CompletionError::EmptyResponse)
    } else {
        Ok(text)
    }
}

// Ollama generate API
#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

// OpenAI-compatible API format (OpenAI, OpenRouter, DeepSeek)
#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_none_provider_has_no_client() {
        assert!(LlmClient::from_config(&config(LlmProvider::None))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_ollama_needs_no_key_and_gets_generate_path() {
        let client = LlmClient::from_config(&config(LlmProvider::Ollama))
            .unwrap()
            .unwrap();
        assert_eq!(client.api_format(), ApiFormat::Ollama);
        assert_eq!(client.api_url, "http://localhost:11434/api/generate");
        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn test_hosted_provider_requires_key() {
        let result = LlmClient::from_config(&config(LlmProvider::OpenRouter));
        assert!(matches!(result, Err(AgentError::Llm(_))));
    }

    #[test]
    fn test_format_detection() {
        let mut cfg = config(LlmProvider::OpenAi);
        cfg.api_key = "test-key".into();
        let client = LlmClient::from_config(&cfg).unwrap().unwrap();
        assert_eq!(client.api_format(), ApiFormat::OpenAI);

        cfg.url = Some("https://api.anthropic.com/v1/messages".into());
        let client = LlmClient::from_config(&cfg).unwrap().unwrap();
        assert_eq!(client.api_format(), ApiFormat::Anthropic);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(401, String::new(), "m"),
            CompletionError::Unauthorized
        ));
        assert!(matches!(
            status_error(403, String::new(), "m"),
            CompletionError::Unauthorized
        ));
        assert!(matches!(
            status_error(402, String::new(), "m"),
            CompletionError::InsufficientCredits
        ));
        assert!(matches!(
            status_error(404, String::new(), "llama3"),
            CompletionError::ModelNotFound(m) if m == "llama3"
        ));
        assert!(matches!(
            status_error(429, String::new(), "m"),
            CompletionError::RateLimited
        ));
        assert!(matches!(
            status_error(500, "boom".into(), "m"),
            CompletionError::Provider { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let mut cfg = config(LlmProvider::Ollama);
        cfg.url = Some("http://127.0.0.1:9".into());
        cfg.timeout_secs = 2;
        let client = LlmClient::from_config(&cfg).unwrap().unwrap();
        let result = client.complete("hello").await;
        assert!(matches!(
            result,
            Err(CompletionError::Unreachable(_)) | Err(CompletionError::Timeout(_))
        ));
    }
}
