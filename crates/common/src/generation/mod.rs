//! Generative text service abstraction
//!
//! Provides a single call contract, `generate(prompt, params) -> text`, over:
//! - Cohere (`/generate`)
//! - A deterministic mock for offline development and tests

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Sampling parameters for one generative call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationParams {
    /// Single-paper summary: moderate length, low temperature
    pub const SUMMARIZE: Self = Self { max_tokens: 400, temperature: 0.3 };

    /// Multi-paper comparison: long output, moderate temperature
    pub const COMPARE: Self = Self { max_tokens: 1000, temperature: 0.4 };

    /// Question answering: short output, low temperature
    pub const ASK: Self = Self { max_tokens: 200, temperature: 0.3 };
}

/// Trait for generative text clients
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Cohere generate client
pub struct CohereGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CohereResponse {
    #[serde(default)]
    generations: Vec<CohereGeneration>,
}

#[derive(Deserialize)]
struct CohereGeneration {
    text: String,
}

impl CohereGenerator {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for CohereGenerator {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let url = format!("{}/generate", self.base_url);

        let request = CohereRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::GenerationTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    AppError::GenerationFailed {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationFailed {
                message: format!("API error {}: {}", status, body),
            });
        }

        let result: CohereResponse = response.json().await.map_err(|e| AppError::GenerationFailed {
            message: format!("Failed to parse response: {}", e),
        })?;

        result
            .generations
            .into_iter()
            .next()
            .map(|generation| generation.text.trim().to_string())
            .ok_or_else(|| AppError::GenerationFailed {
                message: "Empty response".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock generator for development and tests
///
/// Echoes a bounded slice of the prompt tail so responses are stable
/// for identical prompts.
pub struct MockGenerator;

impl MockGenerator {
    const ECHO_CHARS: usize = 160;
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String> {
        let total = prompt.chars().count();
        let tail: String = prompt
            .chars()
            .skip(total.saturating_sub(Self::ECHO_CHARS))
            .collect();

        Ok(format!(
            "[mock:{}] {}",
            params.max_tokens,
            tail.split_whitespace().collect::<Vec<_>>().join(" ")
        ))
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "cohere" => {
            let key = config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "generation.api_key is required for the cohere provider".to_string(),
                })?;
            Ok(Arc::new(CohereGenerator::new(
                key,
                config.model.clone(),
                config.api_base.clone(),
                config.timeout(),
            )?))
        }
        "mock" => Ok(Arc::new(MockGenerator)),
        other => {
            tracing::warn!(provider = other, "Unknown generation provider, using mock");
            Ok(Arc::new(MockGenerator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_is_deterministic() {
        let generator = MockGenerator;
        let a = generator.generate("Summary:\n  alpha   beta", GenerationParams::SUMMARIZE).await.unwrap();
        let b = generator.generate("Summary:\n  alpha   beta", GenerationParams::SUMMARIZE).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "[mock:400] Summary: alpha beta");
    }

    #[test]
    fn test_operation_params_ordering() {
        assert!(GenerationParams::COMPARE.max_tokens > GenerationParams::SUMMARIZE.max_tokens);
        assert!(GenerationParams::SUMMARIZE.max_tokens > GenerationParams::ASK.max_tokens);
        assert!(GenerationParams::COMPARE.temperature > GenerationParams::ASK.temperature);
    }

    #[test]
    fn test_cohere_requires_api_key() {
        let config = GenerationConfig::default();
        let err = create_generator(&config).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));

        let config = GenerationConfig {
            provider: "mock".into(),
            ..GenerationConfig::default()
        };
        assert_eq!(create_generator(&config).unwrap().model_name(), "mock-generator");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"id":"x","generations":[{"id":"g","text":"  An answer.\n"}],"prompt":"p"}"#;
        let parsed: CohereResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.generations[0].text.trim(), "An answer.");

        let parsed: CohereResponse = serde_json::from_str(r#"{"message":"bad"}"#).unwrap();
        assert!(parsed.generations.is_empty());
    }
}
