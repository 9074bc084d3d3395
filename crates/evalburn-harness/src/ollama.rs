use std::time::{Duration, Instant};

use async_trait::async_trait;
use evalburn_core::{EvalBurnError, GenerationStats, OllamaConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::model::{Generation, ModelInvoker};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
struct ModelDetails {
    parameter_size: Option<String>,
    quantization_level: Option<String>,
}

/// A model available on the Ollama server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    pub id: String,
    pub parameter_size: Option<String>,
    pub quantization: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl OllamaClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvalBurnError::Http(e.to_string()))?;

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &OllamaConfig) -> Result<Self> {
        Self::new(&config.host, config.request_timeout())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub async fn list_models(&self) -> Result<Vec<ModelSummary>> {
        let url = format!("{}/api/tags", self.host);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EvalBurnError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(EvalBurnError::OllamaError(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| EvalBurnError::Http(e.to_string()))?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| {
                let (parameter_size, quantization) = match m.details {
                    Some(d) => (d.parameter_size, d.quantization_level),
                    None => (None, None),
                };
                ModelSummary {
                    id: m.name,
                    parameter_size,
                    quantization,
                }
            })
            .collect())
    }

    /// Single non-streaming completion via `/api/generate`.
    pub async fn generate_raw(&self, model: &str, prompt: &str) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EvalBurnError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(EvalBurnError::OllamaError(format!(
                "Generate failed: {} - {}",
                status, body
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| EvalBurnError::Http(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            EvalBurnError::Http(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                body.chars().take(500).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl ModelInvoker for OllamaClient {
    #[instrument(skip(self, prompt), fields(host = %self.host))]
    async fn generate(&self, prompt: &str, model: &str) -> Generation {
        let start = Instant::now();
        match self.generate_raw(model, prompt).await {
            Ok(resp) => {
                let elapsed_seconds = start.elapsed().as_secs_f64();
                let response_text = match resp.response.trim() {
                    "" => "Error: No response text found.".to_string(),
                    text => text.to_string(),
                };
                tracing::debug!("Generated {} chars in {:.2}s", response_text.len(), elapsed_seconds);
                Generation {
                    response_text,
                    stats: Some(GenerationStats {
                        elapsed_seconds,
                        prompt_tokens: resp.prompt_eval_count.unwrap_or(0),
                        completion_tokens: resp.eval_count.unwrap_or(0),
                    }),
                }
            }
            Err(e) => {
                tracing::warn!("Generation failed for {}: {}", model, e);
                Generation::failed(e)
            }
        }
    }
}
