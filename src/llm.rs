//! Client for a local Ollama-compatible text-generation service.

use crate::parsers::text::{DEFAULT_CHUNK_CHARS, split_content};
use crate::retry::RetryPolicy;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Settings for the text-generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum number of tokens to generate
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Content longer than this is analysed piece by piece
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama2".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_num_predict() -> u32 {
    4000
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_content_chars() -> usize {
    DEFAULT_CHUNK_CHARS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            num_predict: default_num_predict(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

/// Errors that can occur talking to the text-generation service
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("could not connect to the language model service: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("the request timed out")]
    Timeout,

    #[error("API error: {status} - {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response from the language model service: {0}")]
    Parse(String),
}

impl LlmError {
    fn is_transient(&self) -> bool {
        matches!(self, LlmError::Connection(_) | LlmError::Timeout)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Whether the service can be used, and why not if it cannot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmStatus {
    pub available: bool,
    pub message: String,
}

pub struct LlmClient {
    config: LlmConfig,
    retry: RetryPolicy,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig, retry: RetryPolicy) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::Connection)?;

        Ok(Self {
            config,
            retry,
            client,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check that the service answers and has the configured model installed
    pub async fn status(&self) -> LlmStatus {
        let url = format!("{}/api/tags", self.config.endpoint);
        let response = match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return LlmStatus {
                    available: false,
                    message: "Could not connect to Ollama. Please make sure Ollama is running (ollama serve)".to_string(),
                };
            }
            Err(e) => {
                return LlmStatus {
                    available: false,
                    message: format!("Error connecting to Ollama: {}", e),
                };
            }
        };

        if !response.status().is_success() {
            return LlmStatus {
                available: false,
                message: "Ollama is not responding correctly".to_string(),
            };
        }

        let installed = match response.json::<TagsResponse>().await {
            Ok(tags) => tags.models,
            Err(e) => {
                return LlmStatus {
                    available: false,
                    message: format!("Error reading model list: {}", e),
                };
            }
        };

        if installed.iter().any(|m| m.name == self.config.model) {
            LlmStatus {
                available: true,
                message: "Ollama is running and model is available".to_string(),
            }
        } else {
            LlmStatus {
                available: false,
                message: format!(
                    "Model {} is not available. Please run 'ollama pull {}'",
                    self.config.model, self.config.model
                ),
            }
        }
    }

    /// Send a prompt and return the generated text
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.retry
            .run("language model request", LlmError::is_transient, || {
                self.generate_once(prompt)
            })
            .await
    }

    /// Like [`generate`](Self::generate), but failures come back as an
    /// `Error: ...` string
    pub async fn analyze(&self, prompt: &str) -> String {
        match self.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                ::log::error!("Language model request failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    /// Analyse content according to the user's instructions
    ///
    /// Content over `max_content_chars` is sent in pieces and the answers
    /// are joined with blank lines.
    pub async fn analyze_content(&self, content: &str, instructions: &str) -> String {
        let chunks = split_content(content, self.config.max_content_chars);
        if chunks.len() <= 1 {
            return self.analyze(&build_prompt(content, instructions)).await;
        }

        ::log::info!("Content split into {} parts for analysis", chunks.len());
        let mut answers = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            answers.push(self.analyze(&build_prompt(chunk, instructions)).await);
        }
        answers.join("\n\n")
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.num_predict,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        ::log::info!("Sending request to {} with model {}", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_send_error)?;
        ::log::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(LlmError::Api { status, body });
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|_| {
            LlmError::Parse(format!(
                "invalid JSON - {}",
                body.chars().take(100).collect::<String>()
            ))
        })?;

        parsed
            .response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::Parse("missing 'response' field".to_string()))
    }
}

fn classify_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Connection(e)
    }
}

/// Compose the analysis prompt from scraped content and user instructions
pub fn build_prompt(content: &str, instructions: &str) -> String {
    format!(
        "Content to analyze:\n{}\n\nUser's instructions: {}\n\n\
         Provide a clear, well-formatted response that directly addresses the user's request.",
        content.trim(),
        instructions.trim()
    )
}
