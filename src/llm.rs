//! Language model providers.
//!
//! Concrete [`ChatModel`] implementations selected by `llm.provider`:
//!
//! | Config value | Endpoint |
//! |--------------|----------|
//! | `"openai"` | `POST {url}/chat/completions`, default `https://api.openai.com/v1` |
//! | `"huggingface"` | same wire format on the Hugging Face inference router, default `https://router.huggingface.co/v1` |
//! | `"ollama"` | `POST {url}/api/generate`, default `http://localhost:11434` |
//!
//! The filled prompt is sent as a single user message (or the raw Ollama
//! prompt) with `max_tokens` and `temperature` from the config. Requests
//! are sent once; failures are returned to the caller.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use unibot_core::llm::ChatModel;

use crate::config::LlmConfig;
use crate::credentials::Credentials;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";
const HUGGINGFACE_DEFAULT_URL: &str = "https://router.huggingface.co/v1";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

// ============ Chat completions (OpenAI, Hugging Face) ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionsModel {
    service: &'static str,
    client: reqwest::Client,
    url: String,
    token: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionsModel {
    pub fn openai(config: &LlmConfig, credentials: &Credentials) -> Result<Self> {
        Self::build(
            "OpenAI",
            config,
            OPENAI_DEFAULT_URL,
            credentials.openai_api_key()?.to_string(),
        )
    }

    pub fn huggingface(config: &LlmConfig, credentials: &Credentials) -> Result<Self> {
        Self::build(
            "Hugging Face",
            config,
            HUGGINGFACE_DEFAULT_URL,
            credentials.huggingface_token()?.to_string(),
        )
    }

    fn build(
        service: &'static str,
        config: &LlmConfig,
        default_url: &str,
        token: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            service,
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| default_url.to_string()),
            token,
            model: config.model_name(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for ChatCompletionsModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.url.trim_end_matches('/')))
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{} request failed: {}", self.service, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("{} API error {}: {}", self.service, status, body_text);
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed, self.service)
    }
}

fn first_choice(response: ChatResponse, service: &str) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("{} returned no completion", service))
}

// ============ Ollama ============

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model: config.model_name(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.url.trim_end_matches('/')))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }
}

/// Create the [`ChatModel`] named by `llm.provider`.
pub fn create_chat_model(config: &LlmConfig, credentials: &Credentials) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(ChatCompletionsModel::openai(config, credentials)?)),
        "huggingface" => Ok(Arc::new(ChatCompletionsModel::huggingface(
            config,
            credentials,
        )?)),
        "ollama" => Ok(Arc::new(OllamaChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 256,
            temperature: 0.5,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_first_choice() {
        let parsed: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Answer."}}]
        }))
        .unwrap();
        assert_eq!(first_choice(parsed, "test").unwrap(), "Answer.");

        let empty: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(first_choice(empty, "test").is_err());
    }

    #[test]
    fn test_generate_request_carries_options() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "p",
            stream: false,
            options: GenerateOptions {
                temperature: 0.5,
                num_predict: 256,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["num_predict"], 256);
        assert_eq!(json["prompt"], "p");
    }

    #[test]
    fn test_create_chat_model() {
        let config = parse_config("").unwrap();
        assert!(create_chat_model(&config.llm, &Credentials::default()).is_err());

        let creds = Credentials {
            openai_api_key: None,
            huggingface_token: Some("hf_test".to_string()),
        };
        let model = create_chat_model(&config.llm, &creds).unwrap();
        assert_eq!(model.model_name(), "HuggingFaceH4/zephyr-7b-beta");

        let config = parse_config("[llm]\nprovider = \"ollama\"\n").unwrap();
        let model = create_chat_model(&config.llm, &Credentials::default()).unwrap();
        assert_eq!(model.model_name(), "llama3.2");
    }
}
