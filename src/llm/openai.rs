//! OpenAI-compatible chat completions and embeddings

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Embedder, GenerationResult, LanguageModel};
use crate::config::LlmConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct OpenAiClient {
    agent: ureq::Agent,
    base_url: String,
    model: String,
    embedding_model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, api_key: Option<String>, timeout: Duration) -> Self {
        let agent_config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| eyre::eyre!("Missing API key for OpenAI-compatible provider"))
    }

    fn post(&self, path: &str, body: String) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key()?))
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .with_context(|| format!("Failed to call {}", url))?;

        response
            .body_mut()
            .read_to_string()
            .context("Failed to read response")
    }
}

impl LanguageModel for OpenAiClient {
    fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        log::debug!("Generating with {} ({} prompt chars)", self.model, prompt.chars().count());

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let body = serde_json::to_string(&request).context("Failed to serialize request")?;
        let response_body = self.post("/chat/completions", body)?;
        let response: ChatResponse =
            serde_json::from_str(&response_body).context("Failed to parse chat completion response")?;

        let text = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or_else(|| eyre::eyre!("No content in chat completion response"))?;

        Ok(GenerationResult::new(text.trim()))
    }
}

impl Embedder for OpenAiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let body = serde_json::to_string(&request).context("Failed to serialize request")?;
        let response_body = self.post("/embeddings", body)?;
        let response: EmbeddingResponse =
            serde_json::from_str(&response_body).context("Failed to parse embedding response")?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| eyre::eyre!("No embedding in response"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_without_key_fails_before_network() {
        let client = OpenAiClient::new(&LlmConfig::default(), None, Duration::from_secs(1));
        let err = client.generate("hello").unwrap_err();
        assert!(err.to_string().contains("Missing API key"));
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let config = LlmConfig {
            base_url: Some("https://dashscope.aliyuncs.com/compatible-mode/v1/".to_string()),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::new(&config, None, Duration::from_secs(1));
        assert_eq!(client.base_url, "https://dashscope.aliyuncs.com/compatible-mode/v1");
    }

    #[test]
    fn test_chat_response_parses_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"哼。"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("哼。"));
    }
}
