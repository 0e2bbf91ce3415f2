//! Gemini generateContent provider

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationResult, LanguageModel};
use crate::config::LlmConfig;

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiRequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiRequestContent {
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
struct GeminiRequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

pub struct GeminiClient {
    agent: ureq::Agent,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, api_key: Option<String>, timeout: Duration) -> Self {
        let agent_config = ureq::Agent::config_builder().timeout_global(Some(timeout)).build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        }
    }
}

impl LanguageModel for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| eyre::eyre!("Missing API key for Gemini provider"))?;

        log::debug!("Generating with Gemini {}", self.model);

        let request = GeminiRequest {
            contents: vec![GeminiRequestContent {
                parts: vec![GeminiRequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, api_key
        );

        let request_body = serde_json::to_string(&request).context("Failed to serialize request")?;

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())
            .context("Failed to call Gemini API")?;

        let response_body = response
            .body_mut()
            .read_to_string()
            .context("Failed to read response")?;
        let response: GeminiResponse = serde_json::from_str(&response_body).context("Failed to parse Gemini response")?;

        let text: String = response
            .candidates
            .iter()
            .flat_map(|c| &c.content.parts)
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            eyre::bail!("No text in Gemini response");
        }

        Ok(GenerationResult::new(text.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_parts_are_joined() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"我是"},{"text":"Maya。"}]}}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        let text: String = response
            .candidates
            .iter()
            .flat_map(|c| &c.content.parts)
            .filter_map(|p| p.text.as_deref())
            .collect();
        assert_eq!(text, "我是Maya。");
    }

    #[test]
    fn test_generate_without_key_fails() {
        let client = GeminiClient::new(&LlmConfig::default(), None, Duration::from_secs(1));
        assert!(client.generate("hi").is_err());
    }
}
