//! Language-model and embedding collaborators
//!
//! Every provider normalizes its response into a [`GenerationResult`] at the
//! call boundary so the pipeline never inspects provider-specific shapes.

use eyre::{Context, Result};
use std::fs;
use std::time::Duration;

use crate::config::{Config, LlmConfig};

pub mod gemini;
pub mod openai;

/// Text produced by one single-shot generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: String,
}

impl GenerationResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Single-shot text generation, no streaming
pub trait LanguageModel {
    fn generate(&self, prompt: &str) -> Result<GenerationResult>;
}

/// Query embedding for the people-search index
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Supported generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl std::str::FromStr for Provider {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            // DashScope/Qwen expose the same chat-completions shape
            "openai" | "qwen" | "openai-compatible" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            _ => eyre::bail!("Unknown provider: {}. Supported: openai, gemini", s),
        }
    }
}

/// Build the configured generation provider
pub fn build_model(config: &Config) -> Result<Box<dyn LanguageModel>> {
    let provider: Provider = config.llm.provider.parse()?;
    let api_key = resolve_api_key(&config.llm);
    if api_key.is_none() {
        log::warn!(
            "{} not set; generation calls will fail until an API key is configured",
            config.llm.api_key_env
        );
    }
    let timeout = config.services.timeout().max(Duration::from_secs(60));

    Ok(match provider {
        Provider::OpenAi => Box::new(openai::OpenAiClient::new(&config.llm, api_key, timeout)),
        Provider::Gemini => Box::new(gemini::GeminiClient::new(&config.llm, api_key, timeout)),
    })
}

/// Build the embedder used by the semantic people search
pub fn build_embedder(config: &Config) -> openai::OpenAiClient {
    openai::OpenAiClient::new(&config.llm, resolve_api_key(&config.llm), config.services.timeout())
}

/// Look up the API key in the environment, then in `<config dir>/.env`
pub fn resolve_api_key(llm: &LlmConfig) -> Option<String> {
    if let Ok(key) = std::env::var(&llm.api_key_env)
        && !key.trim().is_empty()
    {
        return Some(key);
    }

    let env_file = Config::config_dir().join(".env");
    if !env_file.exists() {
        return None;
    }

    match read_env_file(&env_file, &llm.api_key_env) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Failed to read {}: {}", env_file.display(), e);
            None
        }
    }
}

fn read_env_file(path: &std::path::Path, key: &str) -> Result<Option<String>> {
    let content = fs::read_to_string(path).context("Failed to read .env file")?;
    Ok(parse_env_value(&content, key))
}

fn parse_env_value(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.is_empty() {
            continue;
        }
        if let Some((k, value)) = line.split_once('=')
            && k.trim() == key
        {
            return Some(value.trim().trim_matches('"').trim_matches('\'').to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("Qwen".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("GEMINI".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("llama".parse::<Provider>().is_err());
    }

    #[test]
    fn test_parse_env_value() {
        let content = "# comment\nOTHER=1\nOPENAI_API_KEY=\"sk-test\"\n";
        assert_eq!(parse_env_value(content, "OPENAI_API_KEY"), Some("sk-test".to_string()));
        assert_eq!(parse_env_value(content, "MISSING"), None);
    }
}
