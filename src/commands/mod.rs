use eyre::Result;

use crate::config::Config;
use crate::llm::{self, LanguageModel, openai::OpenAiClient};
use crate::pipeline::Collaborators;
use crate::services::http::HttpServices;
use crate::session::PersonaSession;

pub mod ask;
pub mod chat;
pub mod classify;
pub mod completions;
pub mod config;
pub mod power;
pub mod profile;

/// Production collaborators built from configuration
pub struct Runtime {
    model: Box<dyn LanguageModel>,
    embedder: OpenAiClient,
    services: HttpServices,
}

impl Runtime {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            model: llm::build_model(config)?,
            embedder: llm::build_embedder(config),
            services: HttpServices::new(&config.services),
        })
    }

    pub fn services(&self) -> &HttpServices {
        &self.services
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            model: self.model.as_ref(),
            embedder: &self.embedder,
            profiles: &self.services,
            power: &self.services,
            search: &self.services,
        }
    }
}

/// Session for `persona`, or the configured default
pub fn session(config: &Config, persona: Option<&str>) -> PersonaSession {
    match persona {
        Some(name) if !name.trim().is_empty() => PersonaSession::with_persona(config, name),
        _ => PersonaSession::new(config),
    }
}
