//! Persona session state
//!
//! A session owns the active persona, its profile caches and the chat
//! history. Switching persona clears the self cache slot and the history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use crate::config::Config;
use crate::profile::ProfileResolver;

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded record of answered questions, oldest dropped first
#[derive(Debug, Clone)]
pub struct ChatHistory {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ChatHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    pub fn push(&mut self, question: &str, answer: &str) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(Turn {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

pub struct PersonaSession {
    persona: String,
    profiles: ProfileResolver,
    history: ChatHistory,
}

impl PersonaSession {
    /// Session for the configured default persona
    pub fn new(config: &Config) -> Self {
        Self::with_persona(config, &config.persona.default_name)
    }

    pub fn with_persona(config: &Config, persona: &str) -> Self {
        Self {
            persona: persona.trim().to_string(),
            profiles: ProfileResolver::new(config),
            history: ChatHistory::new(config.history.max_turns),
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Make `name` the active persona
    ///
    /// Returns false when `name` is already active. Other-entity cache entries
    /// survive the switch.
    pub fn switch_persona(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name == self.persona {
            return false;
        }
        log::info!("Switching persona from {} to {}", self.persona, name);
        self.profiles.clear_self();
        self.history.clear();
        self.persona = name.to_string();
        true
    }

    pub fn profiles(&self) -> &ProfileResolver {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut ProfileResolver {
        &mut self.profiles
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn record_turn(&mut self, question: &str, answer: &str) {
        self.history.push(question, answer);
    }

    pub fn refresh(&mut self, name: &str) {
        let persona = self.persona.clone();
        self.profiles.refresh(&persona, name);
    }

    pub fn clear_caches(&mut self) {
        self.profiles.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProfiles;

    #[test]
    fn test_history_is_bounded() {
        let mut history = ChatHistory::new(2);
        history.push("q1", "a1");
        history.push("q2", "a2");
        history.push("q3", "a3");
        let questions: Vec<&str> = history.turns().map(|t| t.question.as_str()).collect();
        assert_eq!(questions, vec!["q2", "q3"]);
    }

    #[test]
    fn test_switch_persona_clears_self_slot_and_history_only() {
        let config = Config::default();
        let profiles = MockProfiles::new().with("Maya", "F").with("Wavo", "M");
        let mut session = PersonaSession::new(&config);
        session.profiles_mut().get_summary(&profiles, "Maya", "Maya", false);
        session.profiles_mut().get_summary(&profiles, "Maya", "Wavo", true);
        session.record_turn("你是誰", "我是Maya");

        assert!(session.switch_persona("Wavo"));
        assert_eq!(session.persona(), "Wavo");
        assert!(!session.profiles().has_self());
        assert_eq!(session.profiles().cached_names(), vec!["wavo".to_string()]);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_switch_to_same_persona_is_noop() {
        let config = Config::default();
        let mut session = PersonaSession::new(&config);
        session.record_turn("q", "a");
        assert!(!session.switch_persona("Maya"));
        assert_eq!(session.history().len(), 1);
    }
}
