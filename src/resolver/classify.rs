//! Question classification
//!
//! Flags are derived from the query once and folded into a single
//! [`QuestionKind`] that drives prompt selection.

use serde::Serialize;

use super::DetectedName;
use super::patterns::{contains_any, is_identity_question, recognition_candidates};
use crate::config::KeywordsConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionClassification {
    pub is_identity_question: bool,
    pub is_recognition_question: bool,
    pub is_self_personal_question: bool,
    pub requests_detailed_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// At least one non-persona entity, or a detailed-data request naming only the persona
    EntityQuery {
        others: Vec<String>,
        include_self: bool,
        detailed: bool,
    },
    Identity,
    Recognition {
        candidates: Vec<String>,
    },
    SelfPersonal,
    SemanticSearch {
        combat: bool,
    },
    GenericQa,
}

impl QuestionKind {
    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::EntityQuery { .. } => "entity",
            QuestionKind::Identity => "identity",
            QuestionKind::Recognition { .. } => "recognition",
            QuestionKind::SelfPersonal => "self_personal",
            QuestionKind::SemanticSearch { .. } => "semantic_search",
            QuestionKind::GenericQa => "generic_qa",
        }
    }
}

pub struct Classified {
    pub classification: QuestionClassification,
    pub kind: QuestionKind,
}

/// Derive the flags and the branch for a query and its resolved names
pub fn classify(query: &str, persona: &str, names: &[DetectedName], keywords: &KeywordsConfig) -> Classified {
    let candidates = recognition_candidates(query);
    let classification = QuestionClassification {
        is_identity_question: is_identity_question(query, persona),
        is_recognition_question: !candidates.is_empty(),
        is_self_personal_question: contains_any(query, &keywords.self_personal),
        requests_detailed_data: contains_any(query, &keywords.detailed),
    };

    let others: Vec<String> = names.iter().filter(|n| !n.is_self).map(|n| n.name.clone()).collect();
    let include_self = names.iter().any(|n| n.is_self);

    let kind = if !others.is_empty() || (include_self && classification.requests_detailed_data) {
        QuestionKind::EntityQuery {
            others,
            include_self,
            detailed: classification.requests_detailed_data,
        }
    } else if classification.is_identity_question {
        QuestionKind::Identity
    } else if classification.is_recognition_question {
        QuestionKind::Recognition { candidates }
    } else if classification.is_self_personal_question {
        QuestionKind::SelfPersonal
    } else if contains_any(query, &keywords.people_search) && !contains_any(query, &keywords.document) {
        QuestionKind::SemanticSearch {
            combat: contains_any(query, &keywords.combat),
        }
    } else {
        QuestionKind::GenericQa
    };

    Classified { classification, kind }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(name: &str, is_self: bool) -> DetectedName {
        DetectedName {
            name: name.to_string(),
            is_self,
            is_known: true,
        }
    }

    fn kind(query: &str, names: &[DetectedName]) -> QuestionKind {
        classify(query, "Maya", names, &KeywordsConfig::default()).kind
    }

    #[test]
    fn test_other_entity_overrides_identity() {
        let names = [name("Maya", true), name("Wavo", false)];
        assert_eq!(
            kind("你是誰？你認識Wavo嗎", &names),
            QuestionKind::EntityQuery {
                others: vec!["Wavo".to_string()],
                include_self: true,
                detailed: false,
            }
        );
    }

    #[test]
    fn test_persona_only_identity() {
        assert_eq!(kind("你是誰", &[name("Maya", true)]), QuestionKind::Identity);
    }

    #[test]
    fn test_persona_only_detailed_is_entity_query() {
        let result = kind("給我你的完整資料", &[name("Maya", true)]);
        assert!(matches!(result, QuestionKind::EntityQuery { detailed: true, include_self: true, .. }));
    }

    #[test]
    fn test_recognition_without_names() {
        assert_eq!(
            kind("你認識Tsubasa嗎", &[name("Maya", true)]),
            QuestionKind::Recognition {
                candidates: vec!["Tsubasa".to_string()]
            }
        );
    }

    #[test]
    fn test_self_personal() {
        assert_eq!(kind("你的身高是多少", &[name("Maya", true)]), QuestionKind::SelfPersonal);
    }

    #[test]
    fn test_semantic_search_and_document_exclusion() {
        assert_eq!(kind("哪些人最強", &[]), QuestionKind::SemanticSearch { combat: true });
        assert_eq!(kind("哪些人寫過文章", &[]), QuestionKind::GenericQa);
    }

    #[test]
    fn test_generic_default() {
        assert_eq!(kind("今天的天氣如何", &[]), QuestionKind::GenericQa);
    }

    #[test]
    fn test_flags() {
        let result = classify("who are you? show complete data", "Maya", &[], &KeywordsConfig::default());
        assert!(result.classification.is_identity_question);
        assert!(result.classification.requests_detailed_data);
        assert!(!result.classification.is_recognition_question);
    }
}
