//! Name resolution
//!
//! Extracts the entities a question is about. After a cheap keyword gate the
//! extraction strategies run in priority order (model, who-is patterns,
//! roster scan) until one yields validated names, then identity and
//! second-person augmentation add the persona where the phrasing implies it.

use lazy_regex::regex_is_match;
use serde::Serialize;

use crate::config::Config;
use crate::error::Degradation;
use crate::llm::LanguageModel;
use crate::profile::ProfileResolver;
use crate::services::ProfileService;

pub mod classify;
pub mod patterns;

pub use classify::{QuestionClassification, QuestionKind};

use patterns::{contains_ignore_case, has_identity_pronoun, has_second_person, is_identity_question, who_is_names};

/// First line of the extraction prompt
pub const EXTRACTION_INSTRUCTION: &str = "請從下面的問題中找出所有人名。";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedName {
    pub name: String,
    pub is_self: bool,
    pub is_known: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub names: Vec<DetectedName>,
    pub classification: QuestionClassification,
    pub kind: QuestionKind,
    #[serde(skip)]
    pub degradations: Vec<Degradation>,
}

/// Per-call state shared by the extraction strategies
struct Extraction<'q> {
    persona: &'q str,
    query: &'q str,
    degradations: Vec<Degradation>,
}

type Strategy<'a> = fn(&NameResolver<'a>, &mut Extraction<'_>, &mut ProfileResolver) -> Option<Vec<String>>;

pub struct NameResolver<'a> {
    config: &'a Config,
    model: &'a dyn LanguageModel,
    profiles: &'a dyn ProfileService,
}

impl<'a> NameResolver<'a> {
    pub fn new(config: &'a Config, model: &'a dyn LanguageModel, profiles: &'a dyn ProfileService) -> Self {
        Self {
            config,
            model,
            profiles,
        }
    }

    /// Resolve the entities named by `query` and classify the question
    pub fn resolve(&self, cache: &mut ProfileResolver, persona: &str, query: &str) -> Resolution {
        let mut extraction = Extraction {
            persona,
            query,
            degradations: Vec::new(),
        };

        let names = if self.passes_keyword_gate(query) {
            self.extract(&mut extraction, cache)
        } else {
            log::debug!("No personal keyword in query, skipping name extraction");
            Vec::new()
        };

        let roster = if names.is_empty() { Vec::new() } else { cache.roster(self.profiles) };
        let detected: Vec<DetectedName> = names
            .into_iter()
            .map(|name| DetectedName {
                is_self: name.eq_ignore_ascii_case(persona),
                is_known: roster.iter().any(|known| known.eq_ignore_ascii_case(&name)),
                name,
            })
            .collect();

        let classified = classify::classify(query, persona, &detected, &self.config.keywords);
        log::info!(
            "Resolved {} name(s) for query, kind {}",
            detected.len(),
            classified.kind.label()
        );

        Resolution {
            names: detected,
            classification: classified.classification,
            kind: classified.kind,
            degradations: extraction.degradations,
        }
    }

    fn passes_keyword_gate(&self, query: &str) -> bool {
        self.config
            .keywords
            .personal_keywords()
            .any(|keyword| contains_ignore_case(query, keyword))
    }

    fn extract(&self, extraction: &mut Extraction<'_>, cache: &mut ProfileResolver) -> Vec<String> {
        let strategies: [(&str, Strategy<'a>); 3] = [
            ("model", Self::model_tier),
            ("pattern", Self::pattern_tier),
            ("roster", Self::roster_tier),
        ];

        let mut names = Vec::new();
        for (label, strategy) in strategies {
            if let Some(found) = strategy(self, &mut *extraction, &mut *cache)
                && !found.is_empty()
            {
                log::debug!("{} tier found {:?}", label, found);
                names = found;
                break;
            }
        }

        let persona = extraction.persona;
        if names.is_empty() && is_identity_question(extraction.query, persona) {
            names.push(persona.to_string());
        }
        if has_second_person(extraction.query) && !names.iter().any(|n| n.eq_ignore_ascii_case(persona)) {
            names.insert(0, persona.to_string());
        }

        dedup(names, persona)
    }

    fn model_tier(&self, extraction: &mut Extraction<'_>, _cache: &mut ProfileResolver) -> Option<Vec<String>> {
        let prompt = extraction_prompt(extraction.query);
        let response = match self.model.generate(&prompt) {
            Ok(result) => result.text,
            Err(e) => {
                log::warn!("Model-assisted name extraction failed: {}", e);
                extraction
                    .degradations
                    .push(Degradation::ExtractionDegraded(e.to_string()));
                return None;
            }
        };

        let mut accepted = Vec::new();
        for name in parse_name_list(&response) {
            if accepts_model_name(&name, extraction.persona, extraction.query) {
                accepted.push(name);
            } else {
                log::warn!("Rejected extracted name not present in query: {}", name);
                extraction
                    .degradations
                    .push(Degradation::ExtractionDegraded(format!("rejected {}", name)));
            }
        }
        Some(accepted)
    }

    fn pattern_tier(&self, extraction: &mut Extraction<'_>, _cache: &mut ProfileResolver) -> Option<Vec<String>> {
        let persona = extraction.persona;
        let names: Vec<String> = who_is_names(extraction.query, persona)
            .into_iter()
            .filter(|name| name == persona || contains_ignore_case(extraction.query, name))
            .collect();
        Some(names)
    }

    fn roster_tier(&self, extraction: &mut Extraction<'_>, cache: &mut ProfileResolver) -> Option<Vec<String>> {
        let names: Vec<String> = cache
            .known_names(self.profiles, extraction.persona)
            .into_iter()
            .filter(|name| contains_ignore_case(extraction.query, name))
            .collect();
        Some(names)
    }
}

fn extraction_prompt(query: &str) -> String {
    format!(
        "{EXTRACTION_INSTRUCTION}\n\
         只回傳問題中逐字出現的人名，以逗號分隔。\n\
         不要推測、翻譯或補充任何不在問題中的名字。\n\
         如果沒有人名，回傳空字串。\n\n\
         問題：{query}"
    )
}

/// Split a comma-separated model response into trimmed, unquoted names
pub fn parse_name_list(response: &str) -> Vec<String> {
    response
        .split([',', '，', '、', '\n'])
        .map(|part| {
            part.trim()
                .trim_matches(|c: char| "\"'「」『』`".contains(c))
                .trim()
                .to_string()
        })
        .filter(|part| !part.is_empty())
        .filter(|part| !regex_is_match!(r"(?i)^(none|n/?a|null|無|没有|沒有)$", part))
        .collect()
}

/// Keep a model-returned name only if the query backs it up
///
/// The persona passes when the query spells it or uses an identity pronoun.
/// Any other name must occur in the query, ignoring case.
pub fn accepts_model_name(name: &str, persona: &str, query: &str) -> bool {
    if name.eq_ignore_ascii_case(persona) {
        contains_ignore_case(query, persona) || has_identity_pronoun(query)
    } else {
        contains_ignore_case(query, name)
    }
}

/// Case-insensitive de-duplication in first-seen order; the persona keeps its configured spelling
fn dedup(names: Vec<String>, persona: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in names {
        let name = if name.eq_ignore_ascii_case(persona) {
            persona.to_string()
        } else {
            name
        };
        if !seen.iter().any(|s| s.eq_ignore_ascii_case(&name)) {
            seen.push(name);
        }
    }
    seen
}
