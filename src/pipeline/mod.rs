//! Question answering pipeline
//!
//! One call to [`Pipeline::answer`] resolves names, picks a branch from the
//! [`QuestionKind`], fills that branch's template, generates, and
//! post-processes the output. Upstream failures degrade the answer; only a
//! failed generation step is returned as an error.

use serde::Serialize;

use crate::config::Config;
use crate::error::{Degradation, PipelineError};
use crate::llm::{Embedder, LanguageModel};
use crate::power::{self, Comparison, Tone};
use crate::profile::summary::IMAGE_LINKS_HEADING;
use crate::profile::{Gender, ProfileResolver, image_block, image_urls};
use crate::prompt::{self, EntityBrief, PersonaBrief, PromptContext, SearchBrief};
use crate::resolver::{NameResolver, QuestionKind, Resolution};
use crate::services::{PeopleSearch, PowerService, ProfileService};
use crate::session::PersonaSession;

pub mod documents;
pub mod postprocess;

pub use documents::Document;

/// External collaborators used while answering
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub model: &'a dyn LanguageModel,
    pub embedder: &'a dyn Embedder,
    pub profiles: &'a dyn ProfileService,
    pub power: &'a dyn PowerService,
    pub search: &'a dyn PeopleSearch,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
    pub found_entities: Vec<String>,
    /// Branch that produced the answer
    pub kind: &'static str,
    pub degradations: Vec<Degradation>,
}

/// Branch output before post-processing
struct Draft {
    branch: &'static str,
    text: String,
    found: Vec<String>,
    sources: Vec<String>,
    /// Resolved non-persona entities with their genders
    genders: Vec<(String, Gender)>,
    self_resolved: bool,
    /// Returned verbatim, no post-processing
    verbatim: bool,
}

impl Draft {
    fn new(branch: &'static str, text: String) -> Self {
        Self {
            branch,
            text,
            found: Vec::new(),
            sources: Vec::new(),
            genders: Vec::new(),
            self_resolved: false,
            verbatim: false,
        }
    }
}

/// Per-request state threaded through the branches
struct Request<'r> {
    persona: &'r str,
    query: &'r str,
    cache: &'r mut ProfileResolver,
    degradations: Vec<Degradation>,
}

impl Request<'_> {
    fn degrade(&mut self, degradation: Degradation) {
        self.degradations.push(degradation);
    }
}

struct Resolved {
    brief: EntityBrief,
    gender: Gender,
}

/// "never heard of them" fragment for names without a profile
pub fn not_heard_fragment(missing: &[String]) -> String {
    match missing {
        [one] => format!("至於 {}？沒聽過這個人。", one),
        _ => format!("至於 {}？這些人都沒聽過。", missing.join(", ")),
    }
}

/// Opening line of a recognition answer for names that resolved
pub fn known_fragment(found: &[String]) -> String {
    match found {
        [one] => format!("認識啊，{} 我當然認識。", one),
        _ => format!("認識啊，{} 我都認識。", found.join(", ")),
    }
}

fn is_image_paragraph(paragraph: &str) -> bool {
    paragraph.trim_start().starts_with(IMAGE_LINKS_HEADING)
}

pub struct Pipeline<'a> {
    config: &'a Config,
    deps: Collaborators<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, deps: Collaborators<'a>) -> Self {
        Self { config, deps }
    }

    /// Resolve names and classify without generating an answer
    pub fn classify(&self, session: &mut PersonaSession, query: &str) -> Resolution {
        let persona = session.persona().to_string();
        NameResolver::new(self.config, self.deps.model, self.deps.profiles).resolve(
            session.profiles_mut(),
            &persona,
            query,
        )
    }

    /// Answer `query` as the session's persona
    pub fn answer(
        &self,
        session: &mut PersonaSession,
        query: &str,
        documents: &[Document],
    ) -> Result<Answer, PipelineError> {
        let persona = session.persona().to_string();
        let resolution = self.classify(session, query);
        log::info!("Answering as {} via {} branch", persona, resolution.kind.label());

        let mut request = Request {
            persona: &persona,
            query,
            cache: session.profiles_mut(),
            degradations: resolution.degradations.clone(),
        };

        let draft = match &resolution.kind {
            QuestionKind::EntityQuery {
                others,
                include_self,
                detailed: true,
            } => self.detailed_answer(&mut request, others, *include_self),
            QuestionKind::EntityQuery {
                others, include_self, ..
            } => self.entity_branch(&mut request, others, *include_self)?,
            QuestionKind::Identity => self.identity_branch(&mut request, "identity")?,
            QuestionKind::SelfPersonal => self.identity_branch(&mut request, "self_personal")?,
            QuestionKind::Recognition { candidates } => self.recognition_branch(&mut request, candidates)?,
            QuestionKind::SemanticSearch { combat } => match self.search_branch(&mut request, *combat)? {
                Some(draft) => draft,
                None => self.generic_branch(query, documents)?,
            },
            QuestionKind::GenericQa => self.generic_branch(query, documents)?,
        };
        let degradations = request.degradations;

        let text = if draft.verbatim {
            draft.text.clone()
        } else {
            self.postprocess(&persona, &draft)
        };
        session.record_turn(query, &text);

        Ok(Answer {
            answer: text,
            sources: draft.sources,
            found_entities: draft.found,
            kind: draft.branch,
            degradations,
        })
    }

    fn generate(&self, branch: &'static str, prompt: &str) -> Result<String, PipelineError> {
        log::debug!("{} prompt is {} chars", branch, prompt.chars().count());
        self.deps
            .model
            .generate(prompt)
            .map(|result| result.text)
            .map_err(|e| {
                log::error!("Generation failed in {} branch: {}", branch, e);
                PipelineError::generation(branch, e)
            })
    }

    fn persona_brief(&self, request: &mut Request<'_>) -> PersonaBrief {
        let lookup = request
            .cache
            .lookup(self.deps.profiles, request.persona, request.persona, false);
        if let Some(failure) = &lookup.failure {
            request.degrade(Degradation::UpstreamUnavailable(format!(
                "profile {}: {}",
                request.persona, failure
            )));
        }

        let record = lookup.record.as_ref();
        PersonaBrief {
            name: request.persona.to_string(),
            summary: lookup.summary.clone().unwrap_or_default(),
            gender: record.and_then(|r| r.gender()).and_then(|g| Gender::parse(&g)),
            personality: record.and_then(|r| r.personality()),
        }
    }

    /// Resolve every named non-persona entity with its power relation and tone
    fn resolve_others(&self, request: &mut Request<'_>, names: &[String]) -> (Vec<Resolved>, Vec<String>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for name in names {
            let lookup = request.cache.lookup(self.deps.profiles, request.persona, name, true);
            if let Some(failure) = &lookup.failure {
                request.degrade(Degradation::UpstreamUnavailable(format!("profile {}: {}", name, failure)));
            }
            let Some(summary) = lookup.summary.clone() else {
                log::info!("No profile for {}", name);
                request.degrade(Degradation::EntityNotFound(name.clone()));
                missing.push(name.clone());
                continue;
            };

            let relation = power::compare(self.deps.power, request.persona, &lookup.name);
            if relation.comparison == Comparison::Unknown {
                request.degrade(Degradation::RelationUnknown(lookup.name.clone()));
            }
            let tone = Tone::for_relation(&self.config.persona, request.persona, &lookup.name, relation.comparison);
            log::debug!("Tone for {} is {}", lookup.name, tone);

            found.push(Resolved {
                gender: Gender::of(lookup.record.as_ref()),
                brief: EntityBrief {
                    name: lookup.name,
                    summary,
                    relation,
                    tone,
                },
            });
        }

        (found, missing)
    }

    /// Restore the image block of every found entity whose links the model dropped
    ///
    /// With several entities the block goes right after the first paragraph
    /// naming that entity (and any blocks already placed there). A single
    /// entity, or one no paragraph names, gets its block at the end.
    fn ensure_image_blocks(&self, text: String, names: &[String]) -> String {
        let base = &self.config.images.base_url;
        let mut paragraphs: Vec<String> = text
            .trim_end()
            .split("\n\n")
            .map(str::to_string)
            .collect();

        for name in names {
            let joined = paragraphs.join("\n\n");
            if image_urls(base, name).iter().all(|url| joined.contains(url.as_str())) {
                continue;
            }

            let block = image_block(base, name).trim_end().to_string();
            let anchor = if names.len() > 1 {
                let lowered = name.to_lowercase();
                paragraphs
                    .iter()
                    .position(|p| !is_image_paragraph(p) && p.to_lowercase().contains(&lowered))
            } else {
                None
            };

            match anchor {
                Some(index) => {
                    let mut at = index + 1;
                    while at < paragraphs.len() && is_image_paragraph(&paragraphs[at]) {
                        at += 1;
                    }
                    log::debug!("Inserting missing image links for {} after paragraph {}", name, index);
                    paragraphs.insert(at, block);
                }
                None => {
                    log::debug!("Appending missing image links for {}", name);
                    paragraphs.push(block);
                }
            }
        }

        paragraphs.join("\n\n")
    }

    /// Raw summaries without generation, plus a "don't know" line per missing name
    fn detailed_answer(&self, request: &mut Request<'_>, others: &[String], include_self: bool) -> Draft {
        let mut parts = Vec::new();
        let mut found = Vec::new();
        let mut missing = Vec::new();

        if include_self {
            parts.push(self.persona_brief(request).summary);
            found.push(request.persona.to_string());
        }
        for name in others {
            let lookup = request.cache.lookup(self.deps.profiles, request.persona, name, true);
            if let Some(failure) = &lookup.failure {
                request.degrade(Degradation::UpstreamUnavailable(format!("profile {}: {}", name, failure)));
            }
            match lookup.summary {
                Some(summary) => {
                    parts.push(summary);
                    found.push(lookup.name);
                }
                None => {
                    request.degrade(Degradation::EntityNotFound(name.clone()));
                    missing.push(name.clone());
                }
            }
        }
        for name in &missing {
            parts.push(format!("我不知道 {} 是誰。", name));
        }

        let text = parts
            .iter()
            .map(|p| p.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n");
        Draft {
            found,
            self_resolved: include_self,
            verbatim: true,
            ..Draft::new("detailed", text)
        }
    }

    fn entity_branch(
        &self,
        request: &mut Request<'_>,
        others: &[String],
        include_self: bool,
    ) -> Result<Draft, PipelineError> {
        let persona = self.persona_brief(request);
        let (found, missing) = self.resolve_others(request, others);

        if found.is_empty() {
            let prompt = prompt::not_found(&persona, &missing, request.query);
            let generated = self.generate("not_found", &prompt)?;
            let text = format!("{}\n\n{}", generated.trim_end(), not_heard_fragment(&missing));
            return Ok(Draft {
                found: if include_self { vec![persona.name] } else { Vec::new() },
                self_resolved: include_self,
                ..Draft::new("not_found", text)
            });
        }

        let names: Vec<String> = found.iter().map(|r| r.brief.name.clone()).collect();
        let genders: Vec<(String, Gender)> = found.iter().map(|r| (r.brief.name.clone(), r.gender)).collect();
        let ctx = PromptContext {
            query: request.query,
            persona,
            entities: found.into_iter().map(|r| r.brief).collect(),
            include_self,
        };

        let (branch, prompt) = match (ctx.entities.len(), include_self) {
            (1, false) => ("single_character", prompt::single_character(&ctx)),
            (1, true) => ("self_and_other", prompt::self_and_other(&ctx)),
            _ => ("multi_character", prompt::multi_character(&ctx)),
        };
        let generated = self.generate(branch, &prompt)?;
        let mut text = self.ensure_image_blocks(generated, &names);
        if !missing.is_empty() {
            text = format!("{}\n\n{}", text.trim_end(), not_heard_fragment(&missing));
        }

        let mut found_entities = Vec::new();
        if include_self {
            found_entities.push(ctx.persona.name.clone());
        }
        found_entities.extend(names);

        Ok(Draft {
            found: found_entities,
            genders,
            self_resolved: include_self,
            ..Draft::new(branch, text)
        })
    }

    fn identity_branch(&self, request: &mut Request<'_>, branch: &'static str) -> Result<Draft, PipelineError> {
        let ctx = PromptContext {
            query: request.query,
            persona: self.persona_brief(request),
            entities: Vec::new(),
            include_self: true,
        };
        let text = self.generate(branch, &prompt::identity(&ctx))?;
        Ok(Draft {
            found: vec![ctx.persona.name],
            self_resolved: true,
            ..Draft::new(branch, text)
        })
    }

    fn recognition_branch(&self, request: &mut Request<'_>, candidates: &[String]) -> Result<Draft, PipelineError> {
        let others: Vec<String> = candidates
            .iter()
            .filter(|c| !c.eq_ignore_ascii_case(request.persona))
            .cloned()
            .collect();
        if others.is_empty() {
            return self.identity_branch(request, "identity");
        }

        let (found, missing) = self.resolve_others(request, &others);
        if found.is_empty() {
            let draft = Draft::new("recognition", not_heard_fragment(&missing));
            return Ok(Draft { verbatim: true, ..draft });
        }

        let names: Vec<String> = found.iter().map(|r| r.brief.name.clone()).collect();
        let genders: Vec<(String, Gender)> = found.iter().map(|r| (r.brief.name.clone(), r.gender)).collect();
        let ctx = PromptContext {
            query: request.query,
            persona: self.persona_brief(request),
            entities: found.into_iter().map(|r| r.brief).collect(),
            include_self: false,
        };
        let prompt = if ctx.entities.len() == 1 {
            prompt::single_character(&ctx)
        } else {
            prompt::multi_character(&ctx)
        };

        let generated = self.ensure_image_blocks(self.generate("recognition", &prompt)?, &names);
        let mut text = format!("{}\n\n{}", known_fragment(&names), generated.trim());
        if !missing.is_empty() {
            text = format!("{}\n\n{}", text.trim_end(), not_heard_fragment(&missing));
        }

        Ok(Draft {
            found: names,
            genders,
            ..Draft::new("recognition", text)
        })
    }

    /// `None` when the search cannot run or finds nobody resolvable
    fn search_branch(&self, request: &mut Request<'_>, combat: bool) -> Result<Option<Draft>, PipelineError> {
        let embedding = match self.deps.embedder.embed(request.query) {
            Ok(embedding) => embedding,
            Err(e) => {
                log::warn!("Failed to embed query for people search: {}", e);
                request.degrade(Degradation::UpstreamUnavailable(format!("embedding: {}", e)));
                return Ok(None);
            }
        };

        let search = &self.config.search;
        let hits = match self.deps.search.search(&embedding, search.limit, search.threshold, combat) {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("People search failed: {}", e);
                request.degrade(Degradation::UpstreamUnavailable(format!("people search: {}", e)));
                return Ok(None);
            }
        };

        let mut briefs = Vec::new();
        let mut genders = Vec::new();
        let mut self_resolved = false;
        for hit in hits {
            // The persona's own hit carries no image block and no pronoun rule
            let is_self = hit.name.trim().eq_ignore_ascii_case(request.persona);
            let lookup = request
                .cache
                .lookup(self.deps.profiles, request.persona, &hit.name, !is_self);
            let Some(summary) = lookup.summary else {
                request.degrade(Degradation::EntityNotFound(hit.name));
                continue;
            };
            if is_self {
                self_resolved = true;
            } else {
                genders.push((lookup.name.clone(), Gender::of(lookup.record.as_ref())));
            }
            briefs.push(SearchBrief {
                name: lookup.name,
                similarity: hit.similarity,
                total_power: hit.total_power,
                summary,
            });
        }
        if briefs.is_empty() {
            log::info!("People search found nobody resolvable, answering generically");
            return Ok(None);
        }

        let persona = self.persona_brief(request);
        let text = self.generate(
            "semantic_search",
            &prompt::people_search(&persona, &briefs, request.query),
        )?;
        Ok(Some(Draft {
            found: briefs.into_iter().map(|b| b.name).collect(),
            genders,
            self_resolved,
            ..Draft::new("semantic_search", text)
        }))
    }

    fn generic_branch(&self, query: &str, documents: &[Document]) -> Result<Draft, PipelineError> {
        let context = documents::build_context(documents, self.config.documents.max_context_chars);
        let text = self.generate("generic_qa", &prompt::generic_qa(&context, query))?;
        Ok(Draft {
            sources: documents.iter().map(|d| d.source.clone()).collect(),
            ..Draft::new("generic_qa", text)
        })
    }

    fn postprocess(&self, persona: &str, draft: &Draft) -> String {
        let mut text = draft.text.clone();
        let resolved = draft.genders.len() + usize::from(draft.self_resolved);
        if resolved > 1 && !draft.genders.is_empty() {
            text = postprocess::correct_pronouns(&text, &draft.genders);
        }
        if draft.self_resolved {
            text = postprocess::strip_self_images(&text, &self.config.images.base_url, persona);
        }
        text
    }
}
