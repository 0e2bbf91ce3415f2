//! In-crate mock collaborators for unit tests

use eyre::Result;
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::llm::{Embedder, GenerationResult, LanguageModel};
use crate::resolver::EXTRACTION_INSTRUCTION;
use crate::services::{PeopleSearch, PowerService, ProfileRecord, ProfileService, SearchHit, Weapon};

/// Scripted language model
///
/// Name-extraction prompts get the extraction script; every other prompt
/// pops the next scripted answer, falling back to a fixed reply.
pub struct MockModel {
    extraction: RefCell<Result<String, String>>,
    answers: RefCell<VecDeque<Result<String, String>>>,
    prompts: RefCell<Vec<String>>,
}

impl MockModel {
    pub const DEFAULT_ANSWER: &'static str = "哼，就這樣。";

    pub fn new() -> Self {
        Self {
            extraction: RefCell::new(Ok(String::new())),
            answers: RefCell::new(VecDeque::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn extracts(self, names: &str) -> Self {
        *self.extraction.borrow_mut() = Ok(names.to_string());
        self
    }

    pub fn extraction_fails(self) -> Self {
        *self.extraction.borrow_mut() = Err("extraction timeout".to_string());
        self
    }

    pub fn answers(self, text: &str) -> Self {
        self.answers.borrow_mut().push_back(Ok(text.to_string()));
        self
    }

    pub fn answer_fails(self) -> Self {
        self.answers.borrow_mut().push_back(Err("generation timeout".to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }

    /// Prompts other than name extraction, in call order
    pub fn generation_prompts(&self) -> Vec<String> {
        self.prompts
            .borrow()
            .iter()
            .filter(|p| !p.starts_with(EXTRACTION_INSTRUCTION))
            .cloned()
            .collect()
    }
}

impl LanguageModel for MockModel {
    fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        self.prompts.borrow_mut().push(prompt.to_string());
        let scripted = if prompt.starts_with(EXTRACTION_INSTRUCTION) {
            self.extraction.borrow().clone()
        } else {
            self.answers
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::DEFAULT_ANSWER.to_string()))
        };
        scripted.map(GenerationResult::new).map_err(|e| eyre::eyre!(e))
    }
}

/// Profile service backed by an in-memory map, counting calls
pub struct MockProfiles {
    records: HashMap<String, ProfileRecord>,
    roster: Vec<String>,
    unreachable: bool,
    profile_calls: RefCell<HashMap<String, usize>>,
    roster_calls: Cell<usize>,
}

impl MockProfiles {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            roster: Vec::new(),
            unreachable: false,
            profile_calls: RefCell::new(HashMap::new()),
            roster_calls: Cell::new(0),
        }
    }

    /// Add a profile with the given gender attribute
    pub fn with(self, name: &str, gender: &str) -> Self {
        self.with_record(
            name,
            json!({
                "name": name,
                "gender": gender,
                "heightCm": 170,
                "personality": format!("自己對自己的認知：{name}很可靠;她人對自己的認知：{name}難以捉摸"),
            }),
        )
    }

    pub fn with_record(mut self, name: &str, value: Value) -> Self {
        if let Some(record) = ProfileRecord::from_value(value) {
            self.records.insert(name.to_lowercase(), record);
        }
        self
    }

    pub fn roster(mut self, names: &[&str]) -> Self {
        self.roster = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn profile_calls(&self, name: &str) -> usize {
        self.profile_calls.borrow().get(name).copied().unwrap_or(0)
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.get()
    }
}

impl ProfileService for MockProfiles {
    fn fetch_profile(&self, name: &str) -> Result<Option<ProfileRecord>> {
        *self.profile_calls.borrow_mut().entry(name.to_string()).or_insert(0) += 1;
        if self.unreachable {
            eyre::bail!("connection refused");
        }
        Ok(self.records.get(&name.to_lowercase()).cloned())
    }

    fn fetch_names(&self) -> Result<Vec<String>> {
        self.roster_calls.set(self.roster_calls.get() + 1);
        if self.unreachable {
            eyre::bail!("connection refused");
        }
        Ok(self.roster.clone())
    }
}

pub struct MockPower {
    powers: HashMap<String, i64>,
    weapons: HashMap<String, Vec<Weapon>>,
    unreachable: bool,
}

impl MockPower {
    pub fn new() -> Self {
        Self {
            powers: HashMap::new(),
            weapons: HashMap::new(),
            unreachable: false,
        }
    }

    pub fn with_power(mut self, name: &str, power: i64) -> Self {
        self.powers.insert(name.to_lowercase(), power);
        self
    }

    pub fn with_weapons(mut self, owner: &str, weapons: &[&str]) -> Self {
        let weapons = weapons
            .iter()
            .map(|w| Weapon {
                weapon: w.to_string(),
                attributes: None,
            })
            .collect();
        self.weapons.insert(owner.to_lowercase(), weapons);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

impl PowerService for MockPower {
    fn total_power(&self, name: &str) -> Result<Option<i64>> {
        if self.unreachable {
            eyre::bail!("connection refused");
        }
        Ok(self.powers.get(&name.to_lowercase()).copied())
    }

    fn weapons(&self, owner: &str) -> Result<Vec<Weapon>> {
        if self.unreachable {
            eyre::bail!("connection refused");
        }
        Ok(self.weapons.get(&owner.to_lowercase()).cloned().unwrap_or_default())
    }
}

pub struct MockSearch {
    hits: Vec<SearchHit>,
    fails: bool,
    sort_flags: RefCell<Vec<bool>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self {
            hits: Vec::new(),
            fails: false,
            sort_flags: RefCell::new(Vec::new()),
        }
    }

    pub fn hit(mut self, name: &str, similarity: f32, total_power: Option<i64>) -> Self {
        self.hits.push(SearchHit {
            name: name.to_string(),
            similarity,
            total_power,
        });
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails = true;
        self
    }

    /// `sort_by_power` flag of every search call
    pub fn sort_flags(&self) -> Vec<bool> {
        self.sort_flags.borrow().clone()
    }
}

impl PeopleSearch for MockSearch {
    fn search(&self, _embedding: &[f32], limit: usize, _threshold: f32, sort_by_power: bool) -> Result<Vec<SearchHit>> {
        self.sort_flags.borrow_mut().push(sort_by_power);
        if self.fails {
            eyre::bail!("search index offline");
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

pub struct MockEmbedder;

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.chars().count() as f32, 1.0, 0.0])
    }
}
