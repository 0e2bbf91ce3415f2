//! Profile resolution and caching
//!
//! The resolver keeps three caches: a self slot for the active persona, a
//! name-keyed map for every other entity and the known-names roster. Only
//! successful fetches are cached. Entries live until explicitly cleared
//! unless `cache.ttl_secs` is configured.

use eyre::Result;
use indexmap::IndexMap;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::services::{ProfileRecord, ProfileService};

pub mod summary;

pub use summary::{Gender, PersonalityView, image_block, image_urls, personality_view};

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> Cached<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        ttl.is_none_or(|ttl| self.fetched_at.elapsed() < ttl)
    }
}

/// Outcome of resolving one entity
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Canonical spelling used for headings and image links
    pub name: String,
    pub summary: Option<String>,
    pub record: Option<ProfileRecord>,
    /// Set when the profile service could not be asked
    pub failure: Option<String>,
}

pub struct ProfileResolver {
    image_base: String,
    ttl: Option<Duration>,
    self_slot: Option<Cached<ProfileRecord>>,
    others: IndexMap<String, Cached<ProfileRecord>>,
    roster: Option<Cached<Vec<String>>>,
}

/// Name used for image links and headings: the record's own name when it has one
pub fn canonical_name(record: &ProfileRecord, requested: &str) -> String {
    record.name().unwrap_or_else(|| requested.to_string())
}

fn is_persona(persona: &str, name: &str) -> bool {
    persona.eq_ignore_ascii_case(name.trim())
}

impl ProfileResolver {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(&config.images.base_url, config.cache.ttl())
    }

    pub fn with_settings(image_base: &str, ttl: Option<Duration>) -> Self {
        Self {
            image_base: image_base.to_string(),
            ttl,
            self_slot: None,
            others: IndexMap::new(),
            roster: None,
        }
    }

    /// Profile record for `name`
    ///
    /// `Ok(None)` means the service has no such entity, `Err` means it could
    /// not be asked. Neither outcome is cached.
    pub fn record(&mut self, service: &dyn ProfileService, persona: &str, name: &str) -> Result<Option<ProfileRecord>> {
        let name = name.trim();
        if is_persona(persona, name) {
            if let Some(cached) = &self.self_slot
                && cached.is_fresh(self.ttl)
            {
                return Ok(Some(cached.value.clone()));
            }
            let fetched = service.fetch_profile(persona)?;
            if let Some(record) = &fetched {
                log::debug!("Cached self profile for {}", persona);
                self.self_slot = Some(Cached::new(record.clone()));
            }
            return Ok(fetched);
        }

        let key = name.to_lowercase();
        if let Some(cached) = self.others.get(&key)
            && cached.is_fresh(self.ttl)
        {
            return Ok(Some(cached.value.clone()));
        }

        let fetched = service.fetch_profile(name)?;
        match &fetched {
            Some(record) => {
                log::debug!("Cached profile for {}", name);
                self.others.insert(key, Cached::new(record.clone()));
            }
            None => {
                self.others.shift_remove(&key);
            }
        }
        Ok(fetched)
    }

    /// Resolve `name` into its summary, keeping the record and any failure
    ///
    /// The persona always gets a summary: a failed self fetch yields the
    /// unavailable placeholder. Other entities that cannot be resolved have none.
    pub fn lookup(&mut self, service: &dyn ProfileService, persona: &str, name: &str, include_images: bool) -> Lookup {
        let requested = name.trim();
        let images = include_images.then_some(self.image_base.clone());
        let is_self = is_persona(persona, requested);

        let (record, failure) = match self.record(service, persona, requested) {
            Ok(record) => (record, None),
            Err(e) => {
                if is_self {
                    log::error!("Failed to fetch persona profile for {}: {}", persona, e);
                } else {
                    log::warn!("Failed to fetch profile for {}: {}", requested, e);
                }
                (None, Some(e.to_string()))
            }
        };

        let name = match &record {
            Some(record) if !is_self => canonical_name(record, requested),
            _ if is_self => persona.to_string(),
            _ => requested.to_string(),
        };
        let summary = match &record {
            Some(record) => Some(summary::render(record, &name, images.as_deref())),
            None if is_self => {
                if failure.is_none() {
                    log::warn!("Profile service has no record for persona {}", persona);
                }
                Some(summary::unavailable_placeholder(persona))
            }
            None => None,
        };

        Lookup {
            name,
            summary,
            record,
            failure,
        }
    }

    /// Formatted summary for `name`, `None` only for unresolvable non-persona entities
    pub fn get_summary(
        &mut self,
        service: &dyn ProfileService,
        persona: &str,
        name: &str,
        include_images: bool,
    ) -> Option<String> {
        self.lookup(service, persona, name, include_images).summary
    }

    /// Roster of known entity names, fetched once and cached
    ///
    /// An unreachable roster service yields an empty list that is not cached.
    pub fn roster(&mut self, service: &dyn ProfileService) -> Vec<String> {
        if let Some(cached) = &self.roster
            && cached.is_fresh(self.ttl)
        {
            return cached.value.clone();
        }

        match service.fetch_names() {
            Ok(names) => {
                log::debug!("Cached roster with {} names", names.len());
                self.roster = Some(Cached::new(names.clone()));
                names
            }
            Err(e) => {
                log::warn!("Failed to fetch names roster: {}", e);
                Vec::new()
            }
        }
    }

    /// Roster without the persona itself
    pub fn known_names(&mut self, service: &dyn ProfileService, persona: &str) -> Vec<String> {
        self.roster(service)
            .into_iter()
            .filter(|name| !is_persona(persona, name))
            .collect()
    }

    /// Drop exactly the cache entry for `name`
    pub fn refresh(&mut self, persona: &str, name: &str) {
        if is_persona(persona, name) {
            self.clear_self();
        } else if self.others.shift_remove(&name.trim().to_lowercase()).is_some() {
            log::info!("Cleared cached profile for {}", name);
        }
    }

    pub fn clear_self(&mut self) {
        if self.self_slot.take().is_some() {
            log::info!("Cleared self profile cache");
        }
    }

    /// Empty every cache including the roster
    pub fn clear_all(&mut self) {
        self.self_slot = None;
        self.others.clear();
        self.roster = None;
        log::info!("Cleared all profile caches");
    }

    #[cfg(test)]
    pub fn cached_names(&self) -> Vec<String> {
        self.others.keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn has_self(&self) -> bool {
        self.self_slot.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProfiles;

    fn resolver() -> ProfileResolver {
        ProfileResolver::with_settings("https://img.example.com", None)
    }

    #[test]
    fn test_persona_summary_never_none() {
        let profiles = MockProfiles::new().unreachable();
        let mut resolver = resolver();
        let summary = resolver.get_summary(&profiles, "Maya", "Maya", false).unwrap();
        assert!(summary.contains("無法從 API 獲取最新資料"));

        let missing = MockProfiles::new();
        let summary = resolver.get_summary(&missing, "Maya", "maya", true).unwrap();
        assert!(summary.starts_with("Maya 的個人資料"));
    }

    #[test]
    fn test_missing_other_is_none() {
        let profiles = MockProfiles::new().with("Wavo", "M");
        let mut resolver = resolver();
        assert!(resolver.get_summary(&profiles, "Maya", "Nobody", true).is_none());
        assert!(resolver.get_summary(&profiles, "Maya", "Wavo", true).is_some());
    }

    #[test]
    fn test_other_profile_is_cached_case_insensitively() {
        let profiles = MockProfiles::new().with("Wavo", "M");
        let mut resolver = resolver();
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        resolver.get_summary(&profiles, "Maya", "wavo", false);
        assert_eq!(profiles.profile_calls("Wavo") + profiles.profile_calls("wavo"), 1);
    }

    #[test]
    fn test_refresh_forces_refetch() {
        let profiles = MockProfiles::new().with("Wavo", "M");
        let mut resolver = resolver();
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        resolver.refresh("Maya", "Wavo");
        assert!(resolver.cached_names().is_empty());
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        assert_eq!(profiles.profile_calls("Wavo"), 2);
    }

    #[test]
    fn test_failed_fetch_is_not_cached() {
        let profiles = MockProfiles::new();
        let mut resolver = resolver();
        resolver.get_summary(&profiles, "Maya", "Ghost", true);
        resolver.get_summary(&profiles, "Maya", "Ghost", true);
        assert_eq!(profiles.profile_calls("Ghost"), 2);
    }

    #[test]
    fn test_clear_self_keeps_others() {
        let profiles = MockProfiles::new().with("Maya", "F").with("Wavo", "M");
        let mut resolver = resolver();
        resolver.get_summary(&profiles, "Maya", "Maya", false);
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        assert!(resolver.has_self());

        resolver.clear_self();
        assert!(!resolver.has_self());
        assert_eq!(resolver.cached_names(), vec!["wavo".to_string()]);
    }

    #[test]
    fn test_clear_all_empties_roster() {
        let profiles = MockProfiles::new().with("Wavo", "M").roster(&["Maya", "Wavo"]);
        let mut resolver = resolver();
        assert_eq!(resolver.known_names(&profiles, "Maya"), vec!["Wavo".to_string()]);
        resolver.roster(&profiles);
        assert_eq!(profiles.roster_calls(), 1);

        resolver.clear_all();
        resolver.roster(&profiles);
        assert_eq!(profiles.roster_calls(), 2);
    }

    #[test]
    fn test_ttl_expires_entries() {
        let profiles = MockProfiles::new().with("Wavo", "M");
        let mut resolver = ProfileResolver::with_settings("https://img.example.com", Some(Duration::ZERO));
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        resolver.get_summary(&profiles, "Maya", "Wavo", true);
        assert_eq!(profiles.profile_calls("Wavo"), 2);
    }
}
