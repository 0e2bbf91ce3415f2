//! HTTP implementation of the collaborator services over a shared ureq agent

use eyre::{Context, Result};
use serde_json::Value;

use super::{PeopleSearch, PowerService, ProfileRecord, ProfileService, SearchHit, Weapon, parse_power};
use crate::config::ServicesConfig;

pub struct HttpServices {
    agent: ureq::Agent,
    config: ServicesConfig,
}

impl HttpServices {
    pub fn new(config: &ServicesConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            config: config.clone(),
        }
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    fn get_text(&self, url: &str, query: Option<(&str, &str)>) -> Result<String> {
        let mut request = self.agent.get(url);
        if let Some((key, value)) = query {
            request = request.query(key, value);
        }
        let mut response = request.call().with_context(|| format!("Failed to call {}", url))?;
        response.body_mut().read_to_string().context("Failed to read response")
    }
}

impl ProfileService for HttpServices {
    fn fetch_profile(&self, name: &str) -> Result<Option<ProfileRecord>> {
        let url = Self::url(&self.config.profile_base_url, &self.config.profile_path);
        let body = serde_json::json!({ "name": name }).to_string();

        let result = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes());

        let mut response = match result {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(404)) => {
                log::info!("Profile service has no record for {}", name);
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to fetch profile for {}", name)),
        };

        let text = response.body_mut().read_to_string().context("Failed to read profile response")?;
        let value: Value = serde_json::from_str(&text).context("Failed to parse profile response")?;
        let record = ProfileRecord::from_value(value);
        if record.is_none() {
            log::warn!("Profile response for {} is not an object", name);
        }
        Ok(record)
    }

    fn fetch_names(&self) -> Result<Vec<String>> {
        let url = Self::url(&self.config.profile_base_url, &self.config.names_path);
        let text = self.get_text(&url, None)?;
        serde_json::from_str(&text).context("Names roster is not a list of strings")
    }
}

impl PowerService for HttpServices {
    fn total_power(&self, name: &str) -> Result<Option<i64>> {
        let url = Self::url(&self.config.power_base_url, &self.config.power_path);
        let text = self.get_text(&url, Some(("name", name)))?;
        let power = parse_power(&text);
        if power.is_none() {
            log::warn!("Power response for {} is not an integer: {}", name, text.trim());
        }
        Ok(power)
    }

    fn weapons(&self, owner: &str) -> Result<Vec<Weapon>> {
        let url = Self::url(&self.config.power_base_url, &self.config.weapons_path);
        let text = self.get_text(&url, Some(("owner", owner)))?;
        serde_json::from_str(&text).context("Weapons response is not a list")
    }
}

impl PeopleSearch for HttpServices {
    fn search(&self, embedding: &[f32], limit: usize, threshold: f32, sort_by_power: bool) -> Result<Vec<SearchHit>> {
        let url = Self::url(&self.config.search_base_url, &self.config.search_path);
        let body = serde_json::json!({
            "embedding": embedding,
            "limit": limit,
            "threshold": threshold,
            "sort_by_power": sort_by_power,
        })
        .to_string();

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
            .context("Failed to call people search")?;

        let text = response.body_mut().read_to_string().context("Failed to read search response")?;
        serde_json::from_str(&text).context("Failed to parse search response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        assert_eq!(HttpServices::url("http://host/tymb/", "/profile"), "http://host/tymb/profile");
        assert_eq!(HttpServices::url("http://host", "/names"), "http://host/names");
    }

    #[test]
    fn test_unreachable_service_is_an_error() {
        let config = ServicesConfig {
            profile_base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..ServicesConfig::default()
        };
        let services = HttpServices::new(&config);
        assert!(services.fetch_profile("Wavo").is_err());
        assert!(services.fetch_names().is_err());
    }
}
