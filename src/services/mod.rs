//! External collaborator contracts
//!
//! The profile, power/weapon and people-search services are consumed through
//! these traits. [`http::HttpServices`] is the production implementation.

use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod http;

/// Profile record as returned by the profile lookup service
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProfileRecord {
    fields: Map<String, Value>,
}

impl ProfileRecord {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Raw field value rendered as display text, if present and non-null
    pub fn get(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join("、"),
            ),
            other => Some(other.to_string()),
        }
    }

    /// Field value or the `N/A` placeholder used by the summary template
    pub fn field(&self, key: &str) -> String {
        self.get(key).unwrap_or_else(|| "N/A".to_string())
    }

    pub fn name(&self) -> Option<String> {
        self.get("name")
    }

    pub fn gender(&self) -> Option<String> {
        self.get("gender")
    }

    pub fn personality(&self) -> Option<String> {
        self.get("personality")
    }
}

/// One inventory entry from the weapon service
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Weapon {
    pub weapon: String,
    #[serde(default)]
    pub attributes: Option<Value>,
}

/// Ranked match from the people-embedding index
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    pub name: String,
    pub similarity: f32,
    #[serde(default, alias = "totalPower")]
    pub total_power: Option<i64>,
}

pub trait ProfileService {
    /// `Ok(None)` when the service reports the entity does not exist
    fn fetch_profile(&self, name: &str) -> Result<Option<ProfileRecord>>;

    /// Roster of every known entity name
    fn fetch_names(&self) -> Result<Vec<String>>;
}

pub trait PowerService {
    /// `Ok(None)` when the service answers with something that is not an integer
    fn total_power(&self, name: &str) -> Result<Option<i64>>;

    fn weapons(&self, owner: &str) -> Result<Vec<Weapon>>;
}

pub trait PeopleSearch {
    fn search(&self, embedding: &[f32], limit: usize, threshold: f32, sort_by_power: bool) -> Result<Vec<SearchHit>>;
}

/// Interpret a power response body: a bare integer or a JSON integer
pub fn parse_power(body: &str) -> Option<i64> {
    let trimmed = body.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_field_rendering() {
        let record = ProfileRecord::from_value(json!({
            "name": "Wavo",
            "heightCm": 185,
            "likes": ["swords", "tea"],
            "dislikes": null,
            "job": ""
        }))
        .unwrap();

        assert_eq!(record.name().as_deref(), Some("Wavo"));
        assert_eq!(record.field("heightCm"), "185");
        assert_eq!(record.field("likes"), "swords、tea");
        assert_eq!(record.field("dislikes"), "N/A");
        assert_eq!(record.field("job"), "N/A");
        assert_eq!(record.field("missing"), "N/A");
    }

    #[test]
    fn test_record_rejects_non_object() {
        assert!(ProfileRecord::from_value(json!(["Wavo"])).is_none());
    }

    #[test]
    fn test_parse_power() {
        assert_eq!(parse_power("1200"), Some(1200));
        assert_eq!(parse_power(" 42\n"), Some(42));
        assert_eq!(parse_power("\"strong\""), None);
        assert_eq!(parse_power("{\"power\": 3}"), None);
        assert_eq!(parse_power(""), None);
    }

    #[test]
    fn test_search_hit_accepts_camel_case_power() {
        let hit: SearchHit = serde_json::from_value(json!({"name": "Alice", "similarity": 0.8, "totalPower": 90})).unwrap();
        assert_eq!(hit.total_power, Some(90));
    }
}
