//! Power comparison between the persona and another entity
//!
//! The relation only steers the tone of the answer. It is recomputed for
//! every request because it depends on the active persona.

use serde::Serialize;
use std::fmt;

use crate::config::PersonaConfig;
use crate::services::PowerService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    /// The other entity is stronger than the persona
    Higher,
    Lower,
    Equal,
    Unknown,
}

impl Comparison {
    pub fn between(self_power: Option<i64>, target_power: Option<i64>) -> Self {
        match (self_power, target_power) {
            (Some(own), Some(target)) if target > own => Comparison::Higher,
            (Some(own), Some(target)) if target < own => Comparison::Lower,
            (Some(_), Some(_)) => Comparison::Equal,
            _ => Comparison::Unknown,
        }
    }

    /// Phrase used in prompt power lines
    pub fn describe(&self) -> &'static str {
        match self {
            Comparison::Higher => "比你強",
            Comparison::Lower => "比你弱",
            Comparison::Equal => "與你相當",
            Comparison::Unknown => "無法比較",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Comparison::Higher => "higher",
            Comparison::Lower => "lower",
            Comparison::Equal => "equal",
            Comparison::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerRelation {
    pub self_power: Option<i64>,
    pub target_power: Option<i64>,
    pub comparison: Comparison,
    pub weapon_info: String,
}

impl PowerRelation {
    /// One prompt line describing `name`'s power and inventory
    pub fn line(&self, name: &str) -> String {
        match self.target_power {
            Some(power) => format!(
                "- {}: 總戰力 {}（{}）, {}",
                name,
                power,
                self.comparison.describe(),
                self.weapon_info
            ),
            None => format!("- {}: 戰力信息獲取失敗", name),
        }
    }
}

fn fetch_power(service: &dyn PowerService, name: &str) -> Option<i64> {
    match service.total_power(name) {
        Ok(power) => power,
        Err(e) => {
            log::warn!("Failed to fetch power for {}: {}", name, e);
            None
        }
    }
}

fn weapon_info(service: &dyn PowerService, owner: &str) -> String {
    match service.weapons(owner) {
        Ok(weapons) if weapons.is_empty() => "沒有武器".to_string(),
        Ok(weapons) => {
            let names: Vec<&str> = weapons.iter().map(|w| w.weapon.as_str()).collect();
            format!("擁有武器: {}", names.join(", "))
        }
        Err(e) => {
            log::warn!("Failed to fetch weapons for {}: {}", owner, e);
            "武器信息獲取失敗".to_string()
        }
    }
}

/// Compare `other` against `persona`; failed or non-numeric lookups become unknown
pub fn compare(service: &dyn PowerService, persona: &str, other: &str) -> PowerRelation {
    let self_power = fetch_power(service, persona);
    let target_power = fetch_power(service, other);
    let comparison = Comparison::between(self_power, target_power);
    log::debug!(
        "Power {} {:?} vs {} {:?}: {}",
        persona,
        self_power,
        other,
        target_power,
        comparison
    );

    PowerRelation {
        self_power,
        target_power,
        comparison,
        weapon_info: weapon_info(service, other),
    }
}

/// How the persona speaks about another entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Submission,
    WaryRespect,
    Contempt,
    ColdParity,
}

impl Tone {
    /// Dominant relations override the power numbers
    pub fn for_relation(personas: &PersonaConfig, persona: &str, other: &str, comparison: Comparison) -> Self {
        if personas.is_dominant(persona, other) {
            return Tone::Submission;
        }
        match comparison {
            Comparison::Higher => Tone::WaryRespect,
            Comparison::Lower => Tone::Contempt,
            Comparison::Equal | Comparison::Unknown => Tone::ColdParity,
        }
    }

    pub fn instruction(&self, name: &str) -> String {
        match self {
            Tone::Submission => format!("面對 {name} 時，你完全順從與敬畏，語氣恭敬，絕不反駁。"),
            Tone::WaryRespect => format!("{name} 比你強，你保持警惕與尊重，語氣謹慎。"),
            Tone::Contempt => format!("{name} 比你弱，你毫不掩飾地輕蔑對方，語氣傲慢。"),
            Tone::ColdParity => format!("你與 {name} 不分高下或無從比較，語氣冷淡平視。"),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Tone::Submission => "complete submission",
            Tone::WaryRespect => "wary respect",
            Tone::Contempt => "unrestrained contempt",
            Tone::ColdParity => "cold parity",
        };
        write!(f, "{}", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPower;

    #[test]
    fn test_comparison_between() {
        assert_eq!(Comparison::between(Some(10), Some(20)), Comparison::Higher);
        assert_eq!(Comparison::between(Some(20), Some(10)), Comparison::Lower);
        assert_eq!(Comparison::between(Some(5), Some(5)), Comparison::Equal);
        assert_eq!(Comparison::between(None, Some(5)), Comparison::Unknown);
        assert_eq!(Comparison::between(Some(0), None), Comparison::Unknown);
    }

    #[test]
    fn test_compare_collects_weapons() {
        let power = MockPower::new()
            .with_power("Maya", 900)
            .with_power("Alice", 300)
            .with_weapons("Alice", &["短劍", "弓"]);
        let relation = compare(&power, "Maya", "Alice");
        assert_eq!(relation.comparison, Comparison::Lower);
        assert_eq!(relation.weapon_info, "擁有武器: 短劍, 弓");
        assert_eq!(relation.line("Alice"), "- Alice: 總戰力 300（比你弱）, 擁有武器: 短劍, 弓");
    }

    #[test]
    fn test_unreachable_power_service_is_unknown_not_zero() {
        let relation = compare(&MockPower::new().unreachable(), "Maya", "Alice");
        assert_eq!(relation.self_power, None);
        assert_eq!(relation.comparison, Comparison::Unknown);
        assert_eq!(relation.weapon_info, "武器信息獲取失敗");
        assert_eq!(relation.line("Alice"), "- Alice: 戰力信息獲取失敗");
    }

    #[test]
    fn test_tone_rule() {
        let personas = PersonaConfig::default();
        assert_eq!(Tone::for_relation(&personas, "Maya", "wavo", Comparison::Lower), Tone::Submission);
        assert_eq!(Tone::for_relation(&personas, "Maya", "Alice", Comparison::Higher), Tone::WaryRespect);
        assert_eq!(Tone::for_relation(&personas, "Maya", "Alice", Comparison::Lower), Tone::Contempt);
        assert_eq!(Tone::for_relation(&personas, "Maya", "Alice", Comparison::Unknown), Tone::ColdParity);
        assert_eq!(Tone::for_relation(&personas, "Wavo", "Maya", Comparison::Equal), Tone::ColdParity);
    }
}
