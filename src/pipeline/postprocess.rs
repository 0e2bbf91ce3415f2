//! Deterministic transforms applied to model output
//!
//! Both transforms are idempotent: running them twice yields the same text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::profile::summary::IMAGE_LINKS_HEADING;
use crate::profile::{Gender, image_urls};

/// Replacement pairs applied on a line that mentions an entity of the given gender
fn pronoun_pairs(gender: Gender) -> &'static [(&'static str, &'static str)] {
    match gender {
        Gender::Female => &[
            ("himself", "herself"),
            ("Himself", "Herself"),
            ("him", "her"),
            ("Him", "Her"),
            ("his", "her"),
            ("His", "Her"),
            ("he", "she"),
            ("He", "She"),
        ],
        Gender::Male => &[
            ("herself", "himself"),
            ("Herself", "Himself"),
            ("hers", "his"),
            ("Hers", "His"),
            ("her", "his"),
            ("Her", "His"),
            ("she", "he"),
            ("She", "He"),
        ],
    }
}

/// Runs of ASCII letters; CJK text on either side counts as a boundary
static LATIN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());

fn correct_line(line: &str, gender: Gender) -> String {
    let corrected = match gender {
        Gender::Female => line.replace('他', "她"),
        Gender::Male => line.replace('她', "他"),
    };
    let pairs = pronoun_pairs(gender);
    LATIN_WORD
        .replace_all(&corrected, |caps: &Captures| {
            let word = &caps[0];
            pairs
                .iter()
                .find(|(wrong, _)| *wrong == word)
                .map_or_else(|| word.to_string(), |(_, right)| right.to_string())
        })
        .into_owned()
}

/// Fix opposite-gender pronouns on every line that names an entity
///
/// A line naming entities of different genders is left alone.
pub fn correct_pronouns(text: &str, entities: &[(String, Gender)]) -> String {
    text.split('\n')
        .map(|line| {
            let lowered = line.to_lowercase();
            let mentioned: Vec<Gender> = entities
                .iter()
                .filter(|(name, _)| !name.is_empty() && lowered.contains(&name.to_lowercase()))
                .map(|(_, gender)| *gender)
                .collect();
            match mentioned.first() {
                Some(gender) if mentioned.iter().all(|g| g == gender) => correct_line(line, *gender),
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_url_line(line: &str) -> bool {
    line.contains("http://") || line.contains("https://")
}

fn is_heading_line(line: &str) -> bool {
    let stripped = line
        .trim()
        .trim_start_matches(['-', '*', '#', '•', ' '])
        .trim_matches('*')
        .trim();
    stripped == IMAGE_LINKS_HEADING || stripped == IMAGE_LINKS_HEADING.trim_end_matches('：')
}

/// A line with nothing left but a bullet, a short label or empty markdown link syntax
static RESIDUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])?\s*(?:[^\s:：]{1,12}[:：])?\s*(?:!?\[[^\]]*\]\(\s*\))?\s*$").unwrap()
});

fn is_residue(line: &str) -> bool {
    RESIDUE.is_match(line)
}

/// Remove the persona's own image links
///
/// Lines emptied by the removal are dropped, and an image heading is dropped
/// when no link follows it any more.
pub fn strip_self_images(text: &str, image_base: &str, persona: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let mut stripped = line.to_string();
        for url in image_urls(image_base, persona) {
            if let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(&url))) {
                stripped = re.replace_all(&stripped, "").into_owned();
            }
        }
        if stripped != line && is_residue(&stripped) {
            continue;
        }
        lines.push(stripped);
    }

    let mut kept: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if is_heading_line(line) {
            let next = lines[i + 1..].iter().find(|l| !l.trim().is_empty());
            if !next.is_some_and(|l| is_url_line(l)) {
                continue;
            }
        }
        kept.push(line.clone());
    }

    let mut result = kept.join("\n");
    while result.contains("\n\n\n") {
        result = result.replace("\n\n\n", "\n\n");
    }
    result.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://img.example.com/people";

    #[test]
    fn test_correct_pronouns_female() {
        let text = "Alice很強，他的劍很快。\nHe says Alice trusts his sword.\n沒有提到名字的他。";
        let fixed = correct_pronouns(text, &[("Alice".to_string(), Gender::Female)]);
        assert_eq!(fixed, "Alice很強，她的劍很快。\nShe says Alice trusts her sword.\n沒有提到名字的他。");
    }

    #[test]
    fn test_correct_pronouns_male_and_idempotent() {
        let text = "Wavo說她自己不怕。she is calm, Wavo";
        let entities = [("Wavo".to_string(), Gender::Male)];
        let once = correct_pronouns(text, &entities);
        assert_eq!(once, "Wavo說他自己不怕。he is calm, Wavo");
        assert_eq!(correct_pronouns(&once, &entities), once);
    }

    #[test]
    fn test_correct_pronouns_next_to_cjk() {
        let male = [("Wavo".to_string(), Gender::Male)];
        assert_eq!(correct_pronouns("Wavo說she很強", &male), "Wavo說he很強");

        let female = [("Alice".to_string(), Gender::Female)];
        assert_eq!(correct_pronouns("Alice覺得his劍Himself最好", &female), "Alice覺得her劍Herself最好");
        assert_eq!(correct_pronouns("Alice在the castle", &female), "Alice在the castle");
    }

    #[test]
    fn test_mixed_gender_line_untouched() {
        let entities = [("Alice".to_string(), Gender::Female), ("Bob".to_string(), Gender::Male)];
        let text = "Alice和Bob，他和她。";
        assert_eq!(correct_pronouns(text, &entities), text);
    }

    #[test]
    fn test_strip_self_images_only_persona() {
        let text = format!(
            "我是Maya。\n\n圖片連結：\n{b}/Maya.png\n{b}/MayaFighting.png\n- 戰鬥：{b}/mayaruined.png\n{b}/RavishingMaya.png",
            b = BASE
        );
        let stripped = strip_self_images(&text, BASE, "Maya");
        assert_eq!(stripped, "我是Maya。");
        assert_eq!(strip_self_images(&stripped, BASE, "Maya"), stripped);
    }

    #[test]
    fn test_strip_self_images_keeps_other_entity_block() {
        let text = format!(
            "我是Maya。\n圖片連結：\n{b}/Maya.png\n\nWavo很強。\n圖片連結：\n{b}/Wavo.png\n{b}/WavoFighting.png",
            b = BASE
        );
        let stripped = strip_self_images(&text, BASE, "Maya");
        assert!(!stripped.contains("Maya.png"));
        assert!(stripped.contains(&format!("{}/Wavo.png", BASE)));
        assert_eq!(stripped.matches(IMAGE_LINKS_HEADING).count(), 1);
        assert_eq!(strip_self_images(&stripped, BASE, "Maya"), stripped);
    }
}
