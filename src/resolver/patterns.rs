//! Fixed phrase patterns used by name resolution and classification

use once_cell::sync::Lazy;
use regex::Regex;

/// Pronouns that let the model-assisted tier return the persona name
/// even when the query never spells it out
pub const IDENTITY_PRONOUNS: &[&str] = &["你是", "你叫", "妳是", "妳叫", "我是誰", "我叫什麼"];

const CJK_SECOND_PERSON: &[char] = &['你', '妳'];

const IDENTITY_QUESTIONS: &[&str] = &[
    "你是誰",
    "你叫什麼",
    "妳是誰",
    "妳叫什麼",
    "who are you",
    "what's your name",
    "what is your name",
    "誰是ai",
    "ai是誰",
    "who is ai",
];

static WHO_IS_CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"誰是([A-Za-z\x{4e00}-\x{9fa5}、,，\s]+)").unwrap());
static WHO_IS_LATIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)who is ([A-Za-z\x{4e00}-\x{9fa5},\s]+)").unwrap());
static LIST_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:[、,，和及與&\s]|\band\b)+").unwrap());
static LATIN_SECOND_PERSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:you|u|your|yours|yourself)\b").unwrap());

static RECOGNITION: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"你認識(.+?)[嗎麼不？?]").unwrap(),
        Regex::new(r"你知道(.+?)[嗎麼不？?]").unwrap(),
        Regex::new(r"你見過(.+?)[嗎麼不？?]").unwrap(),
        Regex::new(r"你認識(.+?)$").unwrap(),
        Regex::new(r"你知道(.+?)$").unwrap(),
        Regex::new(r"你見過(.+?)$").unwrap(),
        Regex::new(r"^(.+?)是誰[？?]?$").unwrap(),
        Regex::new(r"(?i)do you know (.+?)[?？]?$").unwrap(),
        Regex::new(r"(?i)^who is (.+?)[?？]?$").unwrap(),
    ]
});

/// Trailing particles that end a captured CJK name
const NAME_TERMINATORS: &[char] = &['的', '嗎', '呢', '吧', '啊', '是', '有'];

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn contains_any(query: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| contains_ignore_case(query, k))
}

pub fn has_identity_pronoun(query: &str) -> bool {
    IDENTITY_PRONOUNS.iter().any(|p| query.contains(p))
}

pub fn has_second_person(query: &str) -> bool {
    query.contains(CJK_SECOND_PERSON) || LATIN_SECOND_PERSON.is_match(query)
}

fn is_second_person(word: &str) -> bool {
    let word = word.trim();
    word.chars().count() == 1 && word.contains(CJK_SECOND_PERSON)
        || LATIN_SECOND_PERSON.find(word).is_some_and(|m| m.as_str().len() == word.len())
}

/// "who are you" style questions, including "who is <persona>"
pub fn is_identity_question(query: &str, persona: &str) -> bool {
    let lowered = query.to_lowercase();
    let compact: String = lowered.chars().filter(|c| !c.is_whitespace()).collect();
    let persona = persona.to_lowercase();

    IDENTITY_QUESTIONS
        .iter()
        .any(|q| lowered.contains(q) || compact.contains(&q.replace(' ', "")))
        || compact.contains(&format!("誰是{}", persona))
        || lowered.contains(&format!("who is {}", persona))
}

fn split_list(captured: &str) -> impl Iterator<Item = &str> {
    LIST_SEPARATORS
        .split(captured)
        .map(|part| part.split(NAME_TERMINATORS).next().unwrap_or("").trim())
        .filter(|part| !part.is_empty())
}

/// Names from "who is X" / "誰是X" constructs, second-person pronouns mapped to the persona
pub fn who_is_names(query: &str, persona: &str) -> Vec<String> {
    let mut names = Vec::new();
    for pattern in [&*WHO_IS_CJK, &*WHO_IS_LATIN] {
        for caps in pattern.captures_iter(query) {
            let Some(captured) = caps.get(1) else { continue };
            for part in split_list(captured.as_str()) {
                if is_second_person(part) {
                    names.push(persona.to_string());
                } else {
                    names.push(part.to_string());
                }
            }
        }
    }
    names
}

/// First letter upper, the rest lower, punctuation and whitespace removed
pub fn normalize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation() && !"？！。，、；：「」『』（）".contains(*c))
        .collect();
    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Candidates from "do you know X" style questions, normalized and de-duplicated
pub fn recognition_candidates(query: &str) -> Vec<String> {
    let query = query.trim();
    let Some(captured) = RECOGNITION
        .iter()
        .find_map(|pattern| pattern.captures(query).and_then(|caps| caps.get(1)))
    else {
        return Vec::new();
    };

    let mut candidates: Vec<String> = Vec::new();
    for part in LIST_SEPARATORS.split(captured.as_str()) {
        if is_second_person(part) {
            continue;
        }
        let name = normalize_name(part);
        if name.is_empty() || name.chars().all(|c| CJK_SECOND_PERSON.contains(&c) || NAME_TERMINATORS.contains(&c)) {
            continue;
        }
        if !candidates.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
            candidates.push(name);
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_who_is_cjk_list() {
        assert_eq!(who_is_names("誰是Alice和Bob", "Maya"), vec!["Alice", "Bob"]);
        assert_eq!(who_is_names("誰是Alice、Bob", "Maya"), vec!["Alice", "Bob"]);
        assert_eq!(who_is_names("誰是Wavo的主人", "Maya"), vec!["Wavo"]);
    }

    #[test]
    fn test_who_is_latin_list() {
        assert_eq!(who_is_names("who is Alice and Bob", "Maya"), vec!["Alice", "Bob"]);
        assert_eq!(who_is_names("Who is you", "Maya"), vec!["Maya"]);
    }

    #[test]
    fn test_second_person_detection() {
        assert!(has_second_person("你好"));
        assert!(has_second_person("Are you there"));
        assert!(!has_second_person("youth league"));
        assert!(!has_second_person("Wavo的身高"));
    }

    #[test]
    fn test_identity_question() {
        assert!(is_identity_question("你是誰", "Maya"));
        assert!(is_identity_question("Who are you?", "Maya"));
        assert!(is_identity_question("誰是 Maya", "Maya"));
        assert!(is_identity_question("who is maya", "Maya"));
        assert!(!is_identity_question("誰是Wavo", "Maya"));
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(" tsubasa? "), "Tsubasa");
        assert_eq!(normalize_name("WAVO"), "Wavo");
        assert_eq!(normalize_name("「翼」"), "翼");
    }

    #[test]
    fn test_recognition_candidates() {
        assert_eq!(recognition_candidates("你認識Tsubasa嗎？"), vec!["Tsubasa"]);
        assert_eq!(recognition_candidates("你知道alice和BOB嗎"), vec!["Alice", "Bob"]);
        assert_eq!(recognition_candidates("do you know tsubasa?"), vec!["Tsubasa"]);
        assert!(recognition_candidates("你是誰").is_empty());
        assert!(recognition_candidates("今天天氣如何").is_empty());
        assert!(recognition_candidates("你知道嗎").is_empty());
    }
}
