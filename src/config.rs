use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main persona-qa configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    pub persona: PersonaConfig,
    pub services: ServicesConfig,
    pub images: ImagesConfig,
    pub llm: LlmConfig,
    pub keywords: KeywordsConfig,
    pub search: SearchConfig,
    pub cache: CacheConfig,
    pub history: HistoryConfig,
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Persona active at startup
    pub default_name: String,
    /// Entities each persona defers to regardless of power numbers
    pub dominant_relations: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub profile_base_url: String,
    pub power_base_url: String,
    pub search_base_url: String,
    pub profile_path: String,
    pub names_path: String,
    pub power_path: String,
    pub weapons_path: String,
    pub search_path: String,
    /// Timeout applied to every outbound call
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// openai or gemini
    pub provider: String,
    pub model: String,
    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub embedding_model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonalKeywords {
    pub chinese: Vec<String>,
    pub english: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeywordsConfig {
    pub personal: PersonalKeywords,
    pub detailed: Vec<String>,
    pub self_personal: Vec<String>,
    pub people_search: Vec<String>,
    pub document: Vec<String>,
    pub combat: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub limit: usize,
    pub threshold: f32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Profile cache lifetime; unset keeps entries until explicitly cleared
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_turns: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub max_context_chars: usize,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            default_name: "Maya".to_string(),
            dominant_relations: HashMap::from([("Maya".to_string(), vec!["Wavo".to_string()])]),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            profile_base_url: "http://localhost:8080/tymb".to_string(),
            power_base_url: "http://localhost:8080".to_string(),
            search_base_url: "http://localhost:8000".to_string(),
            profile_path: "/profile".to_string(),
            names_path: "/names".to_string(),
            power_path: "/power".to_string(),
            weapons_path: "/weapons".to_string(),
            search_path: "/people/search".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://peoplesystem.tatdvsonorth.com/images/people".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.0,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PersonalKeywords {
    fn default() -> Self {
        Self {
            chinese: strings(&[
                "你", "妳", "誰", "身高", "體重", "身材", "年齡", "生日", "個性", "興趣", "喜歡", "討厭", "戰鬥",
                "戰力", "武器", "職業", "資料", "認識", "知道", "名字",
            ]),
            english: strings(&[
                "who", "you", "height", "weight", "age", "birthday", "personality", "likes", "dislikes", "power",
                "weapon", "profile", "name", "know",
            ]),
        }
    }
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            personal: PersonalKeywords::default(),
            detailed: strings(&["詳細", "完整", "全部資料", "所有資料", "full", "complete", "detailed"]),
            self_personal: strings(&[
                "你幾歲",
                "你的身高",
                "你的體重",
                "你的生日",
                "你的興趣",
                "你喜歡",
                "你討厭",
                "你的個性",
                "妳幾歲",
                "妳的身高",
                "妳喜歡",
                "your age",
                "your height",
                "your birthday",
                "do you like",
                "your personality",
            ]),
            people_search: strings(&[
                "哪些人",
                "有誰",
                "誰最",
                "找人",
                "角色",
                "最強",
                "最弱",
                "which characters",
                "who has",
                "strongest",
                "weakest",
                "people who",
            ]),
            document: strings(&["文章", "文件", "筆記", "document", "article", "note"]),
            combat: strings(&["戰鬥", "戰力", "最強", "最弱", "打架", "combat", "fight", "strongest", "weakest"]),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { limit: 5, threshold: 0.5 }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_turns: 50 }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { max_context_chars: 8000 }
    }
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl PersonaConfig {
    /// True when `persona` is configured to defer to `other`
    pub fn is_dominant(&self, persona: &str, other: &str) -> bool {
        self.dominant_relations
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(persona))
            .flat_map(|(_, names)| names)
            .any(|name| name.eq_ignore_ascii_case(other))
    }
}

impl KeywordsConfig {
    pub fn personal_keywords(&self) -> impl Iterator<Item = &String> {
        self.personal.chinese.iter().chain(self.personal.english.iter())
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let path = Self::expand_path(path);
            return Self::load_from_file(&path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Ok(env_path) = std::env::var("PERSONA_QA_CONFIG") {
            let path = Self::expand_path(Path::new(&env_path));
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from PERSONA_QA_CONFIG: {}", e);
                    }
                }
            }
        }

        if let Ok(dir) = std::env::var("PERSONA_QA_DIR") {
            let path = PathBuf::from(dir).join("persona-qa.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from PERSONA_QA_DIR: {}", e);
                    }
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("persona-qa").join("persona-qa.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./persona-qa.yaml (for development)
        let local_config = PathBuf::from("persona-qa.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Directory holding the config file and the optional `.env`
    pub fn config_dir() -> PathBuf {
        std::env::var("PERSONA_QA_DIR").map(PathBuf::from).unwrap_or_else(|_| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("persona-qa")
        })
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.persona.default_name, "Maya");
        assert_eq!(config.services.timeout_secs, 10);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.cache.ttl().is_none());
    }

    #[test]
    fn test_dominant_relation_is_case_insensitive() {
        let persona = PersonaConfig::default();
        assert!(persona.is_dominant("maya", "WAVO"));
        assert!(!persona.is_dominant("Maya", "Alice"));
        assert!(!persona.is_dominant("Wavo", "Maya"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
log_level: debug
persona:
  default_name: Sorane
cache:
  ttl_secs: 300
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.persona.default_name, "Sorane");
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.services.profile_path, "/profile");
        assert!(!config.keywords.detailed.is_empty());
    }

    #[test]
    fn test_personal_keywords_are_bilingual() {
        let keywords = KeywordsConfig::default();
        let all: Vec<&String> = keywords.personal_keywords().collect();
        assert!(all.iter().any(|k| k.as_str() == "身高"));
        assert!(all.iter().any(|k| k.as_str() == "who"));
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        assert_eq!(Config::expand_path(&path), PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(&PathBuf::from("~/test"));
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("test"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let yaml_str = serde_yaml::to_string(&config).expect("Failed to serialize");
        let parsed: Config = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert_eq!(parsed.persona.default_name, config.persona.default_name);
        assert_eq!(parsed.keywords.combat, config.keywords.combat);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let missing = PathBuf::from("/nonexistent/persona-qa.yaml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
