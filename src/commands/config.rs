use colored::*;
use eyre::Result;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "persona-qa Configuration".bold());
            println!("  {}", Config::config_dir().display().to_string().dimmed());
            println!();

            println!("{}:", "persona".cyan());
            println!("  default_name: {}", config.persona.default_name);
            for (persona, dominant) in &config.persona.dominant_relations {
                println!("  defers: {} → {}", persona, dominant.join(", "));
            }
            println!();

            println!("{}:", "services".cyan());
            println!("  profile: {}", config.services.profile_base_url);
            println!("  power: {}", config.services.power_base_url);
            println!("  search: {}", config.services.search_base_url);
            println!("  timeout_secs: {}", config.services.timeout_secs);
            println!();

            println!("{}:", "llm".cyan());
            println!("  provider: {}", config.llm.provider);
            println!("  model: {}", config.llm.model);
            println!("  embedding_model: {}", config.llm.embedding_model);
            println!("  api_key_env: {}", config.llm.api_key_env);
            println!();

            println!("{}:", "cache".cyan());
            match config.cache.ttl_secs {
                Some(ttl) => println!("  ttl_secs: {}", ttl),
                None => println!("  ttl_secs: {}", "unbounded".dimmed()),
            }
            println!("  history.max_turns: {}", config.history.max_turns);
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    let value = match key {
        "log_level" | "log-level" => config.log_level.as_filter().to_string(),
        "persona.default_name" => config.persona.default_name.clone(),
        "services.profile_base_url" => config.services.profile_base_url.clone(),
        "services.power_base_url" => config.services.power_base_url.clone(),
        "services.search_base_url" => config.services.search_base_url.clone(),
        "services.timeout_secs" => config.services.timeout_secs.to_string(),
        "images.base_url" => config.images.base_url.clone(),
        "llm.provider" => config.llm.provider.clone(),
        "llm.model" => config.llm.model.clone(),
        "llm.base_url" => config.llm.base_url.clone().unwrap_or_default(),
        "llm.api_key_env" => config.llm.api_key_env.clone(),
        "llm.embedding_model" => config.llm.embedding_model.clone(),
        "llm.temperature" => config.llm.temperature.to_string(),
        "search.limit" => config.search.limit.to_string(),
        "search.threshold" => config.search.threshold.to_string(),
        "cache.ttl_secs" => config.cache.ttl_secs.map(|t| t.to_string()).unwrap_or_default(),
        "history.max_turns" => config.history.max_turns.to_string(),
        "documents.max_context_chars" => config.documents.max_context_chars.to_string(),
        _ => return None,
    };
    Some(value)
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_keys() {
        let config = Config::default();
        assert_eq!(lookup("persona.default_name", &config).as_deref(), Some("Maya"));
        assert_eq!(lookup("log-level", &config).as_deref(), Some("info"));
        assert_eq!(lookup("cache.ttl_secs", &config).as_deref(), Some(""));
        assert_eq!(lookup("search.limit", &config).as_deref(), Some("5"));
    }

    #[test]
    fn test_lookup_unknown_key() {
        assert!(lookup("paths.plugins", &Config::default()).is_none());
    }
}
