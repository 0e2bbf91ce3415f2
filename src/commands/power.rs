use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::power::{self, Comparison, PowerRelation, Tone};
use crate::services::http::HttpServices;

#[derive(Serialize)]
struct PowerReport<'a> {
    persona: &'a str,
    name: &'a str,
    #[serde(flatten)]
    relation: PowerRelation,
    tone: Tone,
}

pub fn run(name: &str, persona: Option<&str>, format: OutputFormat, config: &Config) -> Result<()> {
    let services = HttpServices::new(&config.services);
    let persona = persona.unwrap_or(&config.persona.default_name);

    let relation = power::compare(&services, persona, name);
    let tone = Tone::for_relation(&config.persona, persona, name, relation.comparison);
    let report = PowerReport {
        persona,
        name,
        relation,
        tone,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => {
            let show = |power: Option<i64>| power.map(|p| p.to_string()).unwrap_or_else(|| "unknown".to_string());
            let comparison = match report.relation.comparison {
                Comparison::Higher => "higher".red(),
                Comparison::Lower => "lower".green(),
                Comparison::Equal => "equal".yellow(),
                Comparison::Unknown => "unknown".dimmed(),
            };
            println!("{} {}", persona.cyan(), show(report.relation.self_power));
            println!("{} {}", name.cyan(), show(report.relation.target_power));
            println!("{} {}", "comparison:".bold(), comparison);
            println!("{} {}", "weapons:".bold(), report.relation.weapon_info);
            println!("{} {}", "tone:".bold(), report.tone);
        }
    }
    Ok(())
}
