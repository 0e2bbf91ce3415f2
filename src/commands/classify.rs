use colored::*;
use eyre::Result;

use super::{Runtime, session};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::resolver::Resolution;

pub fn run(query: &str, persona: Option<&str>, format: OutputFormat, config: &Config) -> Result<()> {
    let runtime = Runtime::new(config)?;
    let mut session = session(config, persona);
    let resolution = Pipeline::new(config, runtime.collaborators()).classify(&mut session, query);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolution)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&resolution)?),
        OutputFormat::Text => print_text(&resolution, session.persona()),
    }
    Ok(())
}

fn flag(value: bool) -> ColoredString {
    if value { "yes".green() } else { "no".dimmed() }
}

fn print_text(resolution: &Resolution, persona: &str) {
    println!("{} {}", "persona:".bold(), persona.cyan());
    println!("{} {}", "kind:".bold(), resolution.kind.label().cyan());

    println!("{}", "names:".bold());
    if resolution.names.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in &resolution.names {
        let mut tags = Vec::new();
        if name.is_self {
            tags.push("self");
        }
        if name.is_known {
            tags.push("known");
        }
        println!("  {} {}", name.name, format!("[{}]", tags.join(", ")).dimmed());
    }

    let c = &resolution.classification;
    println!("{}", "flags:".bold());
    println!("  identity:      {}", flag(c.is_identity_question));
    println!("  recognition:   {}", flag(c.is_recognition_question));
    println!("  self-personal: {}", flag(c.is_self_personal_question));
    println!("  detailed:      {}", flag(c.requests_detailed_data));

    for degradation in &resolution.degradations {
        println!("{} {:?}", "⚠".yellow(), degradation);
    }
}
