use colored::*;
use eyre::{Context, Result};
use std::path::PathBuf;
use terminal_size::{Width, terminal_size};

use super::{Runtime, session};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::pipeline::{Answer, Pipeline, documents};

fn terminal_width() -> usize {
    terminal_size().map(|(Width(w), _)| w as usize).unwrap_or(80)
}

pub fn run(
    query: &str,
    persona: Option<&str>,
    docs: &[PathBuf],
    docs_dir: Option<&PathBuf>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let docs: Vec<PathBuf> = docs.iter().map(|p| Config::expand_path(p)).collect();
    let docs_dir = docs_dir.map(|p| Config::expand_path(p));
    let documents = documents::load(&docs, docs_dir.as_deref()).context("Failed to load documents")?;

    let runtime = Runtime::new(config)?;
    let mut session = session(config, persona);
    let answer = Pipeline::new(config, runtime.collaborators()).answer(&mut session, query, &documents)?;

    print_answer(&answer, format)
}

pub fn print_answer(answer: &Answer, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(answer)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(answer)?);
        }
        OutputFormat::Text => {
            println!("{}", answer.answer);
            println!("{}", "─".repeat(terminal_width().min(60)).dimmed());
            println!("{} {}", "branch:".dimmed(), answer.kind.cyan());
            if !answer.found_entities.is_empty() {
                println!("{} {}", "found:".dimmed(), answer.found_entities.join(", ").green());
            }
            if !answer.sources.is_empty() {
                println!("{}", "sources:".dimmed());
                for source in &answer.sources {
                    println!("  {}", source);
                }
            }
            for degradation in &answer.degradations {
                println!("{} {:?}", "⚠".yellow(), degradation);
            }
        }
    }
    Ok(())
}
