//! Interactive chat on a single persona session

use colored::*;
use eyre::{Context, Result};
use std::io::{self, BufRead, Write};

use super::{Runtime, session};
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::session::PersonaSession;

enum Slash<'a> {
    Persona(&'a str),
    Refresh(&'a str),
    Clear,
    History,
    Exit,
    Help,
}

fn parse_slash(line: &str) -> Option<Slash<'_>> {
    let rest = line.strip_prefix('/')?;
    let (command, arg) = rest.split_once(' ').unwrap_or((rest, ""));
    let arg = arg.trim();
    Some(match command {
        "persona" if !arg.is_empty() => Slash::Persona(arg),
        "refresh" if !arg.is_empty() => Slash::Refresh(arg),
        "clear" => Slash::Clear,
        "history" => Slash::History,
        "exit" | "quit" => Slash::Exit,
        _ => Slash::Help,
    })
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  {:18} switch persona", "/persona NAME".cyan());
    println!("  {:18} drop the cached profile of NAME", "/refresh NAME".cyan());
    println!("  {:18} clear every profile cache", "/clear".cyan());
    println!("  {:18} show this session's questions", "/history".cyan());
    println!("  {:18} leave", "/exit".cyan());
}

fn print_history(session: &PersonaSession) {
    if session.history().is_empty() {
        println!("  {}", "(no questions yet)".dimmed());
        return;
    }
    for turn in session.history().turns() {
        println!(
            "  {} {}",
            turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
            turn.question
        );
    }
}

pub fn run(persona: Option<&str>, config: &Config) -> Result<()> {
    let runtime = Runtime::new(config)?;
    let pipeline = Pipeline::new(config, runtime.collaborators());
    let mut session = session(config, persona);

    println!(
        "{} Chatting with {} (type {} for commands)",
        "→".blue(),
        session.persona().cyan(),
        "/help".cyan()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}> ", session.persona().green());
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else { break };
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_slash(line) {
            Some(Slash::Persona(name)) => {
                if session.switch_persona(name) {
                    println!("{} Now answering as {}", "✓".green(), session.persona().cyan());
                }
            }
            Some(Slash::Refresh(name)) => {
                session.refresh(name);
                println!("{} Cleared cached profile for {}", "✓".green(), name.cyan());
            }
            Some(Slash::Clear) => {
                session.clear_caches();
                println!("{} Cleared all caches", "✓".green());
            }
            Some(Slash::History) => print_history(&session),
            Some(Slash::Exit) => break,
            Some(Slash::Help) => print_help(),
            None => match pipeline.answer(&mut session, line, &[]) {
                Ok(answer) => {
                    println!("{}", answer.answer);
                    println!();
                }
                Err(e) => {
                    log::error!("Chat answer failed: {:?}", e);
                    eprintln!("{} {}", "✗".red(), e);
                }
            },
        }
    }

    Ok(())
}
