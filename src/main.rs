use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;
mod commands;
mod config;
mod error;
mod llm;
mod pipeline;
mod power;
mod profile;
mod prompt;
mod resolver;
mod services;
mod session;
#[cfg(test)]
mod testing;

use cli::{Cli, Commands, OutputFormat};
use config::{Config, LogLevel};

fn setup_logging(log_level: &LogLevel) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("persona-qa")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("persona-qa.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG env var takes precedence, otherwise use config log_level
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(match log_level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        });
    }

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    info!(
        "Log level: {} (from {})",
        log_level.as_filter(),
        if std::env::var("RUST_LOG").is_ok() { "RUST_LOG env" } else { "config" }
    );
    Ok(())
}

/// `--verbose` and `--quiet` override the configured level
fn effective_level(cli: &Cli, config: &Config) -> LogLevel {
    if cli.verbose {
        LogLevel::Debug
    } else if cli.quiet {
        LogLevel::Error
    } else {
        config.log_level
    }
}

fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Ask {
            query,
            persona,
            docs,
            docs_dir,
            format,
        } => commands::ask::run(
            &query,
            persona.as_deref(),
            &docs,
            docs_dir.as_ref(),
            OutputFormat::resolve(format),
            &config,
        ),
        Commands::Chat { persona } => commands::chat::run(persona.as_deref(), &config),
        Commands::Classify { query, persona, format } => {
            commands::classify::run(&query, persona.as_deref(), OutputFormat::resolve(format), &config)
        }
        Commands::Profile {
            name,
            persona,
            no_images,
        } => commands::profile::run(&name, persona.as_deref(), no_images, &config),
        Commands::Power { name, persona, format } => {
            commands::power::run(&name, persona.as_deref(), OutputFormat::resolve(format), &config)
        }
        Commands::Config { action } => commands::config::run(action, &config),
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration (before logging, so log messages in Config::load are silent)
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&effective_level(&cli, &config)).context("Failed to setup logging")?;

    info!("Starting persona-qa with config from: {:?}", cli.config);

    run(cli, config).context("Command failed")?;

    Ok(())
}
