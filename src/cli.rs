use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "persona-qa",
    about = "Answer questions in character, grounded in per-entity profile data",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/persona-qa/logs/persona-qa.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to persona-qa.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer one question as a persona
    Ask {
        /// The question
        query: String,

        /// Persona to answer as (defaults to persona.default_name)
        #[arg(long, short = 'p')]
        persona: Option<String>,

        /// Document file used as context for generic questions
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,

        /// Directory searched recursively for .md and .txt documents
        #[arg(long)]
        docs_dir: Option<PathBuf>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Interactive conversation with one persona session
    Chat {
        /// Persona to start with
        #[arg(long, short = 'p')]
        persona: Option<String>,
    },

    /// Show detected names, flags and the chosen branch without generating
    Classify {
        /// The question
        query: String,

        #[arg(long, short = 'p')]
        persona: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print the profile summary of an entity
    Profile {
        /// Entity name
        name: String,

        #[arg(long, short = 'p')]
        persona: Option<String>,

        /// Omit the image-link block
        #[arg(long)]
        no_images: bool,
    },

    /// Compare an entity's power against the persona
    Power {
        /// Entity name
        name: String,

        #[arg(long, short = 'p')]
        persona: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },
}
