use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "Find and adapt recipes from a local corpus or the web", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Session snapshot file (defaults to CRAG_SESSION_FILE)
    #[arg(long, global = true)]
    pub session: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new search over the recipe corpus
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Fetch more corpus recipes not shown yet
    More,
    /// Search the web for the current query
    Web,
    /// Select a recipe by its number in the list
    Select { number: usize },
    /// Generate adaptation options for the selected recipe
    Adapt {
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },
    /// Replace the selected recipe with an adaptation option
    Use { number: usize },
    /// Print the selected recipe as formatted Markdown
    Format,
    /// Show the current session
    Show,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Converts a 1-based list number into an index.
pub fn list_index(number: usize) -> Option<usize> {
    number.checked_sub(1)
}

pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match cli.verbose {
        0 => "recipe_crag=info",
        1 => "recipe_crag=debug",
        _ => "recipe_crag=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
