//! Vea CLI: the main entry point.
//!
//! Commands:
//! - `daily`: Brief for one day
//! - `weekly`: Review of one ISO week
//! - `prepare-event`: Preparation notes for a calendar event
//! - `doctor`: Check config and source directories
//! - `config`: Show or initialize the config file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

mod commands;
mod summarizer;

#[derive(Parser)]
#[command(
    name = "vea",
    about = "Vea — daily, weekly and meeting briefs from your own records",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.vea/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Flags shared by every brief-producing command.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Override the journal directory
    #[arg(long, value_name = "DIR")]
    pub journal_dir: Option<PathBuf>,

    /// Override the notes directory
    #[arg(long, value_name = "DIR")]
    pub notes_dir: Option<PathBuf>,

    /// Override the provider records directory (*.jsonl dumps)
    #[arg(long, value_name = "DIR")]
    pub records_dir: Option<PathBuf>,

    /// Keep every item instead of ranking and truncating
    #[arg(long)]
    pub full_context: bool,

    /// Focus terms replacing the ones derived from events, tasks and note
    /// names (comma-separated)
    #[arg(long, value_name = "TERMS", value_delimiter = ',')]
    pub focus: Vec<String>,

    /// Estimated tokens the ranked items outside the floor may use
    #[arg(long, value_name = "TOKENS")]
    pub token_budget: Option<usize>,

    /// Share the token budget across all kinds or apply it to each kind
    #[arg(long, value_enum)]
    pub budget_scope: Option<ScopeArg>,

    /// Leave out events whose title contains any of these keywords
    /// (comma-separated, added to the configured list)
    #[arg(long, value_name = "KEYWORDS", value_delimiter = ',')]
    pub event_blacklist: Vec<String>,

    /// Leave out timed events that already started when briefing today
    #[arg(long)]
    pub skip_past_events: bool,

    /// Print the context document instead of calling the summarizer
    #[arg(long)]
    pub no_summarize: bool,

    /// Output format for the context document
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    Global,
    Group,
}

impl From<ScopeArg> for vea_core::BudgetScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Global => Self::Global,
            ScopeArg::Group => Self::Group,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Brief for one day
    Daily {
        /// Date to brief (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Review of one ISO week
    Weekly {
        /// Week to review: 2025-W22, 2025-22, 22 or a date inside the week
        #[arg(long)]
        week: Option<String>,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Preparation notes for a calendar event
    PrepareEvent {
        /// `next`, `now`, or the event start as "YYYY-MM-DD HH:MM" / "HH:MM"
        #[arg(long, default_value = "next")]
        event: String,

        /// How far ahead `next` looks, in minutes
        #[arg(long, default_value_t = vea_context::event_window::DEFAULT_LOOKAHEAD_MINUTES)]
        lookahead_minutes: i64,

        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Check config and source directories
    Doctor,

    /// Show or initialize the config file
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,

        /// Print the config file path only
        #[arg(long, conflicts_with = "init")]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing; stdout carries only the brief
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Daily { date, sources } => {
            commands::daily::run(config_path, date, &sources).await?
        }
        Commands::Weekly { week, sources } => {
            commands::weekly::run(config_path, week.as_deref(), &sources).await?
        }
        Commands::PrepareEvent {
            event,
            lookahead_minutes,
            sources,
        } => commands::prepare_event::run(config_path, &event, lookahead_minutes, &sources).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Config { init, path } => {
            if path {
                commands::config_cmd::path(config_path).await?
            } else if init {
                commands::config_cmd::init(config_path).await?
            } else {
                commands::config_cmd::show(config_path).await?
            }
        }
    }

    Ok(())
}
