//! Scripto CLI
//!
//! Command-line interface for Scripto - browse, search, vote on and request
//! shared scripts.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scripto_core::{ApiClient, Config, SearchField, SearchQuery, VoteAction, VoteBoard};

mod commands;
mod editor;
mod output;

use commands::catalog::ManualEntry;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "scripto")]
#[command(about = "Scripto - share, find and vote on useful scripts")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all scripts
    #[command(alias = "ls")]
    List,
    /// Search scripts by field
    Search {
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        language: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Read query edits from stdin and search as you type
        #[arg(short, long)]
        interactive: bool,
    },
    /// Show a script with its content
    Show {
        /// Script ID (full UUID or prefix)
        id: String,
    },
    /// Upload a script file
    Upload {
        file: PathBuf,
        /// Fulfill this change request with the upload
        #[arg(short, long, value_name = "REQUEST_ID")]
        request: Option<String>,
    },
    /// Enter a script by hand
    Add {
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        language: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Explanation of how the script works
        #[arg(long)]
        how_it_works: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Read the script from a file (opens editor if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Like a script
    Like {
        /// Script ID (full UUID or prefix)
        id: String,
        /// Take back an earlier like
        #[arg(long)]
        undo: bool,
    },
    /// Dislike a script
    Dislike {
        /// Script ID (full UUID or prefix)
        id: String,
        /// Take back an earlier dislike
        #[arg(long)]
        undo: bool,
    },
    /// Show a script's vote counts
    Votes {
        /// Script ID (full UUID or prefix)
        id: String,
    },
    /// List all tags
    Tags,
    /// Most liked scripts
    Trending {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,
    },
    /// Most recently uploaded scripts
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,
    },
    /// Show catalog statistics
    Stats,
    /// Manage script requests
    Request {
        #[command(subcommand)]
        command: RequestCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum RequestCommands {
    /// Ask for a script that does not exist yet
    #[command(alias = "add")]
    Create {
        title: String,
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        language: Option<String>,
        /// Tags to add
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List script requests
    #[command(alias = "ls")]
    List,
    /// Fulfill a request
    Fulfill {
        /// Request ID (full UUID or prefix)
        id: String,
        /// Upload this file as the fulfilling script
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Follow the request list live
    Watch,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, ws_url, vote_mode, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without a reachable server
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let api = ApiClient::from_config(&config).context("Failed to create API client")?;

    match cli.command {
        Commands::List => commands::catalog::list(&api, &output).await,
        Commands::Search {
            title,
            language,
            tags,
            category,
            interactive,
        } => {
            let query = build_query(title, language, tags, category);
            if interactive {
                commands::search::interactive(&api, query, config.search_debounce(), &output).await
            } else {
                commands::search::run(&api, query, &output).await
            }
        }
        Commands::Show { id } => commands::catalog::show(&api, id, &output).await,
        Commands::Upload { file, request } => {
            commands::catalog::upload(&api, file, request, &output).await
        }
        Commands::Add {
            title,
            language,
            tag,
            description,
            how_it_works,
            category,
            file,
        } => {
            let entry = ManualEntry {
                title,
                language,
                tags: tag,
                description,
                how_it_works,
                category,
                file,
            };
            commands::catalog::add(&api, entry, &output).await
        }
        Commands::Like { id, undo } => {
            let board = VoteBoard::new(config.vote_mode);
            commands::vote::vote(&api, &board, id, VoteAction::Like, undo, &output).await
        }
        Commands::Dislike { id, undo } => {
            let board = VoteBoard::new(config.vote_mode);
            commands::vote::vote(&api, &board, id, VoteAction::Dislike, undo, &output).await
        }
        Commands::Votes { id } => {
            let board = VoteBoard::new(config.vote_mode);
            commands::vote::show(&api, &board, id, &output).await
        }
        Commands::Tags => commands::catalog::tags(&api, &output).await,
        Commands::Trending { limit } => commands::catalog::trending(&api, limit, &output).await,
        Commands::Recent { limit } => commands::catalog::recent(&api, limit, &output).await,
        Commands::Stats => commands::stats::show(&api, &output).await,
        Commands::Request { command } => {
            handle_request_command(command, &api, &config, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_request_command(
    command: RequestCommands,
    api: &ApiClient,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        RequestCommands::Create {
            title,
            description,
            language,
            tag,
        } => commands::request::create(api, title, description, language, tag, output).await,
        RequestCommands::List => commands::request::list(api, output).await,
        RequestCommands::Fulfill { id, file } => {
            commands::request::fulfill(api, id, file, output).await
        }
        RequestCommands::Watch => commands::request::watch(api, config, output).await,
    }
}

fn build_query(
    title: Option<String>,
    language: Option<String>,
    tags: Option<String>,
    category: Option<String>,
) -> SearchQuery {
    let mut query = SearchQuery::new();
    for (field, value) in [
        (SearchField::Title, title),
        (SearchField::Language, language),
        (SearchField::Tags, tags),
        (SearchField::Category, category),
    ] {
        if let Some(value) = value {
            query.set(field, value);
        }
    }
    query
}

/// Initialize logging
///
/// Only initializes if SCRIPTO_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("SCRIPTO_LOG") else {
        return;
    };

    if config.log_file.is_none() {
        if let Err(e) = config.ensure_data_dir() {
            eprintln!("Warning: {}", e);
            return;
        }
    }

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("scripto_core={},scripto={}", log_level, log_level));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
