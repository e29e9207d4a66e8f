use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;
use crate::remote::{HttpNotesApi, NotesApi};

pub mod commands;

use self::commands::{IdArgs, ListArgs, LoginArgs, NewArgs, SearchArgs, TagsArgs};

#[derive(Parser, Debug)]
#[command(
    name = "notedash",
    version,
    about = "Terminal dashboard for a remote notes service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTEDASH_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the notes service base URL (takes precedence over NOTEDASH_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive dashboard (default)
    Tui,
    /// Check credentials against the service
    Login(LoginArgs),
    /// Print notes, filtered by archive state and sorted
    List(ListArgs),
    /// Run a server-side search and print the matches
    Search(SearchArgs),
    /// Create a note, resolving tags by name
    New(NewArgs),
    /// Archive a note
    Archive(IdArgs),
    /// Move an archived note back to the active list
    Unarchive(IdArgs),
    /// Delete a note permanently
    Delete(IdArgs),
    /// Look up tags by exact name
    Tags(TagsArgs),
}

enum LogSink<'a> {
    Stderr,
    File(&'a Path),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let loader = ConfigLoader::discover(cli.config.clone())?;
    loader.paths().ensure_directories()?;
    let log_file = loader.paths().log_file();
    let sink = match command {
        Commands::Tui => LogSink::File(&log_file),
        _ => LogSink::Stderr,
    };
    init_tracing(&cli.log_level, sink)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    config
        .apply_api_url(cli.api_url.as_deref())
        .context("applying --api-url")?;
    tracing::debug!(base_url = %config.api.base_url, "configuration loaded");

    let config = Arc::new(config);
    let api: Arc<dyn NotesApi> = Arc::new(HttpNotesApi::new(config.api.base_url.clone()));
    match command {
        Commands::Tui => App::new(config, api).run(),
        Commands::Login(args) => commands::login(api.as_ref(), args),
        Commands::List(args) => commands::list_notes(&config, api.as_ref(), args),
        Commands::Search(args) => commands::search_notes(&config, api.as_ref(), args),
        Commands::New(args) => commands::new_note(api.as_ref(), args),
        Commands::Archive(args) => commands::archive(&config, api.as_ref(), args),
        Commands::Unarchive(args) => commands::unarchive(&config, api.as_ref(), args),
        Commands::Delete(args) => commands::delete(&config, api.as_ref(), args),
        Commands::Tags(args) => commands::find_tags(api.as_ref(), args),
    }
}

fn init_tracing(level: &str, sink: LogSink<'_>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match sink {
            LogSink::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogSink::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn no_subcommand_means_tui() {
        let cli = Cli::try_parse_from(["notedash"]).expect("parse");
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "notedash",
            "list",
            "--archived",
            "--sort",
            "title",
            "--api-url",
            "http://notes.test",
        ])
        .expect("parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://notes.test"));
        assert_matches!(cli.command, Some(Commands::List(args)) if args.archived);
    }

    #[test]
    fn search_requires_a_query_word() {
        assert!(Cli::try_parse_from(["notedash", "search"]).is_err());
    }
}
