pub mod config;
pub mod indexer;
pub mod loader;
pub mod model;
pub mod schema;
pub mod search;
pub mod storage;
pub mod ui;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use config::{Config, Overrides};
use search::SearchEngine;
use ui::prompt::{self, Session};
use ui::render::{self, Renderer};

/// Exit code for a rejected query (unknown entity, term or value).
pub const EXIT_QUERY_ERROR: u8 = 2;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "hds",
    version,
    about = "Exact-match search over helpdesk users, organizations and tickets"
)]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding users.json, organizations.json and tickets.json
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Users file, relative to the data dir unless absolute
    #[arg(long, global = true)]
    pub users: Option<PathBuf>,

    /// Organizations file, relative to the data dir unless absolute
    #[arg(long, global = true)]
    pub organizations: Option<PathBuf>,

    /// Tickets file, relative to the data dir unless absolute
    #[arg(long, global = true)]
    pub tickets: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive prompt on stdin/stdout (default)
    Interactive,
    /// Run one search and print the results
    Search {
        /// users, organizations or tickets
        entity: String,
        /// Attribute to match
        term: String,
        /// Value to match exactly; pass "" to find empty values
        value: String,

        /// Print results as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// List the searchable attributes of an entity
    Terms { entity: String },
    /// List the loaded entities
    Entities,
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate man page to stdout
    Man,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            data_dir: self.data_dir.clone(),
            users: self.users.clone(),
            organizations: self.organizations.clone(),
            tickets: self.tickets.clone(),
            no_color: self.no_color,
        }
    }
}

pub fn run() -> Result<ExitCode> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<ExitCode> {
    let overrides = cli.overrides();

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "hds", &mut io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Man => {
            let man = clap_mangen::Man::new(Cli::command());
            man.render(&mut io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Interactive => {
            let config = Config::resolve(&overrides)?;
            run_interactive(&config)
        }
        Commands::Search {
            entity,
            term,
            value,
            json,
        } => {
            let config = Config::resolve(&overrides)?;
            let engine = load_engine(&config)?;
            run_search(&engine, &config, &entity, &term, &value, json)
        }
        Commands::Terms { entity } => {
            let config = Config::resolve(&overrides)?;
            let engine = load_engine(&config)?;
            match engine.possible_terms(&entity) {
                Ok(terms) => {
                    let mut out = io::stdout().lock();
                    for term in terms {
                        writeln!(out, "{term}")?;
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => Ok(query_error(&err)),
            }
        }
        Commands::Entities => {
            let config = Config::resolve(&overrides)?;
            let engine = load_engine(&config)?;
            let mut out = io::stdout().lock();
            for kind in engine.list_records() {
                writeln!(out, "{kind}")?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_interactive(config: &Config) -> Result<ExitCode> {
    let stdout = io::stdout();
    let engine = prompt::startup(&mut stdout.lock(), config)?;
    let renderer = Renderer::new(config.color && stdout.is_terminal());
    Session::new(&engine, io::stdin().lock(), stdout.lock(), renderer).run()?;
    Ok(ExitCode::SUCCESS)
}

fn run_search(
    engine: &SearchEngine,
    config: &Config,
    entity: &str,
    term: &str,
    value: &str,
    json: bool,
) -> Result<ExitCode> {
    let results = match engine.search_for(entity, term, value) {
        Ok(results) => results,
        Err(err) => return Ok(query_error(&err)),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        writeln!(out, "{}", render::to_json(&results)?)?;
    } else if results.is_empty() {
        writeln!(out, "No results found.")?;
    } else {
        let renderer = Renderer::new(config.color && stdout.is_terminal());
        writeln!(out, "Found {} search results.", results.len())?;
        write!(out, "{}", renderer.render_all(&results))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Load the configured data files and ingest them without the banner.
pub fn load_engine(config: &Config) -> Result<SearchEngine> {
    let dataset = loader::load_dataset(&config.paths)?;
    Ok(SearchEngine::init(dataset.into_entities())?)
}

fn query_error(err: &search::SearchError) -> ExitCode {
    tracing::debug!(error = %err, "query_rejected");
    eprintln!("{err}");
    if let Some(suggestion) = err.suggestion() {
        eprintln!("Did you mean '{suggestion}'?");
    }
    ExitCode::from(EXIT_QUERY_ERROR)
}
