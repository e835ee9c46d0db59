//! Line-oriented interactive search session.
//!
//! The session is a small state machine over [`Step`]. Every prompt reads one
//! line; `exit` leaves from any step and end of input ends the session
//! quietly.

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::config::Config;
use crate::loader;
use crate::model::types::EntityKind;
use crate::search::{SearchEngine, SearchError};
use crate::ui::render::Renderer;

const RULE: &str = "_______________________";
const BANNER_RULE: &str = "==================================";

/// Where the session is waiting for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    SelectEntity,
    EnterTerm(EntityKind),
    EnterValue(EntityKind, String),
    SearchAgain,
    Exit,
}

pub struct Session<'e, R, W> {
    engine: &'e SearchEngine,
    input: R,
    output: W,
    renderer: Renderer,
}

impl<'e, R: BufRead, W: Write> Session<'e, R, W> {
    pub fn new(engine: &'e SearchEngine, input: R, output: W, renderer: Renderer) -> Self {
        Self {
            engine,
            input,
            output,
            renderer,
        }
    }

    /// Drive the session until the user exits or input runs out.
    pub fn run(&mut self) -> io::Result<()> {
        let mut step = Step::SelectEntity;
        while step != Step::Exit {
            step = self.step(step)?;
        }
        self.output.flush()
    }

    /// Handle one prompt and return the next step.
    pub fn step(&mut self, step: Step) -> io::Result<Step> {
        match step {
            Step::SelectEntity => self.select_entity(),
            Step::EnterTerm(kind) => self.enter_term(kind),
            Step::EnterValue(kind, term) => self.enter_value(kind, term),
            Step::SearchAgain => self.search_again(),
            Step::Exit => Ok(Step::Exit),
        }
    }

    fn select_entity(&mut self) -> io::Result<Step> {
        let kinds = self.engine.list_records();
        for (i, kind) in kinds.iter().enumerate() {
            writeln!(self.output, "Press '{}' to search for {}", i + 1, kind)?;
        }
        writeln!(self.output, "Type 'exit' to exit anytime")?;

        let Some(line) = self.read_line()? else {
            return Ok(Step::Exit);
        };
        match line.as_str() {
            "exit" | "e" => Ok(Step::Exit),
            other => match other
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| kinds.get(i))
            {
                Some(kind) => Ok(Step::EnterTerm(*kind)),
                None => {
                    writeln!(self.output, "Sorry, don't understand {other}")?;
                    Ok(Step::SelectEntity)
                }
            },
        }
    }

    fn enter_term(&mut self, kind: EntityKind) -> io::Result<Step> {
        let terms = match self.engine.possible_terms(kind.as_str()) {
            Ok(terms) => terms,
            Err(err) => {
                writeln!(self.output, "{err}")?;
                return Ok(Step::SelectEntity);
            }
        };
        writeln!(self.output, "Search {kind} with:")?;
        writeln!(self.output, "{RULE}")?;
        for term in terms {
            writeln!(self.output, "{term}")?;
        }
        writeln!(self.output, "{RULE}")?;
        writeln!(self.output, "Enter search term:")?;

        let Some(term) = self.read_line()? else {
            return Ok(Step::Exit);
        };
        if term == "exit" {
            return Ok(Step::Exit);
        }
        match self.engine.validate_search_term(kind.as_str(), &term) {
            Ok(()) => Ok(Step::EnterValue(kind, term)),
            Err(err) => {
                self.print_error(&err)?;
                Ok(Step::EnterTerm(kind))
            }
        }
    }

    fn enter_value(&mut self, kind: EntityKind, term: String) -> io::Result<Step> {
        writeln!(self.output, "Enter search value:")?;

        let Some(value) = self.read_line()? else {
            return Ok(Step::Exit);
        };
        if value == "exit" {
            return Ok(Step::Exit);
        }
        match self.engine.search_for(kind.as_str(), &term, &value) {
            Ok(results) if results.is_empty() => {
                writeln!(self.output, "No results found.")?;
                Ok(Step::SearchAgain)
            }
            Ok(results) => {
                writeln!(self.output, "Found {} search results.", results.len())?;
                write!(self.output, "{}", self.renderer.render_all(&results))?;
                Ok(Step::SearchAgain)
            }
            Err(err) => {
                self.print_error(&err)?;
                Ok(Step::EnterValue(kind, term))
            }
        }
    }

    fn search_again(&mut self) -> io::Result<Step> {
        writeln!(self.output, "Search again?: y/n")?;

        let Some(answer) = self.read_line()? else {
            return Ok(Step::Exit);
        };
        match answer.as_str() {
            "n" | "exit" => Ok(Step::Exit),
            "y" => Ok(Step::SelectEntity),
            _ => {
                writeln!(self.output, "Sorry, don't understand, please enter 'y' or 'n'")?;
                Ok(Step::SearchAgain)
            }
        }
    }

    fn print_error(&mut self, err: &SearchError) -> io::Result<()> {
        writeln!(self.output, "{err}")?;
        if let Some(suggestion) = err.suggestion() {
            writeln!(self.output, "Did you mean '{suggestion}'?")?;
        }
        Ok(())
    }

    /// Next input line without its line terminator, `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        Ok(Some(trimmed.to_string()))
    }
}

/// Load the data files and build the engine, narrating progress to `out`.
pub fn startup<W: Write>(out: &mut W, config: &Config) -> Result<SearchEngine> {
    writeln!(out, "Loading data...")?;
    let dataset = loader::load_dataset(&config.paths)?;
    writeln!(out, "Finished loading data!")?;

    writeln!(out, "Initializing application...")?;
    let engine = SearchEngine::init(dataset.into_entities())?;
    writeln!(out, "Finished initializing application!")?;
    writeln!(out, "{BANNER_RULE}")?;
    writeln!(out, "Welcome to Helpdesk Search")?;
    Ok(engine)
}
