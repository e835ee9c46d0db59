//! Reads the three JSON data files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::model::types::EntityKind;

/// Locations of the users, organizations and tickets files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub users: PathBuf,
    pub organizations: PathBuf,
    pub tickets: PathBuf,
}

impl DataPaths {
    /// Standard file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            users: dir.join("users.json"),
            organizations: dir.join("organizations.json"),
            tickets: dir.join("tickets.json"),
        }
    }

    pub fn path_for(&self, kind: EntityKind) -> &Path {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Organization => &self.organizations,
            EntityKind::Ticket => &self.tickets,
        }
    }
}

/// Parsed but not yet validated rows for every entity kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub users: Vec<Value>,
    pub organizations: Vec<Value>,
    pub tickets: Vec<Value>,
}

impl RawDataset {
    /// Rows paired with their kind, in load order.
    pub fn into_entities(self) -> Vec<(EntityKind, Vec<Value>)> {
        vec![
            (EntityKind::User, self.users),
            (EntityKind::Organization, self.organizations),
            (EntityKind::Ticket, self.tickets),
        ]
    }

    pub fn row_count(&self) -> usize {
        self.users.len() + self.organizations.len() + self.tickets.len()
    }
}

pub fn load_dataset(paths: &DataPaths) -> Result<RawDataset> {
    let dataset = RawDataset {
        users: load_rows(&paths.users)?,
        organizations: load_rows(&paths.organizations)?,
        tickets: load_rows(&paths.tickets)?,
    };
    tracing::info!(rows = dataset.row_count(), "dataset_loaded");
    Ok(dataset)
}

/// Parse one file holding a JSON array of objects.
pub fn load_rows(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading data file {}", path.display()))?;
    parse_rows(&text).with_context(|| format!("parsing data file {}", path.display()))
}

pub fn parse_rows(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(rows) => Ok(rows),
        other => bail!("expected a JSON array at top level, found {}", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
