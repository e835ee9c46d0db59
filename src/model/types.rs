//! Normalized entity structs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three record kinds held by the store.
///
/// The set is closed: every match over it is checked exhaustively, so adding
/// a kind means touching the schema registry, association resolution and the
/// renderer in the same change.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EntityKind {
    #[serde(rename = "users")]
    User,
    #[serde(rename = "organizations")]
    Organization,
    #[serde(rename = "tickets")]
    Ticket,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::User, Self::Organization, Self::Ticket];

    /// Collection name used in data files, prompts and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Organization => "organizations",
            Self::Ticket => "tickets",
        }
    }

    /// Singular label used in rendered headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Organization => "Organization",
            Self::Ticket => "Ticket",
        }
    }

    /// Parse from a collection name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "users" => Some(Self::User),
            "organizations" => Some(Self::Organization),
            "tickets" => Some(Self::Ticket),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a collection name is not one of the known kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntity(pub String);

impl fmt::Display for UnknownEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} record", self.0)
    }
}

impl std::error::Error for UnknownEntity {}

impl FromStr for EntityKind {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownEntity(s.to_string()))
    }
}

pub(crate) static NULL: serde_json::Value = serde_json::Value::Null;

/// A row exactly as ingested: attribute name to raw JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub serde_json::Map<String, serde_json::Value>);

impl Record {
    /// Raw value of an attribute, `None` when the row does not carry it.
    pub fn get(&self, attribute: &str) -> Option<&serde_json::Value> {
        self.0.get(attribute)
    }

    /// Raw value of an attribute with absence folded into JSON `null`.
    pub fn value(&self, attribute: &str) -> &serde_json::Value {
        self.0.get(attribute).unwrap_or(&NULL)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Record {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// A user with its tickets and organization resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResult {
    pub record: Record,
    pub submitted_tickets: Vec<Record>,
    pub assigned_tickets: Vec<Record>,
    pub organization: Option<Record>,
}

/// An organization with its tickets and users resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationResult {
    pub record: Record,
    pub tickets: Vec<Record>,
    pub users: Vec<Record>,
}

/// A ticket with its submitter, assignee and organization resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketResult {
    pub record: Record,
    pub submitter: Option<Record>,
    pub assignee: Option<Record>,
    pub organization: Option<Record>,
}

/// One search hit together with its associations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchResult {
    User(UserResult),
    Organization(OrganizationResult),
    Ticket(TicketResult),
}

impl SearchResult {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Organization(_) => EntityKind::Organization,
            Self::Ticket(_) => EntityKind::Ticket,
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            Self::User(u) => &u.record,
            Self::Organization(o) => &o.record,
            Self::Ticket(t) => &t.record,
        }
    }
}
