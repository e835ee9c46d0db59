//! Static per-entity schemas.
//!
//! Each entity kind has an ordered list of attribute descriptors. The first
//! attribute is always the primary key; [`SchemaBuilder`] enforces that by
//! construction, so a [`Schema`] can never carry zero or two primary keys.
//!
//! The registry is process-wide and immutable. Ingestion takes its schemas
//! through the [`SchemaSource`] seam so tests can feed reduced schemas.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::model::types::{EntityKind, UnknownEntity};

/// Scalar value types an attribute (or an array element) can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Integer,
    Boolean,
    Time,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Boolean => "Boolean",
            Self::Time => "Time",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar(ScalarType),
    Array(ScalarType),
}

impl ValueType {
    pub const STRING: Self = Self::Scalar(ScalarType::String);
    pub const INTEGER: Self = Self::Scalar(ScalarType::Integer);
    pub const BOOLEAN: Self = Self::Scalar(ScalarType::Boolean);
    pub const TIME: Self = Self::Scalar(ScalarType::Time);
    pub const STRINGS: Self = Self::Array(ScalarType::String);

    /// Type used to coerce one query value, or one array element at ingestion.
    pub fn element_type(&self) -> ScalarType {
        match self {
            Self::Scalar(t) | Self::Array(t) => *t,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(t) => f.write_str(t.as_str()),
            Self::Array(t) => write!(f, "Array[{}]", t.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value_type: ValueType,
    pub primary_key: bool,
}

/// Ordered attribute descriptors for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn builder(primary_key: &str, value_type: ValueType) -> SchemaBuilder {
        SchemaBuilder {
            attributes: vec![Attribute {
                name: primary_key.to_string(),
                value_type,
                primary_key: true,
            }],
        }
    }

    pub fn primary_key(&self) -> &Attribute {
        &self.attributes[0]
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key().name == name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    /// Every attribute except the primary key, in declaration order.
    pub fn secondary_attributes(&self) -> &[Attribute] {
        &self.attributes[1..]
    }
}

pub struct SchemaBuilder {
    attributes: Vec<Attribute>,
}

impl SchemaBuilder {
    /// Declare a non-key attribute. Redeclaring a name replaces its type.
    pub fn attribute(mut self, name: &str, value_type: ValueType) -> Self {
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value_type = value_type;
        } else {
            self.attributes.push(Attribute {
                name: name.to_string(),
                value_type,
                primary_key: false,
            });
        }
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            attributes: self.attributes,
        }
    }
}

static USERS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(
        Schema::builder("_id", ValueType::INTEGER)
            .attribute("url", ValueType::STRING)
            .attribute("external_id", ValueType::STRING)
            .attribute("name", ValueType::STRING)
            .attribute("alias", ValueType::STRING)
            .attribute("created_at", ValueType::TIME)
            .attribute("active", ValueType::BOOLEAN)
            .attribute("verified", ValueType::BOOLEAN)
            .attribute("shared", ValueType::BOOLEAN)
            .attribute("locale", ValueType::STRING)
            .attribute("timezone", ValueType::STRING)
            .attribute("last_login_at", ValueType::TIME)
            .attribute("email", ValueType::STRING)
            .attribute("phone", ValueType::STRING)
            .attribute("signature", ValueType::STRING)
            .attribute("organization_id", ValueType::INTEGER)
            .attribute("tags", ValueType::STRINGS)
            .attribute("suspended", ValueType::BOOLEAN)
            .attribute("role", ValueType::STRING)
            .build(),
    )
});

static ORGANIZATIONS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(
        Schema::builder("_id", ValueType::INTEGER)
            .attribute("url", ValueType::STRING)
            .attribute("external_id", ValueType::STRING)
            .attribute("name", ValueType::STRING)
            .attribute("domain_names", ValueType::STRINGS)
            .attribute("created_at", ValueType::TIME)
            .attribute("details", ValueType::STRING)
            .attribute("shared_tickets", ValueType::BOOLEAN)
            .attribute("tags", ValueType::STRINGS)
            .build(),
    )
});

static TICKETS: Lazy<Arc<Schema>> = Lazy::new(|| {
    Arc::new(
        Schema::builder("_id", ValueType::STRING)
            .attribute("url", ValueType::STRING)
            .attribute("external_id", ValueType::STRING)
            .attribute("created_at", ValueType::TIME)
            .attribute("type", ValueType::STRING)
            .attribute("subject", ValueType::STRING)
            .attribute("description", ValueType::STRING)
            .attribute("priority", ValueType::STRING)
            .attribute("status", ValueType::STRING)
            .attribute("submitter_id", ValueType::INTEGER)
            .attribute("assignee_id", ValueType::INTEGER)
            .attribute("organization_id", ValueType::INTEGER)
            .attribute("tags", ValueType::STRINGS)
            .attribute("has_incidents", ValueType::BOOLEAN)
            .attribute("due_at", ValueType::TIME)
            .attribute("via", ValueType::STRING)
            .build(),
    )
});

/// Where ingestion gets the schema for each entity kind.
pub trait SchemaSource {
    fn schema_for(&self, kind: EntityKind) -> Option<Arc<Schema>>;
}

impl<F> SchemaSource for F
where
    F: Fn(EntityKind) -> Option<Arc<Schema>>,
{
    fn schema_for(&self, kind: EntityKind) -> Option<Arc<Schema>> {
        self(kind)
    }
}

/// The built-in schemas.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn schema(kind: EntityKind) -> &'static Arc<Schema> {
        match kind {
            EntityKind::User => &USERS,
            EntityKind::Organization => &ORGANIZATIONS,
            EntityKind::Ticket => &TICKETS,
        }
    }

    /// Look a schema up by collection name.
    pub fn get(name: &str) -> Result<&'static Arc<Schema>, UnknownEntity> {
        let kind: EntityKind = name.parse()?;
        Ok(Self::schema(kind))
    }

    pub fn attribute_names(kind: EntityKind) -> Vec<&'static str> {
        Self::schema(kind).attribute_names().collect()
    }

    pub fn primary_key(kind: EntityKind) -> &'static str {
        Self::schema(kind).primary_key().name.as_str()
    }
}

impl SchemaSource for SchemaRegistry {
    fn schema_for(&self, kind: EntityKind) -> Option<Arc<Schema>> {
        Some(Arc::clone(Self::schema(kind)))
    }
}
