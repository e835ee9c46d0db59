//! Search layer facade.
//!
//! This module provides the query side of the crate:
//!
//! - **[`coerce`]**: type-directed coercion shared by ingestion and lookups.
//! - **[`query`]**: primary-key and secondary-index lookups plus association
//!   resolution.
//!
//! [`SearchEngine`] is the only entry point the CLI and prompt loop use. Each
//! call validates in a fixed order (entity, then term, then value) and stops
//! at the first failure, so later steps never see invalid input.

pub mod coerce;
pub mod query;

use serde_json::Value;
use thiserror::Error;

use crate::indexer::{self, GenerateDatabaseError};
use crate::model::types::{EntityKind, SearchResult};
use crate::schema::{Schema, SchemaRegistry};
use crate::storage::memory::Store;
use coerce::coerce_str;
use query::QueryEngine;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Recoverable query-time failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("unknown {0} record")]
    UnknownSchema(String),

    #[error("INVALID SEARCH TERM: {term}")]
    UnknownSearchTerm {
        term: String,
        suggestion: Option<String>,
    },

    #[error("INVALID TYPE FOR SEARCH TERM: {0}")]
    InvalidSearchValue(String),
}

impl SearchError {
    /// Build an unknown-term error, suggesting the closest attribute name.
    pub fn unknown_term(schema: &Schema, term: &str) -> Self {
        let suggestion = schema
            .attribute_names()
            .map(|name| (name, strsim::jaro_winkler(name, term)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name.to_string());
        Self::UnknownSearchTerm {
            term: term.to_string(),
            suggestion,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::UnknownSearchTerm { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Ingested data plus the validated search entry points.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    store: Store,
}

impl SearchEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Ingest rows with the built-in schemas.
    pub fn init<I>(input: I) -> Result<Self, GenerateDatabaseError>
    where
        I: IntoIterator<Item = (EntityKind, Vec<Value>)>,
    {
        let store = indexer::build(input, &SchemaRegistry)?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Entity kinds available for searching, in load order.
    pub fn list_records(&self) -> Vec<EntityKind> {
        self.store.list_records()
    }

    fn schema(&self, entity: &str) -> Result<(EntityKind, &Schema), SearchError> {
        let kind = EntityKind::parse(entity)
            .ok_or_else(|| SearchError::UnknownSchema(entity.to_string()))?;
        let schema = self
            .store
            .schema(kind)
            .ok_or_else(|| SearchError::UnknownSchema(entity.to_string()))?;
        Ok((kind, &**schema))
    }

    /// Attribute names that can be searched for `entity`, in schema order.
    pub fn possible_terms(&self, entity: &str) -> Result<Vec<&str>, SearchError> {
        let (_, schema) = self.schema(entity)?;
        Ok(schema.attribute_names().collect())
    }

    pub fn validate_search_term(&self, entity: &str, term: &str) -> Result<(), SearchError> {
        let (_, schema) = self.schema(entity)?;
        if schema.contains(term) {
            Ok(())
        } else {
            Err(SearchError::unknown_term(schema, term))
        }
    }

    /// Validate entity, term and value in that order, then search.
    pub fn search_for(
        &self,
        entity: &str,
        term: &str,
        value: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let (kind, schema) = self.schema(entity)?;
        let attribute = schema
            .attribute(term)
            .ok_or_else(|| SearchError::unknown_term(schema, term))?;
        let coerced = coerce_str(value, attribute.value_type.element_type())
            .map_err(|_| SearchError::InvalidSearchValue(value.to_string()))?;

        Ok(QueryEngine::new(&self.store).search_by(kind, attribute, &coerced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> SearchEngine {
        SearchEngine::init(vec![
            (
                EntityKind::User,
                vec![
                    json!({"_id": 1, "name": "Francisca Rasmussen", "organization_id": 119, "tags": ["Springville", "Sutton"], "active": true, "created_at": "2023-09-01T05:19:46 -10:00"}),
                    json!({"_id": 2, "name": "Cross Barlow", "organization_id": 106, "tags": ["Foxworth"], "active": true}),
                ],
            ),
            (EntityKind::Organization, vec![json!({"_id": 119, "name": "Enthaze"})]),
            (EntityKind::Ticket, vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn possible_terms_follow_schema_order() {
        let engine = engine();
        let terms = engine.possible_terms("organizations").unwrap();
        assert_eq!(terms[0], "_id");
        assert!(terms.contains(&"domain_names"));
        assert_eq!(
            engine.possible_terms("unknown_record"),
            Err(SearchError::UnknownSchema("unknown_record".into()))
        );
    }

    #[test]
    fn validate_search_term_suggests_close_names() {
        let engine = engine();
        assert!(engine.validate_search_term("users", "name").is_ok());

        let err = engine.validate_search_term("users", "nmae").unwrap_err();
        assert_eq!(err.to_string(), "INVALID SEARCH TERM: nmae");
        assert_eq!(err.suggestion(), Some("name"));

        let err = engine.validate_search_term("users", "bogus").unwrap_err();
        assert!(matches!(err, SearchError::UnknownSearchTerm { .. }));
    }

    #[test]
    fn search_for_short_circuits_in_order() {
        let engine = engine();
        assert!(matches!(
            engine.search_for("Fusers", "bogus", "x"),
            Err(SearchError::UnknownSchema(_))
        ));
        assert!(matches!(
            engine.search_for("users", "bogus", "x"),
            Err(SearchError::UnknownSearchTerm { .. })
        ));
        let err = engine.search_for("users", "_id", "INvalid_value").unwrap_err();
        assert_eq!(err.to_string(), "INVALID TYPE FOR SEARCH TERM: INvalid_value");
        assert!(matches!(
            engine.search_for("users", "created_at", "not a time"),
            Err(SearchError::InvalidSearchValue(_))
        ));
    }

    #[test]
    fn search_for_matches_case_insensitively() {
        let engine = engine();
        let results = engine.search_for("users", "name", "FRANCISCA RASMUSSEN").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind(), EntityKind::User);
    }

    #[test]
    fn search_for_array_elements_and_booleans() {
        let engine = engine();
        assert_eq!(engine.search_for("users", "tags", "sutton").unwrap().len(), 1);
        assert_eq!(engine.search_for("users", "active", "true").unwrap().len(), 2);
        assert!(engine.search_for("users", "active", "false").unwrap().is_empty());
    }

    #[test]
    fn search_for_time_uses_utc_instant() {
        let engine = engine();
        let results = engine
            .search_for("users", "created_at", "2023-09-01T15:19:46Z")
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_value_finds_missing_attributes() {
        let engine = engine();
        let results = engine.search_for("users", "created_at", "").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record().value("_id"), &json!(2));
    }

    #[test]
    fn list_records_reports_loaded_kinds() {
        assert_eq!(engine().list_records(), EntityKind::ALL.to_vec());
    }
}
