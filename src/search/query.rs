use serde_json::Value;

use crate::model::types::{
    EntityKind, OrganizationResult, Record, SearchResult, TicketResult, UserResult,
};
use crate::schema::{Attribute, Schema};
use crate::search::SearchError;
use crate::search::coerce::{Coerced, Segment, coerce, coerce_str};
use crate::storage::memory::Store;

/// Foreign-key attributes used to resolve associations.
const ORGANIZATION_ID: &str = "organization_id";
const SUBMITTER_ID: &str = "submitter_id";
const ASSIGNEE_ID: &str = "assignee_id";

/// Read-only lookups over an ingested [`Store`].
///
/// Associations are resolved on every call and never cached; a lookup that
/// matches nothing yields an empty list or `None`, never an error.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a Store,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Coerce `raw` by the attribute's declared type, then search.
    pub fn search(
        &self,
        kind: EntityKind,
        attribute: &str,
        raw: &str,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let schema = self.schema(kind)?;
        let attr = schema
            .attribute(attribute)
            .ok_or_else(|| SearchError::unknown_term(schema, attribute))?;
        let value = coerce_str(raw, attr.value_type.element_type())
            .map_err(|_| SearchError::InvalidSearchValue(raw.to_string()))?;
        Ok(self.search_by(kind, attr, &value))
    }

    /// Search with an already coerced value and resolve associations.
    pub fn search_by(
        &self,
        kind: EntityKind,
        attribute: &Attribute,
        value: &Coerced,
    ) -> Vec<SearchResult> {
        tracing::debug!(
            entity = %kind,
            attribute = attribute.name.as_str(),
            value = ?value,
            "search_start"
        );
        let results: Vec<SearchResult> = self
            .find_records(kind, attribute, value)
            .into_iter()
            .map(|record| self.resolve(kind, record))
            .collect();
        tracing::debug!(entity = %kind, hits = results.len(), "search_done");
        results
    }

    fn schema(&self, kind: EntityKind) -> Result<&'a Schema, SearchError> {
        self.store
            .schema(kind)
            .map(|s| &**s)
            .ok_or_else(|| SearchError::UnknownSchema(kind.to_string()))
    }

    /// Primary-key attributes hit the record table directly; every other
    /// attribute goes through the secondary index.
    fn find_records(&self, kind: EntityKind, attribute: &Attribute, value: &Coerced) -> Vec<&'a Record> {
        if attribute.primary_key {
            return self
                .store
                .get_record(kind, &value.clone().into_key())
                .into_iter()
                .collect();
        }

        let mut path: Vec<Segment> = Vec::with_capacity(7);
        path.push(Segment::from(attribute.name.as_str()));
        path.extend(value.segments());
        self.store
            .search_index(kind, &path)
            .iter()
            .filter_map(|key| self.store.get_record(kind, key))
            .collect()
    }

    fn resolve(&self, kind: EntityKind, record: &Record) -> SearchResult {
        match kind {
            EntityKind::User => {
                let id = primary_key_value(self.store, kind, record);
                SearchResult::User(UserResult {
                    submitted_tickets: self.linked_many(EntityKind::Ticket, SUBMITTER_ID, id),
                    assigned_tickets: self.linked_many(EntityKind::Ticket, ASSIGNEE_ID, id),
                    organization: self
                        .linked_one(EntityKind::Organization, record.value(ORGANIZATION_ID)),
                    record: record.clone(),
                })
            }
            EntityKind::Organization => {
                let id = primary_key_value(self.store, kind, record);
                SearchResult::Organization(OrganizationResult {
                    tickets: self.linked_many(EntityKind::Ticket, ORGANIZATION_ID, id),
                    users: self.linked_many(EntityKind::User, ORGANIZATION_ID, id),
                    record: record.clone(),
                })
            }
            EntityKind::Ticket => SearchResult::Ticket(TicketResult {
                submitter: self.linked_one(EntityKind::User, record.value(SUBMITTER_ID)),
                assignee: self.linked_one(EntityKind::User, record.value(ASSIGNEE_ID)),
                organization: self
                    .linked_one(EntityKind::Organization, record.value(ORGANIZATION_ID)),
                record: record.clone(),
            }),
        }
    }

    /// Records of `target` whose `attribute` equals `raw`.
    fn linked_many(&self, target: EntityKind, attribute: &str, raw: &Value) -> Vec<Record> {
        let Some(attr) = self.store.schema(target).and_then(|s| s.attribute(attribute)) else {
            return Vec::new();
        };
        self.linked(target, attr, raw)
    }

    /// The record of `target` whose primary key equals `raw`.
    fn linked_one(&self, target: EntityKind, raw: &Value) -> Option<Record> {
        let schema = self.store.schema(target)?;
        self.linked(target, schema.primary_key(), raw).into_iter().next()
    }

    fn linked(&self, target: EntityKind, attribute: &Attribute, raw: &Value) -> Vec<Record> {
        if raw.is_null() {
            return Vec::new();
        }
        match coerce(raw, attribute.value_type.element_type()) {
            Ok(value) => self
                .find_records(target, attribute, &value)
                .into_iter()
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn primary_key_value<'r>(store: &Store, kind: EntityKind, record: &'r Record) -> &'r Value {
    let name = store
        .schema(kind)
        .map_or("_id", |schema| schema.primary_key().name.as_str());
    record.value(name)
}
