//! Builds the in-memory store from raw JSON rows.
//!
//! Every row is validated against its entity schema, inserted into the record
//! table under its coerced primary key, and indexed under every other schema
//! attribute. Array attributes produce one index entry per element; a missing
//! or `null` attribute is indexed under the empty string so that searching for
//! an empty value finds it.
//!
//! Ingestion is all-or-nothing: the first offending row aborts the build and
//! the partially filled store is dropped.

use serde_json::{Map, Value};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::model::types::{EntityKind, NULL, Record};
use crate::schema::{Attribute, Schema, SchemaSource};
use crate::search::coerce::{CoercionError, Segment, coerce};
use crate::storage::memory::{RecordKey, Store};

/// Attribute segment followed by the value segments (at most six, for a time).
pub type IndexPath = SmallVec<[Segment; 7]>;

/// Fatal ingestion failures. No store is produced when one is returned.
#[derive(Error, Debug)]
pub enum GenerateDatabaseError {
    #[error("unknown '{0}' record error")]
    UnknownSchema(EntityKind),

    #[error("{kind} row {row} is not a JSON object")]
    NotAnObject { kind: EntityKind, row: usize },

    #[error("primary_key is not found in {kind} row {row}: {data}")]
    MissingPrimaryKey {
        kind: EntityKind,
        row: usize,
        data: String,
    },

    #[error("unknown attributes {attributes:?} provided in {kind} row {row}")]
    UnknownAttributes {
        kind: EntityKind,
        row: usize,
        attributes: Vec<String>,
    },

    #[error("{kind} row {row}, attribute {attribute}: {source}")]
    InvalidValue {
        kind: EntityKind,
        row: usize,
        attribute: String,
        #[source]
        source: CoercionError,
    },
}

/// Per-kind counters reported after a successful build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub rows: usize,
    pub index_entries: usize,
}

/// Build a store from `(kind, rows)` pairs, taking schemas from `schemas`.
pub fn build<I, S>(input: I, schemas: &S) -> Result<Store, GenerateDatabaseError>
where
    I: IntoIterator<Item = (EntityKind, Vec<Value>)>,
    S: SchemaSource + ?Sized,
{
    let mut store = Store::new();

    for (kind, rows) in input {
        let schema = schemas
            .schema_for(kind)
            .ok_or(GenerateDatabaseError::UnknownSchema(kind))?;
        store.add_schema(kind, schema.clone());

        let mut stats = IngestStats::default();
        for (row_no, row) in rows.into_iter().enumerate() {
            let Value::Object(data) = row else {
                return Err(GenerateDatabaseError::NotAnObject { kind, row: row_no });
            };
            stats.index_entries += ingest_row(&mut store, kind, &schema, row_no, data)?;
            stats.rows += 1;
        }

        tracing::info!(
            entity = %kind,
            rows = stats.rows,
            index_entries = stats.index_entries,
            "ingest_entity"
        );
    }

    Ok(store)
}

/// Insert one row and its index entries. Returns how many entries were new.
fn ingest_row(
    store: &mut Store,
    kind: EntityKind,
    schema: &Schema,
    row: usize,
    data: Map<String, Value>,
) -> Result<usize, GenerateDatabaseError> {
    let primary_key = schema.primary_key();
    let Some(raw_key) = data
        .get(&primary_key.name)
        .filter(|v| !v.is_null())
        .cloned()
    else {
        return Err(GenerateDatabaseError::MissingPrimaryKey {
            kind,
            row,
            data: Value::Object(data).to_string(),
        });
    };

    let unknown: Vec<String> = data
        .keys()
        .filter(|name| !schema.contains(name))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(GenerateDatabaseError::UnknownAttributes {
            kind,
            row,
            attributes: unknown,
        });
    }

    let key: RecordKey = coerce(&raw_key, primary_key.value_type.element_type())
        .map_err(|source| invalid(kind, row, primary_key, source))?
        .into_key();

    let mut added = 0;
    for attribute in schema.secondary_attributes() {
        let raw = data.get(&attribute.name).unwrap_or(&NULL);
        for path in index_paths(attribute, raw).map_err(|source| invalid(kind, row, attribute, source))? {
            if store.add_index(kind, &path, key.clone()) {
                added += 1;
            }
        }
    }

    tracing::trace!(entity = %kind, key = %key, "ingest_row");
    store.add_record(kind, key, Record::from(data));
    Ok(added)
}

/// Index paths one attribute value contributes.
pub fn index_paths(attribute: &Attribute, raw: &Value) -> Result<Vec<IndexPath>, CoercionError> {
    let element_type = attribute.value_type.element_type();
    let path_for = |value: &Value| -> Result<IndexPath, CoercionError> {
        let mut path: IndexPath = smallvec![Segment::from(attribute.name.as_str())];
        path.extend(coerce(value, element_type)?.segments());
        Ok(path)
    };

    match raw {
        Value::Array(items) if attribute.value_type.is_array() => {
            items.iter().map(path_for).collect()
        }
        Value::Null => Ok(vec![path_for(raw)?]),
        Value::String(s) if s.is_empty() => Ok(vec![path_for(raw)?]),
        _ if attribute.value_type.is_array() => Err(CoercionError {
            value: raw.to_string(),
            expected: element_type,
        }),
        _ => Ok(vec![path_for(raw)?]),
    }
}

fn invalid(
    kind: EntityKind,
    row: usize,
    attribute: &Attribute,
    source: CoercionError,
) -> GenerateDatabaseError {
    GenerateDatabaseError::InvalidValue {
        kind,
        row,
        attribute: attribute.name.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaRegistry, ValueType};
    use serde_json::json;
    use std::sync::Arc;

    fn user_schema_source(kind: EntityKind) -> Option<Arc<Schema>> {
        match kind {
            EntityKind::User => Some(Arc::new(
                Schema::builder("_id", ValueType::INTEGER)
                    .attribute("name", ValueType::STRING)
                    .attribute("tags", ValueType::STRINGS)
                    .attribute("created_at", ValueType::TIME)
                    .attribute("active", ValueType::BOOLEAN)
                    .build(),
            )),
            _ => None,
        }
    }

    fn users(rows: Vec<Value>) -> Vec<(EntityKind, Vec<Value>)> {
        vec![(EntityKind::User, rows)]
    }

    fn name_path(name: &str) -> Vec<Segment> {
        vec![Segment::from("name"), Segment::from(name)]
    }

    #[test]
    fn inserts_rows_under_coerced_primary_key() {
        let row = json!({"_id": 1, "name": "Francisca"});
        let store = build(users(vec![row.clone()]), &user_schema_source).unwrap();

        let record = store.get_record(EntityKind::User, &Segment::Int(1)).unwrap();
        assert_eq!(serde_json::to_value(record).unwrap(), row);
        assert_eq!(store.list_records(), vec![EntityKind::User]);
    }

    #[test]
    fn indexes_scalars_lowercased() {
        let store = build(
            users(vec![json!({"_id": 1, "name": "Francisca"})]),
            &user_schema_source,
        )
        .unwrap();
        assert_eq!(
            store.search_index(EntityKind::User, &name_path("francisca")),
            vec![Segment::Int(1)]
        );
        assert!(store.search_index(EntityKind::User, &name_path("Francisca")).is_empty());
    }

    #[test]
    fn indexes_each_array_element() {
        let store = build(
            users(vec![json!({"_id": 1, "tags": ["a", "b"]})]),
            &user_schema_source,
        )
        .unwrap();
        for tag in ["a", "b"] {
            assert_eq!(
                store.search_index(EntityKind::User, &[Segment::from("tags"), Segment::from(tag)]),
                vec![Segment::Int(1)]
            );
        }
    }

    #[test]
    fn missing_attributes_are_indexed_under_empty_string() {
        let store = build(
            users(vec![json!({"_id": 1}), json!({"_id": 2, "name": null})]),
            &user_schema_source,
        )
        .unwrap();
        assert_eq!(
            store.search_index(EntityKind::User, &name_path("")),
            vec![Segment::Int(1), Segment::Int(2)]
        );
        assert_eq!(
            store.search_index(EntityKind::User, &[Segment::from("tags"), Segment::empty()]),
            vec![Segment::Int(1), Segment::Int(2)]
        );
    }

    #[test]
    fn empty_arrays_produce_no_entries() {
        let store = build(users(vec![json!({"_id": 1, "tags": []})]), &user_schema_source).unwrap();
        assert!(store.search_index(EntityKind::User, &[Segment::from("tags")]).is_empty());
    }

    #[test]
    fn time_values_index_as_six_segments() {
        let store = build(
            users(vec![json!({"_id": 1, "created_at": "2016-05-21T11:10:28 -10:00"})]),
            &user_schema_source,
        )
        .unwrap();
        let path: Vec<Segment> = std::iter::once(Segment::from("created_at"))
            .chain([2016, 5, 21, 21, 10, 28].into_iter().map(Segment::Int))
            .collect();
        assert_eq!(store.search_index(EntityKind::User, &path), vec![Segment::Int(1)]);
    }

    #[test]
    fn unknown_attribute_is_fatal() {
        let err = build(
            users(vec![json!({"_id": 1, "bogus": "x"})]),
            &user_schema_source,
        )
        .unwrap_err();
        match err {
            GenerateDatabaseError::UnknownAttributes { attributes, .. } => {
                assert_eq!(attributes, vec!["bogus".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_or_null_primary_key_is_fatal() {
        for row in [json!({"name": "x"}), json!({"_id": null})] {
            let err = build(users(vec![row]), &user_schema_source).unwrap_err();
            assert!(matches!(err, GenerateDatabaseError::MissingPrimaryKey { .. }));
        }
    }

    #[test]
    fn uncoercible_value_is_fatal() {
        let err = build(
            users(vec![json!({"_id": 1, "active": "maybe"})]),
            &user_schema_source,
        )
        .unwrap_err();
        assert!(err.to_string().contains("provided value maybe for type Boolean is invalid"));

        let err = build(users(vec![json!({"_id": "one"})]), &user_schema_source).unwrap_err();
        assert!(matches!(err, GenerateDatabaseError::InvalidValue { .. }));
    }

    #[test]
    fn scalar_in_array_attribute_is_fatal() {
        let err = build(users(vec![json!({"_id": 1, "tags": "solo"})]), &user_schema_source)
            .unwrap_err();
        assert!(matches!(err, GenerateDatabaseError::InvalidValue { .. }));
    }

    #[test]
    fn unknown_schema_is_fatal() {
        let err = build(
            vec![(EntityKind::Ticket, vec![json!({"_id": "t1"})])],
            &user_schema_source,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown 'tickets' record error");
    }

    #[test]
    fn non_object_row_is_fatal() {
        let err = build(users(vec![json!([1, 2])]), &user_schema_source).unwrap_err();
        assert!(matches!(err, GenerateDatabaseError::NotAnObject { row: 0, .. }));
    }

    #[test]
    fn registry_schemas_ingest_sample_rows() {
        let store = build(
            vec![
                (EntityKind::User, vec![json!({"_id": 1, "organization_id": 101})]),
                (EntityKind::Organization, vec![json!({"_id": 101})]),
                (
                    EntityKind::Ticket,
                    vec![json!({"_id": "T1", "submitter_id": 1, "assignee_id": 1, "organization_id": 101})],
                ),
            ],
            &SchemaRegistry,
        )
        .unwrap();
        assert!(store.get_record(EntityKind::Ticket, &Segment::from("t1")).is_some());
        assert_eq!(
            store.search_index(
                EntityKind::Ticket,
                &[Segment::from("submitter_id"), Segment::Int(1)]
            ),
            vec![Segment::from("t1")]
        );
    }
}
