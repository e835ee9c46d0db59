//! In-memory record tables and secondary indexes.
//!
//! Per entity kind the store keeps the primary table (coerced key to raw row)
//! and an [`IndexTrie`] mapping index paths such as `["tags", "ohio"]` or
//! `["created_at", 2016, 5, 21, 21, 10, 28]` to the primary keys of the rows
//! carrying that value. The store is filled once by the indexer and only read
//! afterwards, so it is `Sync` without any locking.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::model::types::{EntityKind, Record};
use crate::schema::Schema;
use crate::search::coerce::Segment;

/// Primary key of a record after coercion.
pub type RecordKey = Segment;

/// Recursive index node. Keys stored at a node keep insertion order and
/// never repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTrie {
    keys: Vec<RecordKey>,
    children: BTreeMap<Segment, IndexTrie>,
}

impl IndexTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key` under `path`. Returns `false` if it was already there.
    pub fn insert(&mut self, path: &[Segment], key: RecordKey) -> bool {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.clone()).or_default();
        }
        if node.keys.contains(&key) {
            return false;
        }
        node.keys.push(key);
        true
    }

    /// Keys under `path`, including every key in its subtree. An unknown
    /// path yields an empty list.
    pub fn get(&self, path: &[Segment]) -> Vec<RecordKey> {
        let mut node = self;
        for segment in path {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        node.collect_into(&mut out);
        out
    }

    fn collect_into(&self, out: &mut Vec<RecordKey>) {
        out.extend(self.keys.iter().cloned());
        for child in self.children.values() {
            child.collect_into(out);
        }
    }

    /// Number of stored (path, key) entries.
    pub fn len(&self) -> usize {
        self.keys.len() + self.children.values().map(IndexTrie::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
struct Table {
    schema: Option<Arc<Schema>>,
    records: HashMap<RecordKey, Record>,
    index: IndexTrie,
}

/// Record tables, indexes and schemas for every ingested entity kind.
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: BTreeMap<EntityKind, Table>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_schema(&mut self, kind: EntityKind, schema: Arc<Schema>) {
        self.tables.entry(kind).or_default().schema = Some(schema);
    }

    pub fn schema(&self, kind: EntityKind) -> Option<&Arc<Schema>> {
        self.tables.get(&kind).and_then(|t| t.schema.as_ref())
    }

    pub fn get_record(&self, kind: EntityKind, key: &RecordKey) -> Option<&Record> {
        self.tables.get(&kind).and_then(|t| t.records.get(key))
    }

    /// Insert a row; an existing row under the same key is replaced.
    pub fn add_record(&mut self, kind: EntityKind, key: RecordKey, record: Record) {
        self.tables.entry(kind).or_default().records.insert(key, record);
    }

    /// Returns `false` when the key was already indexed under `path`.
    pub fn add_index(&mut self, kind: EntityKind, path: &[Segment], key: RecordKey) -> bool {
        self.tables.entry(kind).or_default().index.insert(path, key)
    }

    pub fn search_index(&self, kind: EntityKind, path: &[Segment]) -> Vec<RecordKey> {
        self.tables
            .get(&kind)
            .map(|t| t.index.get(path))
            .unwrap_or_default()
    }

    /// Entity kinds currently held, in load order.
    pub fn list_records(&self) -> Vec<EntityKind> {
        self.tables.keys().copied().collect()
    }

    pub fn record_count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, |t| t.records.len())
    }

    pub fn index_len(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, |t| t.index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, ValueType};
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<Segment> {
        segments.iter().map(|s| Segment::from(*s)).collect()
    }

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn add_index_builds_nested_paths() {
        let mut trie = IndexTrie::new();
        trie.insert(&path(&["trie_key_one", "trie_key_two"]), Segment::Int(777));
        assert_eq!(
            trie.get(&path(&["trie_key_one", "trie_key_two"])),
            vec![Segment::Int(777)]
        );
    }

    #[test]
    fn add_index_appends_and_branches() {
        let mut trie = IndexTrie::new();
        trie.insert(&path(&["trie_key_one", "trie_key_two"]), Segment::Int(25));
        trie.insert(&path(&["trie_key_one", "trie_key_two"]), Segment::Int(777));
        trie.insert(&path(&["trie_key_one", "another_trie_key_two"]), Segment::Int(888));

        assert_eq!(
            trie.get(&path(&["trie_key_one", "trie_key_two"])),
            vec![Segment::Int(25), Segment::Int(777)]
        );
        assert_eq!(
            trie.get(&path(&["trie_key_one", "another_trie_key_two"])),
            vec![Segment::Int(888)]
        );
    }

    #[test]
    fn duplicate_entries_are_ignored() {
        let mut trie = IndexTrie::new();
        let p = path(&["role", "admin"]);
        assert!(trie.insert(&p, Segment::Int(1)));
        assert!(!trie.insert(&p, Segment::Int(1)));
        assert_eq!(trie.get(&p), vec![Segment::Int(1)]);
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn partial_path_collects_subtree() {
        let mut trie = IndexTrie::new();
        trie.insert(
            &[Segment::from("created_at"), Segment::Int(2016), Segment::Int(5)],
            Segment::Int(1),
        );
        trie.insert(
            &[Segment::from("created_at"), Segment::Int(2016), Segment::Int(4)],
            Segment::Int(2),
        );
        trie.insert(
            &[Segment::from("created_at"), Segment::Int(2017), Segment::Int(1)],
            Segment::Int(3),
        );

        let mut keys = trie.get(&[Segment::from("created_at"), Segment::Int(2016)]);
        keys.sort();
        assert_eq!(keys, vec![Segment::Int(1), Segment::Int(2)]);
    }

    #[test]
    fn search_index_is_empty_for_unknown_paths() {
        let mut store = Store::new();
        store.add_index(EntityKind::User, &path(&["role", "admin"]), Segment::Int(1));

        assert!(
            store
                .search_index(EntityKind::User, &[Segment::from("is_admin"), Segment::Bool(false)])
                .is_empty()
        );
        assert!(
            store
                .search_index(EntityKind::Ticket, &path(&["role", "admin"]))
                .is_empty()
        );
    }

    #[test]
    fn get_record_returns_none_for_missing_keys() {
        let mut store = Store::new();
        store.add_record(EntityKind::Organization, Segment::Int(101), record(json!({"_id": 101})));

        assert_eq!(
            store.get_record(EntityKind::Organization, &Segment::Int(101)),
            Some(&record(json!({"_id": 101})))
        );
        assert!(store.get_record(EntityKind::Organization, &Segment::Int(2)).is_none());
        assert!(store.get_record(EntityKind::User, &Segment::Int(101)).is_none());
    }

    #[test]
    fn add_record_overwrites_existing_row() {
        let mut store = Store::new();
        let key = Segment::from("existing_key");
        store.add_record(EntityKind::Ticket, key.clone(), record(json!({"existing": "key"})));
        store.add_record(EntityKind::Ticket, key.clone(), record(json!({"overriden": "value"})));

        assert_eq!(
            store.get_record(EntityKind::Ticket, &key),
            Some(&record(json!({"overriden": "value"})))
        );
        assert_eq!(store.record_count(EntityKind::Ticket), 1);
    }

    #[test]
    fn list_records_follows_entity_order() {
        let mut store = Store::new();
        let schema = Arc::new(Schema::builder("_id", ValueType::INTEGER).build());
        store.add_schema(EntityKind::Ticket, Arc::clone(&schema));
        store.add_schema(EntityKind::User, schema);
        assert_eq!(store.list_records(), vec![EntityKind::User, EntityKind::Ticket]);
        assert!(store.schema(EntityKind::User).is_some());
        assert!(store.schema(EntityKind::Organization).is_none());
    }
}
