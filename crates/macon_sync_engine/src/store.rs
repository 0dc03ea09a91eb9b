//! Document store abstraction.

use crate::error::{StoreError, StoreResult};
use macon_document::{path, Map, RecordId, Value};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Name of the identity field of every stored document.
pub const ID_FIELD: &str = "_id";

/// A collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    /// Database name.
    pub database: String,
    /// Collection name.
    pub name: String,
}

impl CollectionRef {
    /// Creates a collection reference.
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

/// A stored document together with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Value,
    body: Value,
}

impl Record {
    /// Wraps a stored document. Returns `None` if it is not a map with an
    /// `_id` field.
    pub fn from_document(document: Value) -> Option<Self> {
        let id = document.get(ID_FIELD)?.clone();
        Some(Self { id, body: document })
    }

    /// The record's identity.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// The whole document, including `_id`.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Reads the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path::get(&self.body, path)
    }

    /// Consumes the record, returning the document.
    pub fn into_body(self) -> Value {
        self.body
    }
}

/// A document store holds the domain records.
///
/// This trait abstracts the database client, allowing for different
/// implementations (MongoDB, in-memory for testing, etc.).
pub trait DocumentStore: Send + Sync {
    /// Returns the most recently inserted record of a collection.
    fn latest(&self, collection: &CollectionRef) -> StoreResult<Option<Record>>;

    /// Returns every document of a collection, in insertion order.
    fn all(&self, collection: &CollectionRef) -> StoreResult<Vec<Value>>;

    /// Sets a single dotted path of one record.
    fn update_field(
        &self,
        collection: &CollectionRef,
        id: &Value,
        path: &str,
        value: &Value,
    ) -> StoreResult<()>;

    /// Sets several dotted paths of one record in one update.
    ///
    /// Paths not named in `fields` keep their stored value and type.
    fn update_fields(
        &self,
        collection: &CollectionRef,
        id: &Value,
        fields: &[(String, Value)],
    ) -> StoreResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn latest(&self, collection: &CollectionRef) -> StoreResult<Option<Record>> {
        (**self).latest(collection)
    }

    fn all(&self, collection: &CollectionRef) -> StoreResult<Vec<Value>> {
        (**self).all(collection)
    }

    fn update_field(
        &self,
        collection: &CollectionRef,
        id: &Value,
        path: &str,
        value: &Value,
    ) -> StoreResult<()> {
        (**self).update_field(collection, id, path, value)
    }

    fn update_fields(
        &self,
        collection: &CollectionRef,
        id: &Value,
        fields: &[(String, Value)],
    ) -> StoreResult<()> {
        (**self).update_fields(collection, id, fields)
    }
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    collections: HashMap<CollectionRef, Vec<Value>>,
    unavailable: HashSet<CollectionRef>,
    failing_paths: HashSet<String>,
    next_id: u64,
    updates: u64,
}

impl MemoryStoreState {
    fn check_available(&self, collection: &CollectionRef) -> StoreResult<()> {
        if self.unavailable.contains(collection) {
            Err(StoreError::Unavailable(format!("{collection} is offline")))
        } else {
            Ok(())
        }
    }

    fn find_mut(&mut self, collection: &CollectionRef, id: &Value) -> StoreResult<&mut Value> {
        self.collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.get(ID_FIELD) == Some(id)))
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }
}

/// An in-memory document store for testing.
///
/// Clones share the same state, so a test can keep a handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryStoreState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document, assigning an `_id` if it has none.
    ///
    /// The assigned identity is placed first, as a database would.
    pub fn insert(&self, collection: &CollectionRef, document: Value) -> Value {
        let mut state = self.state.write();
        let mut body = match document {
            Value::Map(map) => map,
            _ => Map::new(),
        };

        let id = match body.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                state.next_id += 1;
                let mut bytes = [0u8; 12];
                bytes[..4].copy_from_slice(&[0x65, 0x00, 0x00, 0x00]);
                bytes[4..].copy_from_slice(&state.next_id.to_be_bytes());
                let id = Value::Id(RecordId::from_bytes(bytes));

                let mut with_id = Map::new();
                with_id.insert(ID_FIELD, id.clone());
                for (key, value) in body {
                    with_id.insert(key, value);
                }
                body = with_id;
                id
            }
        };

        state
            .collections
            .entry(collection.clone())
            .or_default()
            .push(Value::Map(body));
        id
    }

    /// Snapshot of every document in a collection.
    pub fn documents(&self, collection: &CollectionRef) -> Vec<Value> {
        self.state
            .read()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the most recent document in a collection.
    pub fn latest_document(&self, collection: &CollectionRef) -> Option<Value> {
        self.state
            .read()
            .collections
            .get(collection)
            .and_then(|docs| docs.last().cloned())
    }

    /// Edits the most recent document in place, as an operator UI would.
    pub fn edit_latest(&self, collection: &CollectionRef, path: &str, value: Value) {
        let mut state = self.state.write();
        if let Some(doc) = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.last_mut())
        {
            path::set(doc, path, value);
        }
    }

    /// Makes every call on `collection` fail as unreachable.
    pub fn set_unavailable(&self, collection: &CollectionRef, unavailable: bool) {
        let mut state = self.state.write();
        if unavailable {
            state.unavailable.insert(collection.clone());
        } else {
            state.unavailable.remove(collection);
        }
    }

    /// Makes targeted updates of `path` fail.
    pub fn fail_updates_of(&self, path: &str) {
        self.state.write().failing_paths.insert(path.to_string());
    }

    /// Number of successful update calls.
    pub fn update_count(&self) -> u64 {
        self.state.read().updates
    }
}

impl DocumentStore for MemoryStore {
    fn latest(&self, collection: &CollectionRef) -> StoreResult<Option<Record>> {
        let state = self.state.read();
        state.check_available(collection)?;
        match state.collections.get(collection).and_then(|docs| docs.last()) {
            Some(doc) => Record::from_document(doc.clone())
                .map(Some)
                .ok_or_else(|| StoreError::MissingIdentity {
                    collection: collection.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn all(&self, collection: &CollectionRef) -> StoreResult<Vec<Value>> {
        let state = self.state.read();
        state.check_available(collection)?;
        Ok(state.collections.get(collection).cloned().unwrap_or_default())
    }

    fn update_field(
        &self,
        collection: &CollectionRef,
        id: &Value,
        path: &str,
        value: &Value,
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        state.check_available(collection)?;
        if state.failing_paths.contains(path) {
            return Err(StoreError::Backend(format!("update of {path} rejected")));
        }
        let doc = state.find_mut(collection, id)?;
        path::set(doc, path, value.clone());
        state.updates += 1;
        Ok(())
    }

    fn update_fields(
        &self,
        collection: &CollectionRef,
        id: &Value,
        fields: &[(String, Value)],
    ) -> StoreResult<()> {
        let mut state = self.state.write();
        state.check_available(collection)?;
        if let Some((path, _)) = fields.iter().find(|(p, _)| state.failing_paths.contains(p)) {
            return Err(StoreError::Backend(format!("update of {path} rejected")));
        }
        let doc = state.find_mut(collection, id)?;
        for (path, value) in fields {
            path::set(doc, path, value.clone());
        }
        state.updates += 1;
        Ok(())
    }
}
