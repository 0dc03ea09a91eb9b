//! MongoDB implementation of the document store.

use crate::convert::{from_document, to_bson};
use macon_document::Value;
use macon_sync_engine::{CollectionRef, DocumentStore, Record, StoreError, StoreResult};
use mongodb::bson::{doc, Document};
use mongodb::error::{Error, ErrorKind};
use mongodb::options::FindOneOptions;
use mongodb::sync::{Client, Collection};
use tracing::{debug, info};

/// A document store backed by a MongoDB deployment.
///
/// Uses the driver's blocking API. The "current" record of a collection is
/// the one with the greatest `_id`, which for generated object ids is the
/// most recently inserted.
///
/// # Example
///
/// ```no_run
/// use macon_mongo::MongoStore;
/// use macon_sync_engine::{CollectionRef, DocumentStore};
///
/// let store = MongoStore::connect("mongodb://localhost:27017").unwrap();
/// let settings = CollectionRef::new("MACON_General", "GeneralSettings");
/// let current = store.latest(&settings).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    /// Connects to `uri` and verifies the deployment answers a ping.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if no server can be selected.
    /// Add `serverSelectionTimeoutMS` to the URI to bound the wait.
    pub fn connect(uri: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).map_err(store_error)?;
        let store = Self::from_client(client);
        store.ping()?;
        info!("connected to document store");
        Ok(store)
    }

    /// Wraps an existing client without contacting the server.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends a `ping` command to the deployment.
    pub fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .map_err(store_error)?;
        Ok(())
    }

    fn collection(&self, collection: &CollectionRef) -> Collection<Document> {
        self.client
            .database(&collection.database)
            .collection(&collection.name)
    }
}

impl DocumentStore for MongoStore {
    fn latest(&self, collection: &CollectionRef) -> StoreResult<Option<Record>> {
        let options = FindOneOptions::builder().sort(doc! { "_id": -1 }).build();
        let Some(document) = self
            .collection(collection)
            .find_one(None, options)
            .map_err(store_error)?
        else {
            return Ok(None);
        };

        let record = Record::from_document(Value::Map(from_document(document))).ok_or_else(
            || StoreError::MissingIdentity {
                collection: collection.to_string(),
            },
        )?;
        Ok(Some(record))
    }

    fn all(&self, collection: &CollectionRef) -> StoreResult<Vec<Value>> {
        self.collection(collection)
            .find(None, None)
            .map_err(store_error)?
            .map(|document| {
                document
                    .map(|d| Value::Map(from_document(d)))
                    .map_err(store_error)
            })
            .collect()
    }

    fn update_field(
        &self,
        collection: &CollectionRef,
        id: &Value,
        path: &str,
        value: &Value,
    ) -> StoreResult<()> {
        self.update(collection, id, set_fields([(path, value)]))?;
        debug!(collection = %collection, path, "field updated");
        Ok(())
    }

    fn update_fields(
        &self,
        collection: &CollectionRef,
        id: &Value,
        fields: &[(String, Value)],
    ) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let set = set_fields(fields.iter().map(|(path, value)| (path.as_str(), value)));
        self.update(collection, id, set)?;
        debug!(collection = %collection, paths = fields.len(), "fields updated");
        Ok(())
    }
}

impl MongoStore {
    fn update(&self, collection: &CollectionRef, id: &Value, fields: Document) -> StoreResult<()> {
        let result = self
            .collection(collection)
            .update_one(doc! { "_id": to_bson(id) }, doc! { "$set": fields }, None)
            .map_err(store_error)?;

        if result.matched_count == 0 {
            return Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Builds the `$set` operand for dotted `paths`. Nothing else of the stored
/// document is touched, so fields with no document counterpart keep their
/// BSON type.
fn set_fields<'a>(paths: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Document {
    let mut set = Document::new();
    for (path, value) in paths {
        set.insert(path, to_bson(value));
    }
    set
}

/// Maps a driver error. Failures to reach any server are connectivity
/// failures; everything else is a backend error.
fn store_error(error: Error) -> StoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => StoreError::Unavailable(error.to_string()),
        _ => StoreError::Backend(error.to_string()),
    }
}
