//! Store behaviour that does not need a running deployment.

use macon_mongo::MongoStore;
use macon_sync_engine::{CollectionRef, DocumentStore, StoreError};
use mongodb::sync::Client;

/// Nothing listens on port 1; server selection gives up quickly.
const UNREACHABLE: &str = "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200";

#[test]
fn connect_fails_when_no_server_answers() {
    let err = MongoStore::connect(UNREACHABLE).unwrap_err();
    assert!(err.is_connectivity(), "{err}");
}

#[test]
fn operations_report_unavailable() {
    let store = MongoStore::from_client(Client::with_uri_str(UNREACHABLE).unwrap());
    let collection = CollectionRef::new("MACON_General", "GeneralSettings");

    assert!(matches!(store.latest(&collection), Err(StoreError::Unavailable(_))));
    assert!(matches!(store.all(&collection), Err(StoreError::Unavailable(_))));
}

#[test]
fn malformed_uri_is_a_backend_error() {
    let err = MongoStore::connect("not-a-uri").unwrap_err();
    assert!(!err.is_connectivity());
}
