//! # MACON Document
//!
//! Dynamic document values for MACON Sync.
//!
//! This crate provides:
//! - [`Value`], a dynamic, insertion-ordered document tree
//! - [`RecordId`], the opaque identity a document database assigns to a record
//! - [`path`], get/set of a value at a dotted path
//! - JSON rendering and identity stringification for exports
//!
//! ## Paths
//!
//! A path is a `.`-separated list of segments. Every segment is a map key;
//! array indices have no special meaning, so `language.available.0` addresses
//! the key `"0"` of the map at `language.available`.
//!
//! ```
//! use macon_document::{path, Value};
//!
//! let mut doc = Value::empty_map();
//! path::set(&mut doc, "user.defaultUser.username", Value::from("alice"));
//!
//! assert_eq!(
//!     path::get(&doc, "user.defaultUser.username"),
//!     Some(&Value::from("alice"))
//! );
//! assert_eq!(path::get(&doc, "user.missing"), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod id;
mod json;
pub mod path;
mod value;

pub use error::{DocumentError, DocumentResult};
pub use id::RecordId;
pub use json::{from_json, stringify_ids, to_json};
pub use value::{Map, Value};
