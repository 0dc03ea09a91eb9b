//! # MACON Mongo
//!
//! MongoDB document store for MACON Sync.
//!
//! [`MongoStore`] implements
//! [`DocumentStore`](macon_sync_engine::DocumentStore) over the driver's
//! blocking API. Values cross the boundary through [`convert`]:
//!
//! | BSON                | value      |
//! |---------------------|------------|
//! | `ObjectId`          | `Id`       |
//! | `DateTime`          | `DateTime` |
//! | `Int32`, `Int64`    | `Integer`  |
//! | `Double`            | `Float`    |
//! | `Document`, `Array` | `Map`, `Array` |
//! | anything else       | `Text`     |

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
mod store;

pub use store::MongoStore;
