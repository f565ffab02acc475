//! inspector-store — persistence for the colony inspector.
//!
//! Backed by [redb](https://docs.rs/redb), provides a small document store
//! with the two operations the crawler needs: read one document and
//! upsert-merge fields into one document.
//!
//! # Architecture
//!
//! ```text
//! SnapshotStore (trait)
//!   ├── find_one(collection, name)        → Option<Document>
//!   └── update_one(collection, name, fields)  (upsert + field merge)
//!
//! DocumentStore (redb)
//!   └── one table per collection, key = document name, value = JSON object
//!
//! records
//!   └── typed reads/writes of statistics, time series and snapshot marker
//! ```
//!
//! The `DocumentStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod records;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use store::{DocumentStore, SnapshotStore};
pub use types::*;
