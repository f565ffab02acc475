//! DocumentStore — redb-backed document persistence for the inspector.
//!
//! Documents are JSON objects stored in one redb table per collection and
//! keyed by name. Writes are field-level upserts: a missing document is
//! created, an existing one has only the given fields replaced. The store
//! supports both on-disk and in-memory backends (the latter for testing).
//!
//! A read-only handle never creates or writes the file. redb holds an
//! exclusive lock for a writer, so it cannot be taken while a writer has the
//! file open; that case is reported as [`StoreError::Locked`].

use std::path::Path;
use std::sync::Arc;

use redb::{
    Database, DatabaseError, ReadOnlyDatabase, ReadTransaction, ReadableDatabase, ReadableTable,
    TableError, WriteTransaction,
};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::Document;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// The persistence operations the crawler relies on.
///
/// There are no multi-document transactions: each call stands alone.
pub trait SnapshotStore: Send + Sync {
    /// Read one document by name. `None` if the document does not exist.
    fn find_one(&self, collection: &str, name: &str) -> StoreResult<Option<Document>>;

    /// Upsert-merge `fields` into a document, creating it if absent.
    /// Fields not named in `fields` are left untouched.
    fn update_one(&self, collection: &str, name: &str, fields: Document) -> StoreResult<()>;
}

enum Handle {
    ReadWrite(Database),
    ReadOnly(ReadOnlyDatabase),
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::ReadWrite(_) => f.write_str("ReadWrite"),
            Handle::ReadOnly(_) => f.write_str("ReadOnly"),
        }
    }
}

impl Handle {
    fn begin_read(&self) -> StoreResult<ReadTransaction> {
        let txn = match self {
            Handle::ReadWrite(db) => db.begin_read(),
            Handle::ReadOnly(db) => db.begin_read(),
        };
        txn.map_err(map_err!(Transaction))
    }

    fn begin_write(&self) -> StoreResult<WriteTransaction> {
        match self {
            Handle::ReadWrite(db) => db.begin_write().map_err(map_err!(Transaction)),
            Handle::ReadOnly(_) => Err(StoreError::ReadOnly),
        }
    }
}

/// Thread-safe document store backed by redb.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    db: Arc<Handle>,
}

impl DocumentStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(|e| open_error(path, e))?;
        let store = Self {
            db: Arc::new(Handle::ReadWrite(db)),
        };
        store.ensure_tables()?;
        debug!(?path, "document store opened");
        Ok(store)
    }

    /// Open an existing store for reading only.
    ///
    /// Fails if the file does not exist. Writes return [`StoreError::ReadOnly`].
    pub fn open_read_only(path: &Path) -> StoreResult<Self> {
        let db = ReadOnlyDatabase::open(path).map_err(|e| open_error(path, e))?;
        debug!(?path, "document store opened read-only");
        Ok(Self {
            db: Arc::new(Handle::ReadOnly(db)),
        })
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self {
            db: Arc::new(Handle::ReadWrite(db)),
        };
        store.ensure_tables()?;
        debug!("in-memory document store opened");
        Ok(store)
    }

    /// Create the known collections if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        for collection in KNOWN_COLLECTIONS {
            // Opening a table in a write transaction creates it if absent.
            txn.open_table(collection_table(collection))
                .map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// List every document in a collection, ordered by name.
    pub fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(collection_table(collection)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Table(e.to_string())),
        };
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(collection, key.value(), value.value())?);
        }
        Ok(results)
    }
}

impl SnapshotStore for DocumentStore {
    fn find_one(&self, collection: &str, name: &str) -> StoreResult<Option<Document>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(collection_table(collection)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StoreError::Table(e.to_string())),
        };
        match table.get(name).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(collection, name, guard.value())?)),
            None => Ok(None),
        }
    }

    fn update_one(&self, collection: &str, name: &str, fields: Document) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn
                .open_table(collection_table(collection))
                .map_err(map_err!(Table))?;
            let mut doc = match table.get(name).map_err(map_err!(Read))? {
                Some(guard) => decode(collection, name, guard.value())?,
                None => {
                    let mut doc = Document::new();
                    doc.insert(NAME_FIELD.to_string(), name.into());
                    doc
                }
            };
            let updated = fields.len();
            doc.extend(fields);
            let value = serde_json::to_vec(&doc).map_err(map_err!(Serialize))?;
            table
                .insert(name, value.as_slice())
                .map_err(map_err!(Write))?;
            debug!(%collection, %name, fields = updated, "document upserted");
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

fn open_error(path: &Path, err: DatabaseError) -> StoreError {
    match err {
        DatabaseError::DatabaseAlreadyOpen => StoreError::Locked(path.display().to_string()),
        other => StoreError::Open(other.to_string()),
    }
}

fn decode(collection: &str, name: &str, bytes: &[u8]) -> StoreResult<Document> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(map_err!(Deserialize))?;
    match value {
        serde_json::Value::Object(doc) => Ok(doc),
        other => Err(StoreError::Malformed {
            collection: collection.to_string(),
            name: name.to_string(),
            reason: format!("expected an object, found {other}"),
        }),
    }
}
