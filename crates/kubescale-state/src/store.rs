//! StateStore — redb-backed persistence for namespaces and workloads.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).
//!
//! Writes come in two flavours: `put_*` creates or overwrites a record
//! unconditionally, `update_*` only succeeds when the caller's
//! `resource_version` still matches the stored one. Both return the new
//! version.

use std::path::Path;
use std::sync::Arc;

use kubescale_core::ResourceKind;
use redb::{Database, ReadableDatabase, ReadableTable};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(NAMESPACES).map_err(map_err!(Table))?;
        txn.open_table(RESOURCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Namespaces ─────────────────────────────────────────────────

    /// Insert or replace a namespace.
    pub fn put_namespace(&self, ns: &NamespaceRecord) -> StateResult<u64> {
        if ns.name.is_empty() {
            return Err(StateError::Invalid("namespace name must not be empty".to_string()));
        }
        self.write_versioned(NAMESPACES, ns, false)
    }

    /// Update a namespace read earlier; fails on a version mismatch.
    pub fn update_namespace(&self, ns: &NamespaceRecord) -> StateResult<u64> {
        self.write_versioned(NAMESPACES, ns, true)
    }

    pub fn get_namespace(&self, name: &str) -> StateResult<Option<NamespaceRecord>> {
        self.get_json(NAMESPACES, name)
    }

    pub fn list_namespaces(&self) -> StateResult<Vec<NamespaceRecord>> {
        self.scan_json(NAMESPACES, "")
    }

    /// Delete a namespace by name. Returns true if it existed.
    pub fn delete_namespace(&self, name: &str) -> StateResult<bool> {
        self.remove(NAMESPACES, name)
    }

    // ── Resources ──────────────────────────────────────────────────

    /// Insert or replace a resource.
    pub fn put_resource(&self, res: &ResourceRecord) -> StateResult<u64> {
        res.validate()?;
        self.write_versioned(RESOURCES, res, false)
    }

    /// Update a resource read earlier; fails on a version mismatch.
    pub fn update_resource(&self, res: &ResourceRecord) -> StateResult<u64> {
        res.validate()?;
        self.write_versioned(RESOURCES, res, true)
    }

    pub fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> StateResult<Option<ResourceRecord>> {
        self.get_json(RESOURCES, &ResourceRecord::key(kind, namespace, name))
    }

    /// List every resource of one kind, across namespaces.
    pub fn list_resources(&self, kind: ResourceKind) -> StateResult<Vec<ResourceRecord>> {
        self.scan_json(RESOURCES, &format!("{kind}/"))
    }

    pub fn list_all_resources(&self) -> StateResult<Vec<ResourceRecord>> {
        self.scan_json(RESOURCES, "")
    }

    /// Delete a resource. Returns true if it existed.
    pub fn delete_resource(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> StateResult<bool> {
        self.remove(RESOURCES, &ResourceRecord::key(kind, namespace, name))
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn get_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(&self, table: JsonTable, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let record: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    /// Store `record` with a bumped version. With `check_version`, the
    /// record must exist and its stored version must equal the one the
    /// caller holds.
    fn write_versioned<T: Versioned>(
        &self,
        table: JsonTable,
        record: &T,
        check_version: bool,
    ) -> StateResult<u64> {
        let key = record.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let version;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            let stored = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    let existing: T =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                    Some(existing.resource_version())
                }
                None => None,
            };

            if check_version {
                match stored {
                    None => return Err(StateError::NotFound(key)),
                    Some(found) if found != record.resource_version() => {
                        return Err(StateError::Conflict {
                            key,
                            expected: record.resource_version(),
                            found,
                        });
                    }
                    Some(_) => {}
                }
            }

            version = stored.unwrap_or(0) + 1;
            let mut next = record.clone();
            next.set_resource_version(version);
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version, "record stored");
        Ok(version)
    }

    fn remove(&self, table: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "record deleted");
        Ok(existed)
    }
}
