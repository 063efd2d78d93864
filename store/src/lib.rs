//! Partitioned key/value persistence for the swap board.
//!
//! One embedded database, two tables: the *device* partition holds data
//! private to this machine (its user id, its profile), the *shared*
//! partition holds the site-wide records every neighbor reads and
//! overwrites. The same logical key can hold independent values in each
//! partition. All operations are synchronous whole-value reads and writes;
//! concurrent writers to a shared key are last-write-wins by design.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableDatabase, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const DEVICE_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("device");
const SHARED_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("shared");

/// Which namespace a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Private to this device.
    Device,
    /// Visible to and overwritable by every user of the board.
    Shared,
}

impl Partition {
    fn table(self) -> TableDefinition<'static, &'static str, &'static str> {
        match self {
            Partition::Device => DEVICE_TABLE,
            Partition::Shared => SHARED_TABLE,
        }
    }
}

/// Handle to the board database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LocalStore {
    db: Arc<Database>,
}

impl LocalStore {
    /// Open (or create) the database at `path` and ensure both partition
    /// tables exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)
            .with_context(|| format!("opening board database at {}", path.display()))?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(DEVICE_TABLE)?;
        write_txn.open_table(SHARED_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, key: &str, partition: Partition) -> Result<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(partition.table())?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    pub fn set(&self, key: &str, value: &str, partition: Partition) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(partition.table())?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        debug!(key, ?partition, "stored value");
        Ok(())
    }

    /// Delete a key, returning whether it existed.
    pub fn delete(&self, key: &str, partition: Partition) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(partition.table())?;
            let existed = table.remove(key)?.is_some();
            existed
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Read and JSON-decode a value. A present but unparseable value is an
    /// error; callers decide whether that means "no data".
    pub fn get_json<T: DeserializeOwned>(&self, key: &str, partition: Partition) -> Result<Option<T>> {
        match self.get(key, partition)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("decoding stored value for key {key}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// JSON-encode and store a value, replacing whatever was there.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, partition: Partition) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("encoding value for key {key}"))?;
        self.set(key, &raw, partition)
    }
}
