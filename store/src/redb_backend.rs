//! Redb-backed persistent storage.

use std::path::Path;

use redb::{Database, TableDefinition};

use crate::backend::Backend;
use crate::error::StoreError;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("faceid");

fn storage(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(e.to_string())
}

/// A durable [`Backend`] stored in a single redb file.
///
/// Every [`Backend::commit`] is one redb write transaction, so a crash
/// mid-commit leaves the file at the previous commit.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Open the database at `path`, creating it (and its parent directory)
    /// if it does not exist yet.
    ///
    /// An existing file that redb cannot open is reported as
    /// [`StoreError::Corrupt`] and left untouched.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = if path.exists() {
            Database::open(path)
                .map_err(|e| StoreError::Corrupt(format!("{}: {e}", path.display())))?
        } else {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).map_err(storage)?;
            }
            Database::create(path).map_err(storage)?
        };

        // Create the table if it doesn't exist.
        let tx = db.begin_write().map_err(storage)?;
        {
            let _table = tx.open_table(TABLE).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        Ok(Self { db })
    }
}

impl Backend for RedbBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;
        Ok(table
            .get(key)
            .map_err(storage)?
            .map(|v| v.value().to_vec()))
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for item in table.range(prefix..).map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_string(), value.value().to_vec()));
        }
        Ok(results)
    }

    fn commit(&self, puts: &[(&str, &[u8])], deletes: &[&str]) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(TABLE).map_err(storage)?;
            for (key, value) in puts {
                table.insert(*key, *value).map_err(storage)?;
            }
            for key in deletes {
                table.remove(*key).map_err(storage)?;
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}
