//! Synchronous key-value storage substrate for board documents.
//!
//! # Responsibility
//! - Provide `get/set/remove` over string keys and string values.
//! - Keep SQL details behind the `KeyValueStorage` seam.
//!
//! # Invariants
//! - Each call is atomic with respect to other calls on the same storage.
//! - Values are stored verbatim; no encoding is applied here.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from the storage substrate and the document store above it.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Document could not be encoded for persistence.
    Encode(serde_json::Error),
    /// A previous holder of an internal lock panicked.
    LockPoisoned(&'static str),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// A column create succeeded without yielding a new column.
    MissingCreatedColumn,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode board document: {err}"),
            Self::LockPoisoned(name) => write!(f, "board storage lock `{name}` is poisoned"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document storage requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document storage requires table `{table}`")
            }
            Self::MissingCreatedColumn => write!(f, "created column is missing from the store"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::LockPoisoned(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingCreatedColumn => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Durable string key-value storage.
pub trait KeyValueStorage {
    /// Returns the stored value, or `None` when the key is absent.
    fn get_item(&self, key: &str) -> RepoResult<Option<String>>;
    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Removes `key`. Missing keys are ignored.
    fn remove_item(&self, key: &str) -> RepoResult<()>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for &S {
    fn get_item(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> RepoResult<()> {
        (**self).remove_item(key)
    }
}

/// SQLite-backed storage over the `documents` table.
///
/// Owns its connection so that the storage can be shared across threads.
pub struct SqliteKeyValueStorage {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStorage {
    /// Creates storage from a migrated connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_documents_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            error!("event=storage_lock module=repo status=error error_code=lock_poisoned");
            RepoError::LockPoisoned("sqlite_connection")
        })
    }
}

impl KeyValueStorage for SqliteKeyValueStorage {
    fn get_item(&self, key: &str) -> RepoResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> RepoResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> RepoResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM documents WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local storage, lost when dropped.
#[derive(Default)]
pub struct MemoryKeyValueStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> RepoResult<MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| RepoError::LockPoisoned("memory_items"))
    }
}

impl KeyValueStorage for MemoryKeyValueStorage {
    fn get_item(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> RepoResult<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> RepoResult<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

fn ensure_documents_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'documents'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable("documents"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStorage, MemoryKeyValueStorage, RepoError, SqliteKeyValueStorage};
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;

    #[test]
    fn sqlite_storage_sets_overwrites_and_removes() {
        let storage = SqliteKeyValueStorage::try_new(open_db_in_memory().unwrap()).unwrap();
        assert_eq!(storage.get_item("kanban").unwrap(), None);

        storage.set_item("kanban", "[]").unwrap();
        storage.set_item("kanban", "[1]").unwrap();
        assert_eq!(storage.get_item("kanban").unwrap().as_deref(), Some("[1]"));

        storage.remove_item("kanban").unwrap();
        storage.remove_item("kanban").unwrap();
        assert_eq!(storage.get_item("kanban").unwrap(), None);
    }

    #[test]
    fn sqlite_storage_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteKeyValueStorage::try_new(conn)
            .err()
            .expect("unmigrated connection must be rejected");
        assert!(matches!(
            err,
            RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn memory_storage_round_trips_values() {
        let storage = MemoryKeyValueStorage::new();
        storage.set_item("boardTitle", "Sprint").unwrap();
        assert_eq!(
            storage.get_item("boardTitle").unwrap().as_deref(),
            Some("Sprint")
        );
    }
}
