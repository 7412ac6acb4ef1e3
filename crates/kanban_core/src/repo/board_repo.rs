//! Board document store.
//!
//! # Responsibility
//! - Persist the board title and the column list as two documents.
//! - Recover from corrupted column documents by resetting them.
//!
//! # Invariants
//! - Every mutation is a whole-document read, mutate, write cycle.
//! - Mutations hold the store write lock for the full cycle.
//! - Missing column ids are silent no-ops that return the unchanged list.

use crate::model::board::{fresh_column_id, Column, DEFAULT_BOARD_TITLE};
use crate::repo::storage::{KeyValueStorage, RepoError, RepoResult};
use log::{debug, info, warn};
use std::sync::{Mutex, MutexGuard};

/// Storage key holding the JSON column list.
pub const COLUMNS_KEY: &str = "kanban";
/// Storage key holding the plain board title.
pub const TITLE_KEY: &str = "boardTitle";

const EMPTY_COLUMNS_DOCUMENT: &str = "[]";

/// Document store contract consumed by the board service.
pub trait BoardRepository {
    /// Seeds missing documents with defaults. Idempotent.
    fn initialize(&self) -> RepoResult<()>;
    /// Returns the stored title, or the default title when missing.
    fn get_title(&self) -> RepoResult<String>;
    /// Stores `title` verbatim and echoes it back.
    fn set_title(&self, title: &str) -> RepoResult<String>;
    /// Returns all columns in stored order.
    fn get_columns(&self) -> RepoResult<Vec<Column>>;
    /// Appends a new default column at `position` and returns the full list.
    fn create_column(&self, position: u32) -> RepoResult<Vec<Column>>;
    /// Replaces the column with the same id and returns the full list.
    fn update_column(&self, column: &Column) -> RepoResult<Vec<Column>>;
    /// Replaces every listed column in one write and returns the full list.
    ///
    /// Columns whose id is not stored are skipped.
    fn update_columns(&self, updates: &[Column]) -> RepoResult<Vec<Column>>;
    /// Removes the column (and its tasks) and returns the full list.
    fn delete_column(&self, column_id: &str) -> RepoResult<Vec<Column>>;
    /// Removes one task from one column and returns the full list.
    fn delete_task(&self, column_id: &str, task_id: &str) -> RepoResult<Vec<Column>>;
}

/// `BoardRepository` over any key-value storage.
pub struct DocumentBoardRepository<S: KeyValueStorage> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStorage> DocumentBoardRepository<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| RepoError::LockPoisoned("document_write"))
    }

    fn read_columns(&self) -> RepoResult<Vec<Column>> {
        let Some(raw) = self.storage.get_item(COLUMNS_KEY)? else {
            return Ok(Vec::new());
        };
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Vec<Column>>(raw.as_str()) {
            Ok(columns) => Ok(columns),
            Err(err) => {
                warn!(
                    "event=columns_reset module=repo status=recovered reason=decode_failed payload_bytes={} error={}",
                    raw.len(),
                    err
                );
                self.storage.set_item(COLUMNS_KEY, EMPTY_COLUMNS_DOCUMENT)?;
                Ok(Vec::new())
            }
        }
    }

    fn write_columns(&self, columns: &[Column]) -> RepoResult<()> {
        let payload = serde_json::to_string(columns)?;
        self.storage.set_item(COLUMNS_KEY, payload.as_str())
    }

    fn position_of(columns: &[Column], column_id: &str) -> Option<usize> {
        columns.iter().position(|column| column.id == column_id)
    }
}

impl<S: KeyValueStorage> BoardRepository for DocumentBoardRepository<S> {
    fn initialize(&self) -> RepoResult<()> {
        let _guard = self.lock()?;

        let columns_missing = self
            .storage
            .get_item(COLUMNS_KEY)?
            .map_or(true, |raw| raw.is_empty());
        if columns_missing {
            self.storage.set_item(COLUMNS_KEY, EMPTY_COLUMNS_DOCUMENT)?;
        }

        let title_missing = self
            .storage
            .get_item(TITLE_KEY)?
            .map_or(true, |raw| raw.is_empty());
        if title_missing {
            self.storage.set_item(TITLE_KEY, DEFAULT_BOARD_TITLE)?;
        }

        if columns_missing || title_missing {
            info!(
                "event=store_seed module=repo status=ok columns_seeded={} title_seeded={}",
                columns_missing, title_missing
            );
        }
        Ok(())
    }

    fn get_title(&self) -> RepoResult<String> {
        let title = self
            .storage
            .get_item(TITLE_KEY)?
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| DEFAULT_BOARD_TITLE.to_string());
        Ok(title)
    }

    fn set_title(&self, title: &str) -> RepoResult<String> {
        let _guard = self.lock()?;
        self.storage.set_item(TITLE_KEY, title)?;
        Ok(title.to_string())
    }

    fn get_columns(&self) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        self.read_columns()
    }

    fn create_column(&self, position: u32) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        let mut columns = self.read_columns()?;
        let column = Column::with_id(fresh_column_id(&columns), position);
        debug!(
            "event=column_create module=repo status=ok column_id={} position={}",
            column.id, position
        );
        columns.push(column);
        self.write_columns(&columns)?;
        Ok(columns)
    }

    fn update_column(&self, column: &Column) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        let mut columns = self.read_columns()?;
        let Some(index) = Self::position_of(&columns, column.id.as_str()) else {
            debug!(
                "event=column_update module=repo status=skipped reason=column_not_found column_id={}",
                column.id
            );
            return Ok(columns);
        };
        columns[index] = column.clone();
        self.write_columns(&columns)?;
        Ok(columns)
    }

    fn update_columns(&self, updates: &[Column]) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        let mut columns = self.read_columns()?;
        let mut replaced = 0usize;
        for column in updates {
            match Self::position_of(&columns, column.id.as_str()) {
                Some(index) => {
                    columns[index] = column.clone();
                    replaced += 1;
                }
                None => debug!(
                    "event=column_update module=repo status=skipped reason=column_not_found column_id={}",
                    column.id
                ),
            }
        }
        if replaced > 0 {
            self.write_columns(&columns)?;
        }
        Ok(columns)
    }

    fn delete_column(&self, column_id: &str) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        let mut columns = self.read_columns()?;
        columns.retain(|column| column.id != column_id);
        self.write_columns(&columns)?;
        Ok(columns)
    }

    fn delete_task(&self, column_id: &str, task_id: &str) -> RepoResult<Vec<Column>> {
        let _guard = self.lock()?;
        let mut columns = self.read_columns()?;
        let Some(index) = Self::position_of(&columns, column_id) else {
            debug!(
                "event=task_delete module=repo status=skipped reason=column_not_found column_id={}",
                column_id
            );
            return Ok(columns);
        };
        columns[index].tasks.retain(|task| task.id != task_id);
        self.write_columns(&columns)?;
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardRepository, DocumentBoardRepository, COLUMNS_KEY, TITLE_KEY};
    use crate::model::board::{Task, DEFAULT_BOARD_TITLE, DEFAULT_COLUMN_TITLE};
    use crate::repo::storage::{KeyValueStorage, MemoryKeyValueStorage};

    fn repo() -> DocumentBoardRepository<MemoryKeyValueStorage> {
        DocumentBoardRepository::new(MemoryKeyValueStorage::new())
    }

    #[test]
    fn initialize_seeds_documents_once() {
        let repo = repo();
        repo.initialize().unwrap();
        assert_eq!(
            repo.storage().get_item(COLUMNS_KEY).unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(
            repo.storage().get_item(TITLE_KEY).unwrap().as_deref(),
            Some(DEFAULT_BOARD_TITLE)
        );

        repo.set_title("Sprint 4").unwrap();
        repo.initialize().unwrap();
        assert_eq!(repo.get_title().unwrap(), "Sprint 4");
    }

    #[test]
    fn get_title_falls_back_when_missing() {
        let repo = repo();
        assert_eq!(repo.get_title().unwrap(), DEFAULT_BOARD_TITLE);
        assert_eq!(repo.set_title("Roadmap").unwrap(), "Roadmap");
        assert_eq!(repo.get_title().unwrap(), "Roadmap");
    }

    #[test]
    fn create_column_appends_default_column() {
        let repo = repo();
        repo.initialize().unwrap();
        let columns = repo.create_column(0).unwrap();
        let columns_again = repo.create_column(1).unwrap();

        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].title, DEFAULT_COLUMN_TITLE);
        assert_eq!(columns_again.len(), 2);
        assert_eq!(columns_again[1].position, 1);
        assert_ne!(columns_again[0].id, columns_again[1].id);
    }

    #[test]
    fn update_column_with_unknown_id_returns_list_unchanged() {
        let repo = repo();
        repo.initialize().unwrap();
        let columns = repo.create_column(0).unwrap();
        let before = repo.storage().get_item(COLUMNS_KEY).unwrap();

        let mut stranger = columns[0].clone();
        stranger.id = "missing000".to_string();
        stranger.title = "Nope".to_string();
        let after_update = repo.update_column(&stranger).unwrap();

        assert_eq!(after_update, columns);
        assert_eq!(repo.storage().get_item(COLUMNS_KEY).unwrap(), before);
    }

    #[test]
    fn delete_task_removes_only_the_named_task() {
        let repo = repo();
        repo.initialize().unwrap();
        let mut column = repo.create_column(0).unwrap().remove(0);
        column.tasks.push(Task::with_id("t1", column.id.clone(), 0));
        column.tasks.push(Task::with_id("t2", column.id.clone(), 1));
        repo.update_column(&column).unwrap();

        let columns = repo.delete_task(column.id.as_str(), "t1").unwrap();
        let ids: Vec<&str> = columns[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["t2"]);
        assert_eq!(repo.get_columns().unwrap(), columns);
    }

    #[test]
    fn update_columns_replaces_several_columns_in_one_write() {
        let repo = repo();
        repo.initialize().unwrap();
        repo.create_column(0).unwrap();
        let columns = repo.create_column(1).unwrap();

        let mut first = columns[0].clone();
        let mut second = columns[1].clone();
        first.title = "Todo".to_string();
        second.title = "Done".to_string();
        let mut stranger = columns[0].clone();
        stranger.id = "missing000".to_string();

        let stored = repo.update_columns(&[first, stranger, second]).unwrap();
        let titles: Vec<&str> = stored.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Todo", "Done"]);
        assert_eq!(repo.get_columns().unwrap(), stored);
    }

    #[test]
    fn corrupted_columns_document_is_reset_to_empty() {
        let repo = repo();
        repo.storage().set_item(COLUMNS_KEY, "[{not json").unwrap();

        assert!(repo.get_columns().unwrap().is_empty());
        assert_eq!(
            repo.storage().get_item(COLUMNS_KEY).unwrap().as_deref(),
            Some("[]")
        );
    }
}
