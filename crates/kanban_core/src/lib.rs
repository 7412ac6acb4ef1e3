//! Core state and persistence for a single kanban board.
//! This crate is the single source of truth for board invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{
    order_columns, BoardSnapshot, Column, ColumnId, Task, TaskId, DEFAULT_BOARD_TITLE,
    DEFAULT_COLUMN_TITLE, DEFAULT_TASK_CONTENT,
};
pub use model::timestamp::Timestamp;
pub use repo::board_repo::{BoardRepository, DocumentBoardRepository, COLUMNS_KEY, TITLE_KEY};
pub use repo::storage::{
    KeyValueStorage, MemoryKeyValueStorage, RepoError, RepoResult, SqliteKeyValueStorage,
};
pub use service::board_service::{BoardService, BoardServiceError, BoardServiceResult};

/// Board service persisted in a SQLite file.
pub type SqliteBoardService = BoardService<DocumentBoardRepository<SqliteKeyValueStorage>>;

/// Opens the board database at `path` and returns an initialized service.
///
/// # Errors
/// - Database open or migration failure.
/// - Document store failure while loading the board.
pub fn open_board(path: impl AsRef<std::path::Path>) -> BoardServiceResult<SqliteBoardService> {
    let conn = db::open_db(path).map_err(RepoError::from)?;
    let storage = SqliteKeyValueStorage::try_new(conn)?;
    let service = BoardService::new(DocumentBoardRepository::new(storage));
    service.initialize()?;
    Ok(service)
}

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, open_board, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn open_board_seeds_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = open_board(dir.path().join("board.sqlite3")).unwrap();
        assert_eq!(service.title().as_deref(), Some("Untitled Board"));
        assert!(service.columns().is_empty());
    }
}
