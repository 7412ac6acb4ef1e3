//! FFI board API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the board mutation set as sync functions via FRB.
//! - Apply form-level validation before any mutation reaches core.
//! - Coalesce stale references into "nothing changed" responses.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - A stale column/task id is never reported as a failure.

use kanban_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_board,
    ping as ping_inner, BoardServiceResult, Column, SqliteBoardService, Task,
};
use log::warn;
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::OnceLock;

const BOARD_DB_FILE_NAME: &str = "kanban_board.sqlite3";
const BOARD_DB_PATH_ENV: &str = "KANBAN_DB_PATH";
const COLUMN_TITLE_MAX_CHARS: usize = 20;
const TASK_CONTENT_MAX_CHARS: usize = 250;

static BOARD_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static BOARD: OnceCell<SqliteBoardService> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task as rendered by the board UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    pub column_id: String,
    pub position: u32,
    pub content: String,
    /// ISO-8601 UTC, millisecond precision.
    pub created_at: String,
    /// ISO-8601 UTC, millisecond precision.
    pub updated_at: String,
}

/// Column as rendered by the board UI, tasks in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub id: String,
    pub title: String,
    pub position: u32,
    pub created_at: String,
    pub updated_at: String,
    pub tasks: Vec<TaskView>,
}

/// Full board load envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLoadResponse {
    /// Whether the board could be opened.
    pub ok: bool,
    /// Human-readable response message for diagnostics.
    pub message: String,
    pub title: String,
    /// Columns in display order.
    pub columns: Vec<ColumnView>,
}

/// Generic action response envelope for board mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardActionResponse {
    /// `false` only for validation or storage failures.
    pub ok: bool,
    /// Whether board state was modified.
    pub changed: bool,
    /// Created column/task id, when the action creates one.
    pub entity_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl BoardActionResponse {
    fn changed(message: impl Into<String>, entity_id: Option<String>) -> Self {
        Self {
            ok: true,
            changed: true,
            entity_id,
            message: message.into(),
        }
    }

    fn unchanged(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            changed: false,
            entity_id: None,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            changed: false,
            entity_id: None,
            message: message.into(),
        }
    }
}

/// Loads the board and returns the current published snapshot.
#[flutter_rust_bridge::frb(sync)]
pub fn board_load() -> BoardLoadResponse {
    match board() {
        Ok(service) => {
            let snapshot = service.snapshot();
            BoardLoadResponse {
                ok: true,
                message: format!("Loaded {} column(s).", snapshot.columns.len()),
                title: snapshot.title,
                columns: snapshot.columns.iter().map(to_column_view).collect(),
            }
        }
        Err(err) => BoardLoadResponse {
            ok: false,
            message: format!("board_load failed: {err}"),
            title: kanban_core::DEFAULT_BOARD_TITLE.to_string(),
            columns: Vec::new(),
        },
    }
}

/// Renames the board. Blank titles are rejected.
#[flutter_rust_bridge::frb(sync)]
pub fn board_update_title(title: String) -> BoardActionResponse {
    let title = title.trim();
    if title.is_empty() {
        return BoardActionResponse::failure("Board title is required.");
    }
    with_board("board_update_title", |service| {
        if service.title().as_deref() == Some(title) {
            return Ok(None);
        }
        service.update_board_title(title)?;
        Ok(Some(None))
    })
}

/// Appends a new column to the board.
#[flutter_rust_bridge::frb(sync)]
pub fn board_create_column() -> BoardActionResponse {
    with_board("board_create_column", |service| {
        service.create_column().map(|id| Some(Some(id)))
    })
}

/// Renames one column. Titles are required and capped at 20 characters.
#[flutter_rust_bridge::frb(sync)]
pub fn board_rename_column(column_id: String, title: String) -> BoardActionResponse {
    let title = match validate_column_title(title.as_str()) {
        Ok(title) => title,
        Err(message) => return BoardActionResponse::failure(message),
    };
    with_board("board_rename_column", |service| {
        let current = service
            .columns()
            .into_iter()
            .find(|column| column.id == column_id)
            .map(|column| column.title);
        if current.as_deref() == Some(title) {
            return Ok(None);
        }
        service.update_column_title(title, column_id.as_str())?;
        Ok(Some(None))
    })
}

/// Deletes one column and all of its tasks.
#[flutter_rust_bridge::frb(sync)]
pub fn board_delete_column(column_id: String) -> BoardActionResponse {
    with_board("board_delete_column", |service| {
        service.delete_column(column_id.as_str())?;
        Ok(Some(None))
    })
}

/// Appends a default task to one column.
#[flutter_rust_bridge::frb(sync)]
pub fn board_create_task(column_id: String) -> BoardActionResponse {
    with_board("board_create_task", |service| {
        service
            .create_task(column_id.as_str())
            .map(|id| Some(Some(id)))
    })
}

/// Moves one task to the end of another (or the same) column.
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_task(
    task_id: String,
    from_column_id: String,
    to_column_id: String,
) -> BoardActionResponse {
    with_board("board_move_task", |service| {
        service.move_task(
            task_id.as_str(),
            from_column_id.as_str(),
            to_column_id.as_str(),
        )?;
        Ok(Some(None))
    })
}

/// Replaces one task's content. Content is required and capped at 250 characters.
#[flutter_rust_bridge::frb(sync)]
pub fn board_update_task(column_id: String, task_id: String, content: String) -> BoardActionResponse {
    if let Err(message) = validate_task_content(content.as_str()) {
        return BoardActionResponse::failure(message);
    }
    with_board("board_update_task", |service| {
        let current = service
            .columns()
            .into_iter()
            .find(|column| column.id == column_id)
            .and_then(|column| column.task(task_id.as_str()).map(|task| task.content.clone()));
        if current.as_deref() == Some(content.as_str()) {
            return Ok(None);
        }
        service.update_task_content(column_id.as_str(), task_id.as_str(), content.as_str())?;
        Ok(Some(None))
    })
}

/// Deletes one task from one column.
#[flutter_rust_bridge::frb(sync)]
pub fn board_delete_task(column_id: String, task_id: String) -> BoardActionResponse {
    with_board("board_delete_task", |service| {
        service.delete_task(column_id.as_str(), task_id.as_str())?;
        Ok(Some(None))
    })
}

fn validate_column_title(title: &str) -> Result<&str, String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("Column title is required.".to_string());
    }
    if trimmed.chars().count() > COLUMN_TITLE_MAX_CHARS {
        return Err(format!(
            "Column title must be at most {COLUMN_TITLE_MAX_CHARS} characters."
        ));
    }
    Ok(trimmed)
}

fn validate_task_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Task content is required.".to_string());
    }
    if content.chars().count() > TASK_CONTENT_MAX_CHARS {
        return Err(format!(
            "Task content must be at most {TASK_CONTENT_MAX_CHARS} characters."
        ));
    }
    Ok(())
}

fn resolve_board_db_path() -> PathBuf {
    BOARD_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(BOARD_DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(BOARD_DB_FILE_NAME)
        })
        .clone()
}

fn board() -> BoardServiceResult<&'static SqliteBoardService> {
    BOARD.get_or_try_init(|| open_board(resolve_board_db_path()))
}

/// Runs one mutation and maps its outcome to a response.
///
/// `Ok(None)` means the request matched current state; `Ok(Some(id))` means
/// the board changed, optionally creating `id`.
fn with_board(
    action: &str,
    f: impl FnOnce(&SqliteBoardService) -> BoardServiceResult<Option<Option<String>>>,
) -> BoardActionResponse {
    let outcome = board().and_then(f);
    match outcome {
        Ok(Some(entity_id)) => BoardActionResponse::changed("Board updated.", entity_id),
        Ok(None) => BoardActionResponse::unchanged("No changes."),
        Err(err) if err.is_not_found() => {
            warn!("event=stale_reference module=ffi status=skipped action={action} error={err}");
            BoardActionResponse::unchanged("No changes.")
        }
        Err(err) => BoardActionResponse::failure(format!("{action} failed: {err}")),
    }
}

fn to_column_view(column: &Column) -> ColumnView {
    ColumnView {
        id: column.id.clone(),
        title: column.title.clone(),
        position: column.position,
        created_at: kanban_core::model::timestamp::to_iso_string(column.created_at),
        updated_at: kanban_core::model::timestamp::to_iso_string(column.updated_at),
        tasks: column.tasks.iter().map(to_task_view).collect(),
    }
}

fn to_task_view(task: &Task) -> TaskView {
    TaskView {
        id: task.id.clone(),
        column_id: task.column_id.clone(),
        position: task.position,
        content: task.content.clone(),
        created_at: kanban_core::model::timestamp::to_iso_string(task.created_at),
        updated_at: kanban_core::model::timestamp::to_iso_string(task.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        board_create_column, board_create_task, board_delete_column, board_delete_task,
        board_load, board_move_task, board_rename_column, board_update_task, core_version,
        init_logging, ping, validate_column_title, validate_task_content,
    };

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/kanban-logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn column_title_validation_trims_and_caps_length() {
        assert_eq!(validate_column_title("  Doing  ").unwrap(), "Doing");
        assert!(validate_column_title("   ").is_err());
        assert!(validate_column_title(&"x".repeat(21)).is_err());
        assert!(validate_column_title(&"é".repeat(20)).is_ok());
    }

    #[test]
    fn task_content_validation_caps_length() {
        assert!(validate_task_content("").is_err());
        assert!(validate_task_content(&"a".repeat(250)).is_ok());
        assert!(validate_task_content(&"a".repeat(251)).is_err());
    }

    #[test]
    fn board_flow_creates_edits_moves_and_deletes() {
        let created = board_create_column();
        assert!(created.ok, "{}", created.message);
        let source = created.entity_id.expect("column id");
        let destination = board_create_column()
            .entity_id
            .expect("second column id");

        let renamed = board_rename_column(source.clone(), "Doing".to_string());
        assert!(renamed.ok && renamed.changed, "{}", renamed.message);
        let same = board_rename_column(source.clone(), " Doing ".to_string());
        assert!(same.ok && !same.changed);

        let task = board_create_task(source.clone());
        let task_id = task.entity_id.expect("task id");
        let edited = board_update_task(source.clone(), task_id.clone(), "hello".to_string());
        assert!(edited.changed, "{}", edited.message);

        let moved = board_move_task(task_id.clone(), source.clone(), destination.clone());
        assert!(moved.changed, "{}", moved.message);

        let loaded = board_load();
        assert!(loaded.ok, "{}", loaded.message);
        let column = loaded
            .columns
            .iter()
            .find(|column| column.id == destination)
            .expect("destination column is loaded");
        let view = column
            .tasks
            .iter()
            .find(|view| view.id == task_id)
            .expect("moved task is in destination");
        assert_eq!(view.content, "hello");
        assert_eq!(view.column_id, destination);

        assert!(board_delete_task(destination.clone(), task_id).changed);
        assert!(board_delete_column(source).changed);
        assert!(board_delete_column(destination).changed);
    }

    #[test]
    fn stale_references_are_ok_without_changes() {
        let response = board_delete_column("gone000000".to_string());
        assert!(response.ok);
        assert!(!response.changed);

        let response = board_create_task("gone000000".to_string());
        assert!(response.ok);
        assert!(response.entity_id.is_none());
    }

    #[test]
    fn invalid_input_is_rejected_before_reaching_the_board() {
        let response = board_update_task(
            "any".to_string(),
            "any".to_string(),
            "x".repeat(300),
        );
        assert!(!response.ok);
        assert!(response.message.contains("250"));
    }
}
