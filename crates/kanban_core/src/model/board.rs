//! Column and task records plus board-level ordering.
//!
//! # Responsibility
//! - Define the persisted column/task shapes (camelCase JSON).
//! - Provide constructors with board defaults and short id allocation.
//! - Provide the pure ordering function applied before publication.
//!
//! # Invariants
//! - `id` values are immutable after creation.
//! - `updated_at` only moves forward.

use crate::model::timestamp::{self, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column identifier (10-character short id).
pub type ColumnId = String;
/// Task identifier (10-character short id).
pub type TaskId = String;

/// Title used when no board title is stored.
pub const DEFAULT_BOARD_TITLE: &str = "Untitled Board";
/// Title assigned to freshly created columns.
pub const DEFAULT_COLUMN_TITLE: &str = "Untitled Column";
/// Content assigned to freshly created tasks.
pub const DEFAULT_TASK_CONTENT: &str = "New Task";

const SHORT_ID_LEN: usize = 10;

/// Allocates a short lowercase alphanumeric identifier.
///
/// Draws from a v4 UUID; callers check for collisions in their namespace.
pub fn generate_short_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SHORT_ID_LEN);
    id
}

/// Unit of work owned by exactly one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Owning column. Rewritten when the task moves.
    pub column_id: ColumnId,
    /// Rank among sibling tasks. Gaps are tolerated.
    pub position: u32,
    pub content: String,
    #[serde(with = "timestamp::iso_millis")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::iso_millis")]
    pub updated_at: Timestamp,
}

impl Task {
    /// Creates a task with a caller-provided id and default content.
    pub fn with_id(id: impl Into<TaskId>, column_id: impl Into<ColumnId>, position: u32) -> Self {
        let created_at = timestamp::now();
        Self {
            id: id.into(),
            column_id: column_id.into(),
            position,
            content: DEFAULT_TASK_CONTENT.to_string(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Returns a replacement carrying new content and a fresh `updated_at`.
    ///
    /// `id`, `column_id`, `position` and `created_at` are preserved.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            updated_at: timestamp::advance(self.updated_at),
            ..self.clone()
        }
    }

    /// Returns a replacement owned by `column_id` at `position`.
    pub fn moved_to(&self, column_id: impl Into<ColumnId>, position: u32) -> Self {
        Self {
            column_id: column_id.into(),
            position,
            updated_at: timestamp::advance(self.updated_at),
            ..self.clone()
        }
    }
}

/// User-named bucket of tasks with a rank on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    /// Rank on the board, set to the column count at creation.
    pub position: u32,
    #[serde(with = "timestamp::iso_millis")]
    pub created_at: Timestamp,
    #[serde(with = "timestamp::iso_millis")]
    pub updated_at: Timestamp,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Column {
    /// Creates an empty column with a caller-provided id.
    pub fn with_id(id: impl Into<ColumnId>, position: u32) -> Self {
        let created_at = timestamp::now();
        Self {
            id: id.into(),
            title: DEFAULT_COLUMN_TITLE.to_string(),
            position,
            created_at,
            updated_at: created_at,
            tasks: Vec::new(),
        }
    }

    /// Looks up one task by id.
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    /// Returns whether this column holds a task with `task_id`.
    pub fn contains_task(&self, task_id: &str) -> bool {
        self.task(task_id).is_some()
    }

    /// Task count as a position value for append semantics.
    pub fn next_task_position(&self) -> u32 {
        u32::try_from(self.tasks.len()).unwrap_or(u32::MAX)
    }

    /// Refreshes `updated_at` so it is strictly later than before.
    pub fn touch(&mut self) {
        self.updated_at = timestamp::advance(self.updated_at);
    }
}

/// Published `{title, columns}` view of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub title: String,
    pub columns: Vec<Column>,
}

/// Orders columns by `position`, and each column's tasks by `position`.
///
/// Both sorts are stable, so equal positions keep their stored order.
pub fn order_columns(mut columns: Vec<Column>) -> Vec<Column> {
    columns.sort_by_key(|column| column.position);
    for column in &mut columns {
        column.tasks.sort_by_key(|task| task.position);
    }
    columns
}

/// Returns a column id not yet used by `columns`.
pub fn fresh_column_id(columns: &[Column]) -> ColumnId {
    loop {
        let id = generate_short_id();
        if !columns.iter().any(|column| column.id == id) {
            return id;
        }
    }
}

/// Returns a task id not yet used anywhere on the board.
pub fn fresh_task_id(columns: &[Column]) -> TaskId {
    loop {
        let id = generate_short_id();
        if !columns.iter().any(|column| column.contains_task(id.as_str())) {
            return id;
        }
    }
}
