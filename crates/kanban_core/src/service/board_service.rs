//! Board state manager.
//!
//! # Responsibility
//! - Hold the authoritative in-memory `{title, columns}` snapshot.
//! - Apply column/task mutations as read, modify, write-through, publish.
//! - Expose current values plus change notification for observers.
//!
//! # Invariants
//! - A snapshot is published only after its write-through succeeded.
//! - Published columns (and each column's tasks) are ordered by `position`.
//! - A `*NotFound` result leaves persisted and published state untouched.

use crate::model::board::{
    fresh_task_id, order_columns, BoardSnapshot, Column, ColumnId, Task, TaskId,
    DEFAULT_BOARD_TITLE,
};
use crate::repo::board_repo::BoardRepository;
use crate::repo::storage::RepoError;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;

pub type BoardServiceResult<T> = Result<T, BoardServiceError>;

/// Errors from board service operations.
#[derive(Debug)]
pub enum BoardServiceError {
    /// Referenced column is not on the board.
    ColumnNotFound(ColumnId),
    /// Referenced task is not in the referenced column.
    TaskNotFound { column_id: ColumnId, task_id: TaskId },
    /// Document store failure.
    Repo(RepoError),
}

impl BoardServiceError {
    /// Returns whether this error only reports a stale reference.
    ///
    /// Callers at the UI boundary treat these as "nothing to do".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ColumnNotFound(_) | Self::TaskNotFound { .. })
    }
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnNotFound(id) => write!(f, "column not found: {id}"),
            Self::TaskNotFound { column_id, task_id } => {
                write!(f, "task not found: {task_id} in column {column_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BoardServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Board state manager over a document store.
pub struct BoardService<R: BoardRepository> {
    repo: R,
    title: watch::Sender<Option<String>>,
    columns: watch::Sender<Vec<Column>>,
    mutation_lock: Mutex<()>,
}

impl<R: BoardRepository> BoardService<R> {
    /// Creates an uninitialized service. Call [`BoardService::initialize`]
    /// before reading the published state.
    pub fn new(repo: R) -> Self {
        let (title, _) = watch::channel(None);
        let (columns, _) = watch::channel(Vec::new());
        Self {
            repo,
            title,
            columns,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Returns the document store backing this service.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Loads both documents, publishes them and returns the loaded snapshot.
    ///
    /// Safe to call again; without intervening mutations it yields the
    /// same snapshot.
    pub fn initialize(&self) -> BoardServiceResult<BoardSnapshot> {
        let _guard = self.lock()?;
        self.repo.initialize()?;

        let columns = order_columns(self.repo.get_columns()?);
        let title = self.repo.get_title()?;
        self.columns.send_replace(columns.clone());
        self.title.send_replace(Some(title.clone()));

        info!(
            "event=board_init module=service status=ok column_count={} task_count={}",
            columns.len(),
            columns.iter().map(|column| column.tasks.len()).sum::<usize>()
        );
        Ok(BoardSnapshot { title, columns })
    }

    /// Current published title; `None` before initialization.
    pub fn title(&self) -> Option<String> {
        self.title.borrow().clone()
    }

    /// Current published columns.
    pub fn columns(&self) -> Vec<Column> {
        self.columns.borrow().clone()
    }

    /// Current published state, with the default title before initialization.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            title: self
                .title()
                .unwrap_or_else(|| DEFAULT_BOARD_TITLE.to_string()),
            columns: self.columns(),
        }
    }

    /// Subscribes to title publications. The receiver starts at the current value.
    pub fn subscribe_title(&self) -> watch::Receiver<Option<String>> {
        self.title.subscribe()
    }

    /// Subscribes to column publications. The receiver starts at the current value.
    pub fn subscribe_columns(&self) -> watch::Receiver<Vec<Column>> {
        self.columns.subscribe()
    }

    /// Stores the board title verbatim and republishes it.
    ///
    /// Input is trusted; blank titles are filtered by callers.
    pub fn update_board_title(&self, title: &str) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        let stored = self.repo.set_title(title)?;
        self.title.send_replace(Some(stored));
        Ok(())
    }

    /// Appends a new column at the current in-memory column count.
    pub fn create_column(&self) -> BoardServiceResult<ColumnId> {
        let _guard = self.lock()?;
        let known = self.columns();
        let position = u32::try_from(known.len()).unwrap_or(u32::MAX);
        let stored = self.repo.create_column(position)?;
        let column_id = stored
            .iter()
            .rev()
            .find(|column| !known.iter().any(|existing| existing.id == column.id))
            .map(|column| column.id.clone())
            .ok_or(RepoError::MissingCreatedColumn)?;
        self.publish_columns(stored);
        debug!("event=column_create module=service status=ok column_id={column_id} position={position}");
        Ok(column_id)
    }

    /// Renames one column.
    pub fn update_column_title(&self, new_title: &str, column_id: &str) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        let mut column = self.find_column(column_id)?;
        column.title = new_title.to_string();
        column.touch();
        let stored = self.repo.update_column(&column)?;
        self.publish_columns(stored);
        Ok(())
    }

    /// Deletes one column together with all of its tasks.
    pub fn delete_column(&self, column_id: &str) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        self.find_column(column_id)?;
        let stored = self.repo.delete_column(column_id)?;
        self.publish_columns(stored);
        debug!("event=column_delete module=service status=ok column_id={column_id}");
        Ok(())
    }

    /// Appends a default task to one column.
    pub fn create_task(&self, column_id: &str) -> BoardServiceResult<TaskId> {
        let _guard = self.lock()?;
        let mut column = self.find_column(column_id)?;
        let task_id = fresh_task_id(self.columns.borrow().as_slice());
        let task = Task::with_id(task_id.clone(), column.id.clone(), column.next_task_position());
        column.tasks.push(task);
        let stored = self.repo.update_column(&column)?;
        self.publish_columns(stored);
        Ok(task_id)
    }

    /// Transfers one task to the end of another column.
    ///
    /// Source and destination are replaced in a single document write, so a
    /// failed write leaves the task where it was. Moving within one column
    /// sends the task to the back.
    pub fn move_task(
        &self,
        task_id: &str,
        from_column_id: &str,
        to_column_id: &str,
    ) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        let mut source = self.find_column(from_column_id)?;
        let destination = self.find_column(to_column_id)?;
        let index = source
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| BoardServiceError::TaskNotFound {
                column_id: from_column_id.to_string(),
                task_id: task_id.to_string(),
            })?;

        let task = source.tasks.remove(index);
        let mut destination = if from_column_id == to_column_id {
            source.clone()
        } else {
            destination
        };
        let moved = task.moved_to(destination.id.clone(), destination.next_task_position());
        destination.tasks.push(moved);

        let stored = if from_column_id == to_column_id {
            self.repo.update_columns(std::slice::from_ref(&destination))?
        } else {
            self.repo.update_columns(&[source, destination])?
        };
        self.publish_columns(stored);
        debug!(
            "event=task_move module=service status=ok task_id={task_id} from_column_id={from_column_id} to_column_id={to_column_id}"
        );
        Ok(())
    }

    /// Replaces one task with updated content and a fresh `updated_at`.
    pub fn update_task_content(
        &self,
        column_id: &str,
        task_id: &str,
        content: &str,
    ) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        let mut column = self.find_column(column_id)?;
        let slot = column
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| BoardServiceError::TaskNotFound {
                column_id: column_id.to_string(),
                task_id: task_id.to_string(),
            })?;
        *slot = slot.with_content(content);
        let stored = self.repo.update_column(&column)?;
        self.publish_columns(stored);
        Ok(())
    }

    /// Removes one task from one column.
    pub fn delete_task(&self, column_id: &str, task_id: &str) -> BoardServiceResult<()> {
        let _guard = self.lock()?;
        let column = self.find_column(column_id)?;
        if !column.contains_task(task_id) {
            return Err(BoardServiceError::TaskNotFound {
                column_id: column_id.to_string(),
                task_id: task_id.to_string(),
            });
        }
        let stored = self.repo.delete_task(column_id, task_id)?;
        self.publish_columns(stored);
        Ok(())
    }

    fn find_column(&self, column_id: &str) -> BoardServiceResult<Column> {
        self.columns
            .borrow()
            .iter()
            .find(|column| column.id == column_id)
            .cloned()
            .ok_or_else(|| BoardServiceError::ColumnNotFound(column_id.to_string()))
    }

    fn publish_columns(&self, stored: Vec<Column>) {
        self.columns.send_replace(order_columns(stored));
    }

    fn lock(&self) -> BoardServiceResult<MutexGuard<'_, ()>> {
        self.mutation_lock
            .lock()
            .map_err(|_| BoardServiceError::Repo(RepoError::LockPoisoned("board_mutation")))
    }
}
