use kanban_core::db::open_db_in_memory;
use kanban_core::{
    BoardRepository, Column, DocumentBoardRepository, KeyValueStorage, SqliteKeyValueStorage,
    Task, COLUMNS_KEY, DEFAULT_BOARD_TITLE, DEFAULT_COLUMN_TITLE, TITLE_KEY,
};

fn setup() -> DocumentBoardRepository<SqliteKeyValueStorage> {
    let storage = SqliteKeyValueStorage::try_new(open_db_in_memory().unwrap()).unwrap();
    let repo = DocumentBoardRepository::new(storage);
    repo.initialize().unwrap();
    repo
}

fn stored_columns(repo: &DocumentBoardRepository<SqliteKeyValueStorage>) -> Option<String> {
    repo.storage().get_item(COLUMNS_KEY).unwrap()
}

#[test]
fn initialize_is_idempotent_on_sqlite() {
    let repo = setup();
    repo.create_column(0).unwrap();
    let before = stored_columns(&repo);

    repo.initialize().unwrap();

    assert_eq!(stored_columns(&repo), before);
    assert_eq!(
        repo.storage().get_item(TITLE_KEY).unwrap().as_deref(),
        Some(DEFAULT_BOARD_TITLE)
    );
}

#[test]
fn empty_stored_title_reads_as_default() {
    let repo = setup();
    repo.storage().set_item(TITLE_KEY, "").unwrap();
    assert_eq!(repo.get_title().unwrap(), DEFAULT_BOARD_TITLE);
}

#[test]
fn persisted_layout_uses_camel_case_and_iso_timestamps() {
    let repo = setup();
    let mut column = repo.create_column(0).unwrap().remove(0);
    column.tasks.push(Task::with_id("task000001", column.id.clone(), 0));
    repo.update_column(&column).unwrap();

    let raw = stored_columns(&repo).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let stored_column = &value[0];
    assert_eq!(stored_column["title"], DEFAULT_COLUMN_TITLE);
    assert_eq!(stored_column["position"], 0);
    let stored_task = &stored_column["tasks"][0];
    assert_eq!(stored_task["columnId"], column.id.as_str());
    assert_eq!(stored_task["content"], "New Task");

    let created_at = stored_task["createdAt"].as_str().unwrap();
    assert_eq!(created_at.len(), "2024-01-02T03:04:05.678Z".len());
    assert!(created_at.ends_with('Z'));
}

#[test]
fn reads_documents_written_by_a_browser_build() {
    let repo = setup();
    let payload = r#"[{"id":"abc123defg","title":"Doing","position":0,
        "createdAt":"2024-03-01T10:00:00.000Z","updatedAt":"2024-03-01T10:05:00.000Z",
        "tasks":[{"id":"tsk0000001","columnId":"abc123defg","position":0,"content":"Ship it",
        "createdAt":"2024-03-01T10:01:00.000Z","updatedAt":"2024-03-01T10:02:00.000Z"}]}]"#;
    repo.storage().set_item(COLUMNS_KEY, payload).unwrap();

    let columns = repo.get_columns().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].title, "Doing");
    assert_eq!(columns[0].tasks[0].content, "Ship it");
    assert!(columns[0].tasks[0].updated_at > columns[0].tasks[0].created_at);
}

#[test]
fn corrupted_document_resets_to_valid_empty_list() {
    let repo = setup();
    repo.storage()
        .set_item(COLUMNS_KEY, "{\"truncated\": [")
        .unwrap();

    assert!(repo.get_columns().unwrap().is_empty());

    let raw = stored_columns(&repo).unwrap();
    let reparsed: Vec<Column> = serde_json::from_str(&raw).unwrap();
    assert!(reparsed.is_empty());
}

#[test]
fn mutations_on_corrupted_document_start_from_empty() {
    let repo = setup();
    repo.storage().set_item(COLUMNS_KEY, "not json").unwrap();

    let columns = repo.create_column(0).unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(repo.get_columns().unwrap(), columns);
}

#[test]
fn delete_column_cascades_tasks_and_ignores_unknown_ids() {
    let repo = setup();
    repo.create_column(0).unwrap();
    let mut doomed = repo.create_column(1).unwrap().remove(1);
    doomed.tasks.push(Task::with_id("task000001", doomed.id.clone(), 0));
    repo.update_column(&doomed).unwrap();

    let remaining = repo.delete_column(doomed.id.as_str()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining
        .iter()
        .all(|column| !column.contains_task("task000001")));

    let unchanged = repo.delete_column("missing000").unwrap();
    assert_eq!(unchanged, remaining);
}

#[test]
fn delete_task_in_unknown_column_is_a_no_op() {
    let repo = setup();
    repo.create_column(0).unwrap();
    let before = stored_columns(&repo);

    let columns = repo.delete_task("missing000", "task000001").unwrap();

    assert_eq!(columns.len(), 1);
    assert_eq!(stored_columns(&repo), before);
}
