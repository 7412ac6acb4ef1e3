//! CLI probe for the kanban core.
//!
//! # Responsibility
//! - Without arguments, verify `kanban_core` linkage.
//! - With a database path, print the board in display order.

use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(db_path) = std::env::args_os().nth(1) else {
        println!("kanban_core ping={}", kanban_core::ping());
        println!("kanban_core version={}", kanban_core::core_version());
        return ExitCode::SUCCESS;
    };

    let service = match kanban_core::open_board(&db_path) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("failed to open board `{}`: {err}", db_path.to_string_lossy());
            return ExitCode::FAILURE;
        }
    };

    let snapshot = service.snapshot();
    println!("{}", snapshot.title);
    for column in &snapshot.columns {
        println!("[{}] {} ({})", column.position, column.title, column.id);
        for task in &column.tasks {
            let first_line = task.content.lines().next().unwrap_or_default();
            println!("    {}. {} ({})", task.position, first_line, task.id);
        }
    }
    ExitCode::SUCCESS
}
