//! Board domain model.
//!
//! # Responsibility
//! - Define the column/task records persisted in the board document.
//! - Own the ordering rules used before every publication.
//!
//! # Invariants
//! - A task's `column_id` names the column whose `tasks` list holds it.
//! - Render order is ascending `position` with stable tie handling.

pub mod board;
pub mod timestamp;
