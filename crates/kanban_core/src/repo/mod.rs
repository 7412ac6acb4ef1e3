//! Persistence layer for board documents.
//!
//! # Responsibility
//! - Define the key-value substrate and the document store contracts.
//! - Isolate SQLite and JSON encoding details from the board service.
//!
//! # Invariants
//! - The store never surfaces decode failures; corrupted documents are reset.
//! - Unknown ids never produce errors at this layer.

pub mod board_repo;
pub mod storage;
