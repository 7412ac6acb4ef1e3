//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate document store calls into board mutations.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod board_service;
