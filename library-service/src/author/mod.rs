//! Author management module.
//!
//! Provides the author operations of the catalog:
//! - Command handlers for registration and renaming
//! - Query manager for retrieving author data
//! - Repository abstraction for data persistence

/// Author rename command handler.
pub mod change_author_command;

/// Author query manager for data retrieval.
pub mod query_manager;

/// Author registration command handler.
pub mod register_author_command;

/// Author repository abstraction and implementations.
pub mod repository;
