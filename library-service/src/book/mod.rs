//! Book management module.
//!
//! Provides the book operations of the catalog:
//! - Command handlers for adding books and replacing their author sets
//! - Query manager for single books and per-author book streams
//! - Repository abstraction for data persistence

/// Book creation command handler.
pub mod add_book_command;

/// Book query manager for data retrieval.
pub mod query_manager;

/// Book repository abstraction and implementations.
pub mod repository;

/// Book update command handler.
pub mod update_book_command;
