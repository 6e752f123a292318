//! Model definitions for the library service.
//!
//! This module contains the domain models, parsed request structures,
//! and request-level errors for the library API.

/// Author model definitions and utilities.
pub mod author;
/// Book model definitions and utilities.
pub mod book;
/// Request-level errors.
pub mod error;
/// Parsed `Library` service requests.
pub mod library_service;
