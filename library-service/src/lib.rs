//! Library catalog service.
//!
//! Authors and books in a many-to-many relation, served over gRPC and an
//! HTTP/JSON gateway, backed by memory or `PostgreSQL`.

pub mod adapter;
pub mod app;
pub mod author;
pub mod book;
pub mod config;
pub mod error;
pub mod gateway;
pub mod migration;
pub mod tracing;
pub mod validation;
