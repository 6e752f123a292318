//! Tracing and observability module.
//!
//! Provides log output and span export for the library service.

/// Tracer configuration and initialization.
pub mod tracer;
