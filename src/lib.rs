//! Book catalog service
//!
//! JSON CRUD over a single SQLite table. The `books` module carries the
//! models, validation, storage and handlers; the workspace crates provide
//! settings, the database pool, the HTTP server and telemetry.

pub mod modules;

pub use modules::*;
