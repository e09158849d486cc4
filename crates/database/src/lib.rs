//! # Ledger Database Crate
//!
//! This crate is the application-specific interface to the canonical
//! observation ledger, a SQLite file.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application sees
//!   `RawObservation` rows and never a connection.
//! - **Snapshot reads:** Report paths fetch inside one read transaction and
//!   open the file read-only, so the analytics always work on a consistent,
//!   unmodifiable view.
//! - **Asynchronous & Pooled:** Access goes through a `SqlitePool`; the
//!   analytics that consume the rows are synchronous.
//!
//! ## Public API
//!
//! - `connect`: establishes the connection pool in a given `AccessMode`.
//! - `run_migrations`: applies the embedded schema migrations.
//! - `DbRepository`: snapshot fetch plus the idempotent ledger writer.
//! - `DbError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{AccessMode, connect, resolve_database_url, run_migrations};
pub use error::DbError;
pub use repository::{DbRepository, SeriesCount};
