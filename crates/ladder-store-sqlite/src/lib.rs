//! SQLite backend for the Ladder practice store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Attempt recording runs in a single
//! `BEGIN IMMEDIATE` transaction guarded by a unique index on
//! `(session_id, item_id)`.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
