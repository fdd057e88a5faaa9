//! Core types and rating engine for Ladder, an adaptive practice engine.
//!
//! This crate is deliberately free of database dependencies. It holds the
//! pure parts of the engine (rating math, candidate selection, category
//! priorities, attempt scoring) and the [`store::PracticeStore`] trait that
//! storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod answer;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod priority;
pub mod rating;
pub mod record;
pub mod select;
pub mod store;

pub use error::{Classify, Error, ErrorKind, Result};
