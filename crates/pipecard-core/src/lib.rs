//! Core types and trait definitions for pipeline step cards.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the entity model, the store capabilities consumed by the create
//! path, hierarchical identity resolution, and schema validation.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod card;
pub mod error;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod store;

pub use error::{Error, ErrorKind, Level, Result};
