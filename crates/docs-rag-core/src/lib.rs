//! # docs-rag core
//!
//! Shared, I/O-free logic for docs-rag: the line record model, the
//! [`store::DocumentStore`] abstraction, id allocation and file
//! reconciliation, and chat prompt construction.
//!
//! This crate contains no tokio, sqlx, or filesystem access. Callers read
//! files and hand their contents in; storage is reached only through the
//! store trait.

pub mod lines;
pub mod models;
pub mod prompt;
pub mod reconcile;
pub mod store;
