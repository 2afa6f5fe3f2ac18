//! # docs-rag
//!
//! Chat with a folder of plain-text documents.
//!
//! Each non-blank line of every file is stored as its own record, with the
//! filename and line number as metadata. Questions are answered by a model
//! behind an OpenAI-compatible API, using the most similar lines as
//! context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ docs-rag-load│──▶│  Reconciler  │──▶│  SQLite   │
//! │ docs-rag-    │   │ (core crate) │   │ FTS5+Vec  │
//! │   modify     │   └──────────────┘   └────┬─────┘
//! └──────────────┘                           │
//!                                            ▼
//!                  ┌──────────┐       ┌────────────┐
//!                  │   LLM    │◀──────│ Responder  │◀── docs-rag-chat (HTTP)
//!                  └──────────┘       └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docs-rag-load --data_directory docs --persist_directory chroma_storage
//! docs-rag-chat --config settings.yaml
//! docs-rag-modify --config settings.yaml --update guide.txt
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | YAML/TOML settings |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite document store |
//! | [`embedding`] | Optional embedding providers |
//! | [`ingest`] | Load tool |
//! | [`modify`] | Update/delete tool |
//! | [`llm`] | Streaming chat-completion client |
//! | [`chat`] | Retrieval-augmented responder |
//! | [`history`] | CSV chat and feedback logs |
//! | [`server`] | HTTP front end |

pub mod chat;
pub mod config;
pub mod db;
pub mod embedding;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod modify;
pub mod progress;
pub mod server;
pub mod sqlite_store;
