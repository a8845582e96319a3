//! # UniBot
//!
//! A document question-answering assistant. UniBot reads a directory of
//! documents, splits them into overlapping passages, embeds them into a
//! persistent index, and answers questions by retrieving the most similar
//! passages and handing them, together with the recent conversation, to a
//! language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  docs/   │──▶│ Chunker  │──▶│ Index (SQLite)│
//! │ pdf/docx │   │          │   │ build once    │
//! └──────────┘   └──────────┘   └──────┬───────┘
//!                                      │ top-k
//!        ┌──────────┐           ┌──────▼───────┐    ┌─────┐
//!        │ History  │──────────▶│   Pipeline   │───▶│ LLM │
//!        └──────────┘           └──────────────┘    └─────┘
//! ```
//!
//! Pure logic (chunking, index, history, prompt, pipeline) lives in the
//! `unibot-core` crate. This crate adds configuration, document loading,
//! provider clients, SQLite persistence, and the `unibot` CLI.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`credentials`] | `.env` and environment credentials |
//! | [`loader`] | Per-format document loaders |
//! | [`corpus`] | Directory walk, loading, chunking |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Language model providers |
//! | [`sqlite_store`] | Persistent index store |
//! | [`session`] | Chat session with history and apology handling |
//! | [`commands`] | CLI command implementations |

pub mod commands;
pub mod config;
pub mod corpus;
pub mod credentials;
pub mod embedding;
pub mod llm;
pub mod loader;
pub mod session;
pub mod sqlite_store;
