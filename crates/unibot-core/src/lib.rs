//! # UniBot Core
//!
//! Shared logic for UniBot: data models, chunking, the vector index and
//! its storage abstraction, conversation history, the prompt template, and
//! the retrieval-augmented answer pipeline.
//!
//! This crate contains no filesystem, database, or network code. Embedding
//! and language models are reached through the [`embedding::Embedder`] and
//! [`llm::ChatModel`] traits; persistence through [`store::IndexStore`].
//! The `unibot` application crate supplies the concrete implementations.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod store;

pub use error::{Error, Result};
