//! Language model capability.
//!
//! Providers (OpenAI, Ollama, Hugging Face) live in the `unibot` crate.

use anyhow::Result;
use async_trait::async_trait;

/// A text-completion model: one prompt in, one answer out.
///
/// Each call is attempted once; implementations do not retry.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete `prompt`, returning the generated text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
