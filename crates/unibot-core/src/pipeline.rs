//! Retrieval-augmented answer pipeline.
//!
//! One [`AnswerPipeline::answer`] call:
//!
//! 1. retrieves the top `k` passages for the question,
//! 2. joins their contents with a blank line, in rank order,
//! 3. fills the prompt template with context, rendered history and question,
//! 4. invokes the chat model once,
//! 5. returns the completion verbatim.
//!
//! The pipeline has no side effects: appending the exchange to the
//! [`History`] is the caller's job. A failure in either step is reported as
//! [`Error::Pipeline`] tagged with the failing [`PipelineStage`]; there is
//! no retry and no partial answer.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::embedding::Embedder;
use crate::error::{Error, PipelineStage, Result};
use crate::history::History;
use crate::index::Index;
use crate::llm::ChatModel;
use crate::models::ScoredPassage;
use crate::prompt::PromptTemplate;

/// Default number of passages retrieved per question.
pub const DEFAULT_K: usize = 3;

/// A question together with the conversation it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    pub question: &'a str,
    pub history: &'a History,
}

impl<'a> Query<'a> {
    pub fn new(question: &'a str, history: &'a History) -> Self {
        Self { question, history }
    }
}

/// Long-lived answer pipeline, built once and shared by reference.
pub struct AnswerPipeline {
    index: Arc<Index>,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
    template: PromptTemplate,
    k: usize,
}

impl AnswerPipeline {
    pub fn new(
        index: Arc<Index>,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        template: PromptTemplate,
        k: usize,
    ) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidArgument(
                "retrieval k must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            index,
            embedder,
            model,
            template,
            k,
        })
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Answer `query.question` in the context of `query.history`.
    pub async fn answer(&self, query: Query<'_>) -> Result<String> {
        self.answer_with_rendering(query.question, &query.history.render())
            .await
    }

    /// Answer with an already-rendered history string.
    pub async fn answer_with_rendering(
        &self,
        question: &str,
        history_rendering: &str,
    ) -> Result<String> {
        let started = Instant::now();

        let passages = self
            .index
            .search(self.embedder.as_ref(), question, self.k)
            .await
            .map_err(|e| Error::pipeline(PipelineStage::Retrieval, e))?;
        let retrieval_ms = started.elapsed().as_millis() as u64;

        let context = format_passages(&passages);
        let prompt = self.template.fill(&context, history_rendering, question);

        let generation_started = Instant::now();
        let answer = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| Error::pipeline(PipelineStage::Generation, e))?;

        info!(
            passages = passages.len(),
            model = self.model.model_name(),
            "answered question"
        );
        debug!(
            retrieval_ms,
            generation_ms = generation_started.elapsed().as_millis() as u64,
            prompt_chars = prompt.chars().count(),
            "answer timings"
        );
        Ok(answer)
    }
}

/// Passage contents in rank order, separated by a blank line.
pub fn format_passages(passages: &[ScoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.passage.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
