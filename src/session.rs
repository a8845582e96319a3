//! Interactive chat session.
//!
//! A [`ChatSession`] owns one conversation [`History`] and drives the
//! shared [`AnswerPipeline`]. It appends each exchange after the answer
//! call, clears history on reset, and turns a failed answer into a fixed
//! apology so the conversation can continue.

use tracing::error;

use unibot_core::history::History;
use unibot_core::pipeline::{AnswerPipeline, Query};
use unibot_core::Result;

/// Reply shown when an answer call fails.
pub const APOLOGY: &str = "Sorry, I ran into an error.";

/// What a line of user input asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Reset,
    Empty,
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Command::Empty,
            "exit" | "quit" => Command::Exit,
            "reset" | "clear" => Command::Reset,
            _ => Command::Ask(trimmed.to_string()),
        }
    }
}

pub struct ChatSession<'a> {
    pipeline: &'a AnswerPipeline,
    history: History,
}

impl<'a> ChatSession<'a> {
    pub fn new(pipeline: &'a AnswerPipeline, max_length: usize) -> Result<Self> {
        Ok(Self {
            pipeline,
            history: History::new(max_length)?,
        })
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Answer `question` and record the exchange.
    ///
    /// On failure the error is logged, the apology is recorded as the
    /// assistant turn, and the apology is returned.
    pub async fn ask(&mut self, question: &str) -> String {
        let answer = match self.pipeline.answer(Query::new(question, &self.history)).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, code = e.code(), "failed to answer question");
                APOLOGY.to_string()
            }
        };
        self.history.push_exchange(question, answer.clone());
        answer
    }
}
