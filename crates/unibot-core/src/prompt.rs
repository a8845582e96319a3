//! Instruction template with `{context}`, `{chat_history}` and `{question}`
//! slots.
//!
//! Filling is a literal, single pass over the template: a slot marker that
//! appears inside a substituted value is emitted as-is and never expanded.

use crate::error::{Error, Result};

pub const CONTEXT_SLOT: &str = "{context}";
pub const HISTORY_SLOT: &str = "{chat_history}";
pub const QUESTION_SLOT: &str = "{question}";

const SLOTS: [&str; 3] = [CONTEXT_SLOT, HISTORY_SLOT, QUESTION_SLOT];

/// Built-in instruction text for the university document assistant.
pub const DEFAULT_TEMPLATE: &str = "\
You are UniBot, an assistant that answers questions about the university using its documents.

Answer ONLY from the context below. If the context does not contain enough information to answer, \
say that you cannot answer from the available documents instead of guessing.
Reply in the same language the user writes in.
Format lists as bullet points and write dates out in full so they are easy to read.

Context:
{context}

Conversation so far:
{chat_history}

Question: {question}

Answer:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    /// A user-supplied template. Each slot must appear exactly once.
    pub fn custom(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        for slot in SLOTS {
            let count = text.matches(slot).count();
            if count != 1 {
                return Err(Error::InvalidArgument(format!(
                    "prompt template must contain {} exactly once, found {}",
                    slot, count
                )));
            }
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute the three slots in a single left-to-right pass.
    pub fn fill(&self, context: &str, chat_history: &str, question: &str) -> String {
        let mut out = String::with_capacity(
            self.text.len() + context.len() + chat_history.len() + question.len(),
        );
        let mut rest = self.text.as_str();

        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            let hit = SLOTS.iter().find(|slot| tail.starts_with(*slot));
            match hit {
                Some(&slot) => {
                    let value = match slot {
                        CONTEXT_SLOT => context,
                        HISTORY_SLOT => chat_history,
                        _ => question,
                    };
                    out.push_str(value);
                    rest = &tail[slot.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}
