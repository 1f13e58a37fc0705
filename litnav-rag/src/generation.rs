//! Answer generation: the [`Generator`] seam and the fixed prompts.

use async_trait::async_trait;

use crate::error::Result;

/// Instruction sent as the system turn of every generation request.
pub const SYSTEM_PROMPT: &str = "You are an academic research assistant.\n\
Answer ONLY using the provided sources.\n\
Cite each claim using [paper_id, year, page, section] as given in the sources.\n\
If evidence is insufficient, say so.\n";

/// A language model that completes a system + user prompt pair.
///
/// Failures should be reported as
/// [`RagError::CollaboratorUnavailable`](crate::RagError::CollaboratorUnavailable)
/// with [`Collaborator::Generation`](crate::Collaborator::Generation). Callers
/// do not retry.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Return the model's reply to a single user turn.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// The user turn: the question followed by the formatted sources.
pub fn build_user_prompt(question: &str, context: &str) -> String {
    format!("Question: {question}\n\nSources:\n{context}\n\nAnswer:")
}
