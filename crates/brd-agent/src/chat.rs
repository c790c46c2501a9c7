//! Retrieval-augmented chat over a stored analysis result.
//!
//! Given a question about an analyzed document, embeds the question, ranks
//! the result's stored chunks by cosine similarity, and assembles a bounded
//! context window (top-k chunks plus the serialized insights) for a single
//! generation call. Embedding failure never fails the chat: retrieval is
//! skipped and the insights alone become the context.

use anyhow::{bail, Result};
use std::sync::Arc;

use brd_agent_core::models::AnalysisResult;
use brd_agent_core::search::rank_records;
use brd_agent_core::store::Store;

use crate::embedding::Embedder;
use crate::generation::Generator;

/// Separator between retrieved chunks in the assembled context.
const CHUNK_DELIMITER: &str = "\n\n---\n\n";

/// Answers questions against stored analysis results.
#[derive(Clone)]
pub struct Responder {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl Responder {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            top_k,
        }
    }

    /// Answer `question` from the context of result `result_id`.
    ///
    /// Errors on an unknown result id or an empty question; generation
    /// failures propagate to the caller as upstream errors.
    pub async fn answer(&self, result_id: &str, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            bail!("question must not be empty");
        }

        let result = match self.store.get_result(result_id).await? {
            Some(r) => r,
            None => bail!("result {} not found", result_id),
        };

        let context = self.assemble_context(&result, question).await;
        let prompt = chat_prompt(&context, question);
        self.generator.generate(&prompt).await
    }

    /// Build the grounding context: top-k retrieved chunks when vectors are
    /// available and the query embeds cleanly, always followed by the
    /// serialized insights.
    async fn assemble_context(&self, result: &AnalysisResult, question: &str) -> String {
        let insights_json = serde_json::to_string_pretty(&result.insights)
            .unwrap_or_else(|_| "{}".to_string());

        if result.records.is_empty() {
            return insights_json;
        }

        let query_vec = match self.embedder.embed(question).await {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Warning: query embedding failed, using insight-only context: {}", e);
                return insights_json;
            }
        };

        let ranked = rank_records(&result.records, &query_vec, self.top_k);
        let top_chunks: Vec<&str> = ranked
            .iter()
            .map(|r| r.record.chunk.text.as_str())
            .collect();

        format!(
            "[RELEVANT EXTRACTED DOCUMENT SEGMENTS]\n{}\n\n[HIGH LEVEL DOCUMENT INSIGHTS]\n{}",
            top_chunks.join(CHUNK_DELIMITER),
            insights_json
        )
    }
}

/// The single generation request for a chat turn. The model is told to
/// answer from the supplied context and to say when it is insufficient.
fn chat_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a BRD expert assistant. Here is the context of the document and specific most relevant chunks:
{context}

User question: {question}

Answer concisely and helpfully based primarily on the context provided above. If the context doesn't mention something, state that."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_prompt_contains_context_and_question() {
        let prompt = chat_prompt("CONTEXT HERE", "What is the uptime target?");
        assert!(prompt.contains("CONTEXT HERE"));
        assert!(prompt.contains("What is the uptime target?"));
        assert!(prompt.contains("state that"));
    }
}
