// Answer module
// Retrieval-augmented question answering: retrieve relevant chunks,
// compose an augmented prompt, and ask the chat model.


use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::database::lancedb::VectorStore;
use crate::embeddings::OllamaClient;
use crate::generation::ChatClient;

/// Response to a question, including the retrieval context that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub context_used: Vec<String>,
    pub filtered_by_user: Option<String>,
}

/// Compose an augmented prompt from a question and retrieved context chunks.
///
/// The instruction block directs the model to answer about the person
/// described in the context rather than about itself, and to say so when
/// the context lacks relevant information. Context chunks are joined
/// blank-line separated in ranked order, followed by the literal question.
#[inline]
pub fn compose_prompt(question: &str, contexts: &[String]) -> String {
    let context = contexts.join("\n\n");

    format!(
        "Use the following context to answer the question.\n\
         The context describes a specific person; answer about that person, \
         not about yourself or the assistant.\n\
         If the context doesn't contain relevant information, say so.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}"
    )
}

/// Answers questions by querying the vector store and forwarding the
/// retrieved context to the chat model.
///
/// Holds process-wide collaborator handles established once at startup;
/// each call is an independent request with no state carried across calls.
pub struct AnswerService {
    store: Arc<VectorStore>,
    embeddings: Arc<OllamaClient>,
    chat: Arc<ChatClient>,
    retrieval: RetrievalConfig,
}

impl AnswerService {
    #[inline]
    pub fn new(
        store: Arc<VectorStore>,
        embeddings: Arc<OllamaClient>,
        chat: Arc<ChatClient>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            chat,
            retrieval,
        }
    }

    /// Answer a question, optionally restricted to one user's chunks.
    ///
    /// An empty retrieval result is not an error: the prompt tells the
    /// model the context may lack relevant information and the model is
    /// expected to say so. Collaborator failures propagate to the caller.
    #[inline]
    pub async fn answer(&self, question: &str, user_filter: Option<&str>) -> Result<Answer> {
        let result_count = if user_filter.is_some() {
            self.retrieval.filtered_result_count
        } else {
            // Identity questions need more candidates so the synthesized
            // identity chunk is reliably among them.
            self.retrieval.result_count
        };

        let query_vector = self
            .embeddings
            .embed(question)
            .context("Failed to embed question")?;

        let results = self
            .store
            .search_similar(&query_vector, result_count, user_filter)
            .await
            .context("Failed to query vector store")?;

        // Drop any empty documents defensively; ranked order is preserved.
        let contexts: Vec<String> = results
            .into_iter()
            .map(|result| result.metadata.content)
            .filter(|content| !content.trim().is_empty())
            .collect();

        debug!(
            "Retrieved {} context chunks for question ({} requested)",
            contexts.len(),
            result_count
        );

        let prompt = compose_prompt(question, &contexts);
        let reply = self
            .chat
            .generate(&prompt)
            .context("Failed to generate answer")?;

        info!(
            "Answered question with {} context chunks{}",
            contexts.len(),
            user_filter
                .map(|user| format!(" (filtered by user '{}')", user))
                .unwrap_or_default()
        );

        Ok(Answer {
            question: question.to_string(),
            answer: reply,
            context_used: contexts,
            filtered_by_user: user_filter.map(ToOwned::to_owned),
        })
    }
}
