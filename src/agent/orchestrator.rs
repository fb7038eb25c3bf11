//! Memory-augmented conversation turns
//!
//! A turn walks `Search → Assemble → Complete → Persist → Done`. Only
//! `Complete` can abort it; every store interaction degrades instead of
//! failing the turn.
//!
//! ```text
//! message ─▶ store.search ─▶ normalize ─▶ assemble_context ─▶ completion
//!                                                                 │
//!                         store.add(message), store.add(answer) ◀─┘
//! ```

use super::completion::{ChatMessage, CompletionClient};
use crate::memory::{assemble_context, chunk_text, normalize, MemoryRecord, MemoryStore};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// System prompt template; `{context}` is replaced by the assembled block.
pub const SYSTEM_PROMPT_TEMPLATE: &str = "You are a helpful assistant. Use the context of the \
user's memories when it is relevant.\n\nContext:\n{context}";

/// Build the system prompt around a context block.
pub fn system_prompt(context: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE.replace("{context}", context)
}

/// Stages of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Search,
    Assemble,
    Complete,
    Persist,
    Done,
    /// Completion failed; nothing is persisted
    Aborted,
}

impl std::fmt::Display for TurnStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Search => "search",
            Self::Assemble => "assemble",
            Self::Complete => "complete",
            Self::Persist => "persist",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Result of a conversation turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered and the exchange was persisted (best effort)
    Answered(String),
    /// The model could not be reached; carries a user-visible error message
    Aborted(String),
}

impl TurnOutcome {
    /// The answer, or the error message shown in its place
    pub fn text(&self) -> &str {
        match self {
            Self::Answered(text) | Self::Aborted(text) => text,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }

    /// Wire status name
    pub fn status(&self) -> &'static str {
        match self {
            Self::Answered(_) => "answered",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// Outcome of ingesting a document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Number of chunks the document was split into
    pub chunks: usize,
    /// Store responses of the chunks that were stored
    pub stored: Vec<Value>,
}

impl IngestReport {
    /// Number of chunks the store rejected
    pub fn failed(&self) -> usize {
        self.chunks - self.stored.len()
    }
}

/// Conversation orchestrator over a memory store and a completion client.
pub struct MemoryAgent {
    store: Arc<dyn MemoryStore>,
    completion: Arc<dyn CompletionClient>,
    context_cap: usize,
}

impl MemoryAgent {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        completion: Arc<dyn CompletionClient>,
        context_cap: usize,
    ) -> Self {
        Self {
            store,
            completion,
            context_cap,
        }
    }

    /// Name of the memory backend
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    // =========================================================================
    // Conversation
    // =========================================================================

    /// Run one conversation turn for `user_id`.
    pub async fn chat(&self, user_id: &str, message: &str) -> TurnOutcome {
        let mut stage = TurnStage::Search;
        tracing::debug!(user_id = %user_id, stage = %stage, "Turn started");

        let raw = match self.store.search(message, user_id).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Memory search failed, continuing without context: {}", e);
                Value::Null
            }
        };

        stage = self.advance(user_id, stage, TurnStage::Assemble);
        let records = normalize(&raw);
        let context = assemble_context(&records, self.context_cap);

        stage = self.advance(user_id, stage, TurnStage::Complete);
        let messages = [
            ChatMessage::system(system_prompt(&context)),
            ChatMessage::user(message),
        ];
        let answer = match self.completion.complete(&messages).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    model = self.completion.model(),
                    "Completion failed: {}",
                    e
                );
                self.advance(user_id, stage, TurnStage::Aborted);
                return TurnOutcome::Aborted(format!(
                    "An error occurred while contacting the model: {}",
                    e
                ));
            }
        };

        stage = self.advance(user_id, stage, TurnStage::Persist);
        for text in [message, answer.as_str()] {
            if let Err(e) = self.store.add(text, user_id, None).await {
                tracing::warn!(user_id = %user_id, "Failed to persist turn to memory: {}", e);
            }
        }

        self.advance(user_id, stage, TurnStage::Done);
        TurnOutcome::Answered(answer)
    }

    fn advance(&self, user_id: &str, from: TurnStage, to: TurnStage) -> TurnStage {
        tracing::debug!(user_id = %user_id, from = %from, to = %to, "Turn stage");
        to
    }

    // =========================================================================
    // Memory management
    // =========================================================================

    /// Every memory stored for `user_id`; empty when the store is unavailable.
    pub async fn memories(&self, user_id: &str) -> Vec<MemoryRecord> {
        match self.store.get_all(user_id).await {
            Ok(raw) => normalize(&raw),
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Failed to list memories: {}", e);
                Vec::new()
            }
        }
    }

    /// Delete every memory stored for `user_id`.
    pub async fn clear(&self, user_id: &str) {
        match self.store.delete_all(user_id).await {
            Ok(()) => tracing::info!(user_id = %user_id, "Cleared memories"),
            Err(e) => tracing::warn!(user_id = %user_id, "Failed to clear memories: {}", e),
        }
    }

    /// Chunk a document and store each chunk with `metadata`.
    ///
    /// Chunks the store rejects are logged and skipped.
    pub async fn ingest(
        &self,
        user_id: &str,
        text: &str,
        metadata: Option<&Map<String, Value>>,
        max_chunk_size: usize,
    ) -> IngestReport {
        let chunks = chunk_text(text, max_chunk_size);
        let mut report = IngestReport {
            chunks: chunks.len(),
            stored: Vec::with_capacity(chunks.len()),
        };

        for chunk in &chunks {
            match self.store.add(&chunk.text, user_id, metadata).await {
                Ok(response) => report.stored.push(response),
                Err(e) => tracing::warn!(
                    user_id = %user_id,
                    chunk = chunk.index,
                    "Failed to store chunk: {}",
                    e
                ),
            }
        }

        tracing::info!(
            user_id = %user_id,
            chunks = report.chunks,
            stored = report.stored.len(),
            "Ingested document"
        );
        report
    }
}
