//! Generative chat backend capability.
//!
//! A conversation is an opaque remote handle seeded with prior turns; replies
//! arrive as a finite stream of text chunks with optional grounding sources.
//! The mock implementation scripts its replies per call and is the test
//! double for the engine and the assistant.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use wayfarer_core::error::{Result, WayfarerError};
use wayfarer_core::types::SourceRef;

/// Who produced a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

/// One part of a turn sent to or replayed for the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPart {
    Text(String),
    /// Base64-encoded binary content, typically an attached image.
    InlineData { mime_type: String, data: String },
}

/// One prior exchange replayed when a conversation is (re)created.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![TurnPart::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![TurnPart::Text(text.into())],
        }
    }
}

/// One streamed piece of a reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplyChunk {
    pub text: String,
    /// Grounding citations carried by this chunk, possibly repeating earlier
    /// ones with fresher titles.
    pub sources: Vec<SourceRef>,
}

impl ReplyChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }
}

/// Opaque reference to one remote conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHandle {
    pub id: Uuid,
    /// Language the conversation was opened in.
    pub language: String,
}

/// Remote generative-conversation capability.
///
/// `stream_reply` returns a finite receiver; a dead stream is not restartable
/// and the caller decides what to do with the partial text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Open a conversation seeded with prior history and a system instruction
    /// for the given language.
    async fn start_conversation(
        &self,
        language: &str,
        history: Vec<HistoryTurn>,
    ) -> Result<ConversationHandle>;

    /// Send one user turn and stream the reply.
    async fn stream_reply(
        &self,
        handle: &ConversationHandle,
        parts: Vec<TurnPart>,
    ) -> Result<mpsc::Receiver<Result<ReplyChunk>>>;

    /// One-shot condensation of a text, outside any conversation.
    async fn summarize(&self, text: &str) -> Result<String>;
}

// =============================================================================
// Mock
// =============================================================================

/// What the mock plays back for one `stream_reply` call.
#[derive(Debug, Clone)]
enum ScriptedReply {
    Chunks(Vec<ReplyChunk>),
    /// Chunks delivered before the stream dies with this error.
    ChunksThenError(Vec<ReplyChunk>, String),
}

/// Scripted in-memory backend for tests.
#[derive(Default)]
pub struct MockChatBackend {
    replies: Mutex<VecDeque<ScriptedReply>>,
    conversations_started: AtomicU32,
    last_history: Mutex<Option<Vec<HistoryTurn>>>,
    last_parts: Mutex<Option<Vec<TurnPart>>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply delivered as the given chunks.
    pub fn with_reply(self, chunks: Vec<ReplyChunk>) -> Self {
        self.replies
            .lock()
            .expect("mock mutex poisoned")
            .push_back(ScriptedReply::Chunks(chunks));
        self
    }

    /// Queue a reply that streams the given chunks and then dies.
    pub fn with_failing_reply(self, chunks: Vec<ReplyChunk>, error: &str) -> Self {
        self.replies
            .lock()
            .expect("mock mutex poisoned")
            .push_back(ScriptedReply::ChunksThenError(chunks, error.to_string()));
        self
    }

    /// How many conversations have been opened.
    pub fn conversations_started(&self) -> u32 {
        self.conversations_started.load(Ordering::SeqCst)
    }

    /// History passed to the most recent `start_conversation`.
    pub fn last_history(&self) -> Option<Vec<HistoryTurn>> {
        self.last_history.lock().expect("mock mutex poisoned").clone()
    }

    /// Parts passed to the most recent `stream_reply`.
    pub fn last_parts(&self) -> Option<Vec<TurnPart>> {
        self.last_parts.lock().expect("mock mutex poisoned").clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn start_conversation(
        &self,
        language: &str,
        history: Vec<HistoryTurn>,
    ) -> Result<ConversationHandle> {
        self.conversations_started.fetch_add(1, Ordering::SeqCst);
        *self.last_history.lock().expect("mock mutex poisoned") = Some(history);
        Ok(ConversationHandle {
            id: Uuid::new_v4(),
            language: language.to_string(),
        })
    }

    async fn stream_reply(
        &self,
        _handle: &ConversationHandle,
        parts: Vec<TurnPart>,
    ) -> Result<mpsc::Receiver<Result<ReplyChunk>>> {
        *self.last_parts.lock().expect("mock mutex poisoned") = Some(parts);
        let scripted = self
            .replies
            .lock()
            .expect("mock mutex poisoned")
            .pop_front()
            .unwrap_or(ScriptedReply::Chunks(vec![ReplyChunk::text("ok")]));

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            match scripted {
                ScriptedReply::Chunks(chunks) => {
                    for chunk in chunks {
                        if tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                    }
                }
                ScriptedReply::ChunksThenError(chunks, error) => {
                    for chunk in chunks {
                        if tx.send(Ok(chunk)).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(Err(WayfarerError::Backend(error))).await;
                }
            }
        });
        Ok(rx)
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let mut short: String = text.chars().take(60).collect();
        if text.chars().count() > 60 {
            short.push_str("...");
        }
        Ok(short)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Mock streaming ----

    #[tokio::test]
    async fn test_mock_streams_scripted_chunks() {
        let backend = MockChatBackend::new()
            .with_reply(vec![ReplyChunk::text("Hello "), ReplyChunk::text("world")]);
        let handle = backend.start_conversation("en-US", vec![]).await.unwrap();
        let mut rx = backend
            .stream_reply(&handle, vec![TurnPart::Text("hi".into())])
            .await
            .unwrap();

        let mut acc = String::new();
        while let Some(item) = rx.recv().await {
            acc.push_str(&item.unwrap().text);
        }
        assert_eq!(acc, "Hello world");
    }

    #[tokio::test]
    async fn test_mock_stream_error_after_chunks() {
        let backend = MockChatBackend::new()
            .with_failing_reply(vec![ReplyChunk::text("partial")], "connection reset");
        let handle = backend.start_conversation("en-US", vec![]).await.unwrap();
        let mut rx = backend.stream_reply(&handle, vec![]).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().unwrap().text, "partial");
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_records_history_and_parts() {
        let backend = MockChatBackend::new();
        let history = vec![HistoryTurn::user("earlier"), HistoryTurn::model("reply")];
        let handle = backend
            .start_conversation("fr-FR", history.clone())
            .await
            .unwrap();
        assert_eq!(handle.language, "fr-FR");
        assert_eq!(backend.last_history(), Some(history));
        assert_eq!(backend.conversations_started(), 1);

        let parts = vec![TurnPart::Text("bonjour".into())];
        let _ = backend.stream_reply(&handle, parts.clone()).await.unwrap();
        assert_eq!(backend.last_parts(), Some(parts));
    }

    #[tokio::test]
    async fn test_mock_default_reply_when_script_empty() {
        let backend = MockChatBackend::new();
        let handle = backend.start_conversation("en-US", vec![]).await.unwrap();
        let mut rx = backend.stream_reply(&handle, vec![]).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap().text, "ok");
    }

    // ---- Summarize ----

    #[tokio::test]
    async fn test_summarize_truncates_long_text() {
        let backend = MockChatBackend::new();
        let long = "x".repeat(200);
        let short = backend.summarize(&long).await.unwrap();
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= 63);
    }
}
