//! Streaming conversation engine.
//!
//! Keeps exactly one backend conversation handle, tied to the session it was
//! opened for. The handle is seeded from prior history (welcome, system, and
//! empty turns are skipped) and a system instruction embedding the session
//! language; it is rebuilt on active-session change and after a language
//! switch. `submit` streams chunks into the placeholder message through the
//! store's by-id update path, so a placeholder abandoned by session deletion
//! lands as a no-op.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use regex::Regex;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use wayfarer_core::config::ChatSettings;
use wayfarer_core::error::Result;
use wayfarer_core::lang;
use wayfarer_core::types::{
    DeliveryState, FilePayload, Message, Sender, Session, SourceRef, UploadedFile,
};
use wayfarer_store::SessionStore;

use crate::backend::{ChatBackend, ConversationHandle, HistoryTurn, TurnPart, TurnRole};

/// Drives one conversation at a time against the chat backend.
pub struct ConversationEngine {
    backend: Arc<dyn ChatBackend>,
    store: Arc<SessionStore>,
    settings: ChatSettings,
    /// Current handle and the session it belongs to.
    handle: Mutex<Option<(Uuid, ConversationHandle)>>,
    /// User turns seen so far, seeded from the active session at load so the
    /// tip cadence survives restarts.
    user_turns: AtomicU32,
    /// Matches inline image markdown the model sometimes emits.
    inline_image: Regex,
}

impl ConversationEngine {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<SessionStore>,
        settings: ChatSettings,
    ) -> Self {
        let seeded = store
            .active_session()
            .messages
            .iter()
            .filter(|m| m.sender == Sender::User)
            .count() as u32;
        Self {
            backend,
            store,
            settings,
            handle: Mutex::new(None),
            user_turns: AtomicU32::new(seeded),
            inline_image: Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("inline image pattern"),
        }
    }

    /// Drop the current handle so the next submission opens a fresh
    /// conversation. Called after a language switch.
    pub fn reset(&self) {
        *self.handle.lock().expect("engine mutex poisoned") = None;
        tracing::debug!("Conversation handle reset");
    }

    /// Send one user turn and stream the reply into the placeholder.
    ///
    /// A dead stream resolves the placeholder to a localized failure notice;
    /// the handle is kept so the next turn reuses the conversation.
    pub async fn submit(
        &self,
        session_id: Uuid,
        placeholder_id: u64,
        text: &str,
        files: &[UploadedFile],
        location: Option<(f64, f64)>,
    ) -> Result<()> {
        let session = match self.store.session(session_id) {
            Some(s) => s,
            None => {
                tracing::debug!(session = %session_id, "Submit dropped: session gone");
                return Ok(());
            }
        };
        let strings = lang::strings_for(&session.language);

        let handle = match self.ensure_handle(&session).await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(error = %e, "Conversation start failed");
                self.fail_placeholder(session_id, placeholder_id, strings.failure_notice)?;
                return Ok(());
            }
        };

        let parts = compose_parts(text, files, location);
        let mut rx = match self.backend.stream_reply(&handle, parts).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(error = %e, "Reply dispatch failed");
                self.fail_placeholder(session_id, placeholder_id, strings.failure_notice)?;
                self.schedule_tip(session_id, &session.language);
                return Ok(());
            }
        };

        let mut acc = String::new();
        let mut sources: Vec<SourceRef> = Vec::new();
        let mut died = false;
        while let Some(item) = rx.recv().await {
            match item {
                Ok(chunk) => {
                    acc.push_str(&chunk.text);
                    for source in chunk.sources {
                        // Last occurrence of a URI wins.
                        sources.retain(|s| s.uri != source.uri);
                        sources.push(source);
                    }
                    let partial = acc.clone();
                    self.store.update_message(session_id, placeholder_id, |m| {
                        m.text = partial;
                        if m.delivery == DeliveryState::Pending {
                            m.delivery = DeliveryState::Streaming;
                        }
                    })?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reply stream died");
                    died = true;
                    break;
                }
            }
        }

        if died {
            self.fail_placeholder(session_id, placeholder_id, strings.failure_notice)?;
        } else {
            let final_text = self.inline_image.replace_all(&acc, "").trim().to_string();
            self.store.update_message(session_id, placeholder_id, |m| {
                m.text = final_text;
                m.sources = sources;
                m.delivery = DeliveryState::Resolved;
            })?;
        }

        self.schedule_tip(session_id, &session.language);
        Ok(())
    }

    /// Reuse the handle if it belongs to this session, otherwise open a new
    /// conversation seeded from the session's history.
    async fn ensure_handle(&self, session: &Session) -> Result<ConversationHandle> {
        {
            let guard = self.handle.lock().expect("engine mutex poisoned");
            if let Some((sid, handle)) = guard.as_ref() {
                if *sid == session.id {
                    return Ok(handle.clone());
                }
            }
        }

        let history = history_turns(session);
        let handle = self
            .backend
            .start_conversation(&session.language, history)
            .await?;
        tracing::info!(session = %session.id, language = %session.language, "Conversation opened");
        *self.handle.lock().expect("engine mutex poisoned") =
            Some((session.id, handle.clone()));
        Ok(handle)
    }

    fn fail_placeholder(&self, session_id: Uuid, placeholder_id: u64, notice: &str) -> Result<()> {
        let notice = notice.to_string();
        self.store.update_message(session_id, placeholder_id, |m| {
            m.text = notice;
            m.delivery = DeliveryState::Failed;
        })?;
        Ok(())
    }

    /// Count the user turn and, every `tip_stride`-th one, drop a delayed
    /// localized sustainability tip into the session.
    fn schedule_tip(&self, session_id: Uuid, language: &str) {
        if self.settings.tip_stride == 0 {
            return;
        }
        let count = self.user_turns.fetch_add(1, Ordering::SeqCst) + 1;
        if count % self.settings.tip_stride != 0 {
            return;
        }
        let tips = lang::strings_for(language).tips;
        if tips.is_empty() {
            return;
        }
        let index = ((count / self.settings.tip_stride - 1) as usize) % tips.len();
        let tip = tips[index].to_string();
        let delay = Duration::from_millis(self.settings.tip_delay_ms);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = store.push_message(session_id, Message::system(tip)) {
                tracing::warn!(error = %e, "Tip message not persisted");
            }
        });
    }
}

/// Replayable history of a session: welcome, system, and empty turns are
/// skipped; user image attachments are replayed as inline parts.
fn history_turns(session: &Session) -> Vec<HistoryTurn> {
    session
        .messages
        .iter()
        .filter(|m| !m.welcome && !m.system)
        .filter(|m| m.delivery == DeliveryState::Resolved)
        .filter(|m| !m.text.trim().is_empty() || !m.files.is_empty())
        .map(|m| {
            let mut parts = Vec::new();
            if !m.text.trim().is_empty() {
                parts.push(TurnPart::Text(m.text.clone()));
            }
            for file in &m.files {
                if let FilePayload::Base64(data) = &file.payload {
                    parts.push(TurnPart::InlineData {
                        mime_type: file.mime_type.clone(),
                        data: data.clone(),
                    });
                }
            }
            HistoryTurn {
                role: match m.sender {
                    Sender::User => TurnRole::User,
                    Sender::Bot => TurnRole::Model,
                },
                parts,
            }
        })
        .collect()
}

/// Build the outgoing parts for one submission: text-file contents become a
/// labeled context prefix, an optional location is prepended with an explicit
/// instruction, and image attachments travel as inline binary parts.
fn compose_parts(
    text: &str,
    files: &[UploadedFile],
    location: Option<(f64, f64)>,
) -> Vec<TurnPart> {
    let mut composed = String::new();
    if let Some((lat, lon)) = location {
        composed.push_str(&format!(
            "My current location is latitude {:.5}, longitude {:.5}. \
             Use it when I ask about nearby places.\n\n",
            lat, lon
        ));
    }
    for file in files {
        if let FilePayload::Text(content) = &file.payload {
            composed.push_str(&format!("Content of {}:\n{}\n\n", file.name, content));
        }
    }
    composed.push_str(text);

    let mut parts = vec![TurnPart::Text(composed)];
    for file in files {
        if let FilePayload::Base64(data) = &file.payload {
            parts.push(TurnPart::InlineData {
                mime_type: file.mime_type.clone(),
                data: data.clone(),
            });
        }
    }
    parts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use wayfarer_core::types::Session;
    use wayfarer_store::MemoryKv;

    use crate::backend::{MockChatBackend, ReplyChunk};

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::init(Arc::new(MemoryKv::new()), "en-US").unwrap())
    }

    fn settings() -> ChatSettings {
        ChatSettings {
            tip_stride: 5,
            tip_delay_ms: 1,
        }
    }

    fn engine_with(backend: MockChatBackend, store: &Arc<SessionStore>) -> ConversationEngine {
        ConversationEngine::new(Arc::new(backend), Arc::clone(store), settings())
    }

    /// Push a user message and a placeholder, returning the placeholder id.
    fn stage_turn(store: &SessionStore, session_id: Uuid, text: &str) -> u64 {
        store
            .push_message(session_id, Message::user(text, vec![]))
            .unwrap();
        let placeholder = Message::placeholder();
        let id = placeholder.id;
        store.push_message(session_id, placeholder).unwrap();
        id
    }

    fn last_message(store: &SessionStore, session_id: Uuid) -> Message {
        store
            .session(session_id)
            .unwrap()
            .messages
            .last()
            .cloned()
            .unwrap()
    }

    // ---- Streaming ----

    #[tokio::test]
    async fn test_submit_accumulates_chunks() {
        let store = store();
        let sid = store.active_id();
        let backend = MockChatBackend::new().with_reply(vec![
            ReplyChunk::text("Lisbon is "),
            ReplyChunk::text("a great pick."),
        ]);
        let engine = engine_with(backend, &store);

        let pid = stage_turn(&store, sid, "where should I go");
        engine.submit(sid, pid, "where should I go", &[], None).await.unwrap();

        let msg = last_message(&store, sid);
        assert_eq!(msg.text, "Lisbon is a great pick.");
        assert_eq!(msg.delivery, DeliveryState::Resolved);
    }

    #[tokio::test]
    async fn test_submit_strips_inline_image_markdown() {
        let store = store();
        let sid = store.active_id();
        let backend = MockChatBackend::new().with_reply(vec![ReplyChunk::text(
            "Here you go ![view](https://img.example/1.png) enjoy",
        )]);
        let engine = engine_with(backend, &store);

        let pid = stage_turn(&store, sid, "show me");
        engine.submit(sid, pid, "show me", &[], None).await.unwrap();

        let msg = last_message(&store, sid);
        assert_eq!(msg.text, "Here you go  enjoy");
    }

    #[tokio::test]
    async fn test_submit_dedupes_sources_last_wins() {
        let store = store();
        let sid = store.active_id();
        let backend = MockChatBackend::new().with_reply(vec![
            ReplyChunk {
                text: "a".into(),
                sources: vec![SourceRef {
                    uri: "https://ex.am/1".into(),
                    title: "Old title".into(),
                }],
            },
            ReplyChunk {
                text: "b".into(),
                sources: vec![
                    SourceRef {
                        uri: "https://ex.am/2".into(),
                        title: "Other".into(),
                    },
                    SourceRef {
                        uri: "https://ex.am/1".into(),
                        title: "New title".into(),
                    },
                ],
            },
        ]);
        let engine = engine_with(backend, &store);

        let pid = stage_turn(&store, sid, "sources please");
        engine.submit(sid, pid, "sources please", &[], None).await.unwrap();

        let msg = last_message(&store, sid);
        assert_eq!(msg.sources.len(), 2);
        assert_eq!(msg.sources[0].uri, "https://ex.am/2");
        assert_eq!(msg.sources[1].title, "New title");
    }

    // ---- Failure posture ----

    #[tokio::test]
    async fn test_stream_death_resolves_to_failure_notice() {
        let store = store();
        let sid = store.active_id();
        let backend = MockChatBackend::new()
            .with_failing_reply(vec![ReplyChunk::text("partial")], "reset");
        let engine = engine_with(backend, &store);

        let pid = stage_turn(&store, sid, "hello");
        engine.submit(sid, pid, "hello", &[], None).await.unwrap();

        let msg = last_message(&store, sid);
        assert_eq!(msg.delivery, DeliveryState::Failed);
        assert_eq!(msg.text, lang::strings_for("en-US").failure_notice);
    }

    #[tokio::test]
    async fn test_handle_retained_after_stream_death() {
        let store = store();
        let sid = store.active_id();
        let backend = MockChatBackend::new()
            .with_failing_reply(vec![], "reset")
            .with_reply(vec![ReplyChunk::text("recovered")]);
        let engine = ConversationEngine::new(
            Arc::new(backend),
            Arc::clone(&store),
            settings(),
        );

        let pid = stage_turn(&store, sid, "first");
        engine.submit(sid, pid, "first", &[], None).await.unwrap();
        let pid = stage_turn(&store, sid, "second");
        engine.submit(sid, pid, "second", &[], None).await.unwrap();

        let msg = last_message(&store, sid);
        assert_eq!(msg.text, "recovered");
    }

    #[tokio::test]
    async fn test_submit_against_deleted_session_is_noop() {
        let store = store();
        let sid = store.active_id();
        let engine = engine_with(MockChatBackend::new(), &store);

        let pid = stage_turn(&store, sid, "doomed");
        store.create_session("en-US").unwrap();
        store.delete_session(sid).unwrap();

        engine.submit(sid, pid, "doomed", &[], None).await.unwrap();
        assert!(store.session(sid).is_none());
    }

    // ---- Handle lifecycle ----

    #[tokio::test]
    async fn test_handle_reused_within_session() {
        let store = store();
        let sid = store.active_id();
        let backend = Arc::new(
            MockChatBackend::new()
                .with_reply(vec![ReplyChunk::text("one")])
                .with_reply(vec![ReplyChunk::text("two")]),
        );
        let engine = ConversationEngine::new(
            Arc::clone(&backend) as Arc<dyn ChatBackend>,
            Arc::clone(&store),
            settings(),
        );

        let pid = stage_turn(&store, sid, "a");
        engine.submit(sid, pid, "a", &[], None).await.unwrap();
        let pid = stage_turn(&store, sid, "b");
        engine.submit(sid, pid, "b", &[], None).await.unwrap();

        assert_eq!(backend.conversations_started(), 1);
    }

    #[tokio::test]
    async fn test_handle_rebuilt_after_reset() {
        let store = store();
        let sid = store.active_id();
        let backend = Arc::new(MockChatBackend::new());
        let engine = ConversationEngine::new(
            Arc::clone(&backend) as Arc<dyn ChatBackend>,
            Arc::clone(&store),
            settings(),
        );

        let pid = stage_turn(&store, sid, "a");
        engine.submit(sid, pid, "a", &[], None).await.unwrap();
        engine.reset();
        let pid = stage_turn(&store, sid, "b");
        engine.submit(sid, pid, "b", &[], None).await.unwrap();

        assert_eq!(backend.conversations_started(), 2);
    }

    #[tokio::test]
    async fn test_handle_rebuilt_on_session_change() {
        let store = store();
        let first = store.active_id();
        let backend = Arc::new(MockChatBackend::new());
        let engine = ConversationEngine::new(
            Arc::clone(&backend) as Arc<dyn ChatBackend>,
            Arc::clone(&store),
            settings(),
        );

        let pid = stage_turn(&store, first, "a");
        engine.submit(first, pid, "a", &[], None).await.unwrap();

        let second = store.create_session("en-US").unwrap();
        let pid = stage_turn(&store, second, "b");
        engine.submit(second, pid, "b", &[], None).await.unwrap();

        assert_eq!(backend.conversations_started(), 2);
    }

    // ---- History seeding ----

    #[test]
    fn test_history_skips_welcome_system_and_empty() {
        let mut session = Session::new("en-US");
        session.messages.push(Message::user("real turn", vec![]));
        session.messages.push(Message::bot("real reply"));
        session.messages.push(Message::system("a tip"));
        session.messages.push(Message::placeholder());

        let turns = history_turns(&session);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Model);
    }

    #[test]
    fn test_history_replays_image_attachments_inline() {
        let mut session = Session::new("en-US");
        session.messages.push(Message::user(
            "what is this",
            vec![UploadedFile::image("p.png", "image/png", "QUJD".into())],
        ));

        let turns = history_turns(&session);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].parts.len(), 2);
        assert!(matches!(&turns[0].parts[1], TurnPart::InlineData { mime_type, .. } if mime_type == "image/png"));
    }

    // ---- Part composition ----

    #[test]
    fn test_compose_parts_text_file_prefix() {
        let files = vec![UploadedFile::text("itinerary.txt", "Day 1: museum".into())];
        let parts = compose_parts("summarize this", &files, None);
        assert_eq!(parts.len(), 1);
        match &parts[0] {
            TurnPart::Text(t) => {
                assert!(t.starts_with("Content of itinerary.txt:\nDay 1: museum"));
                assert!(t.ends_with("summarize this"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_compose_parts_location_instruction() {
        let parts = compose_parts("coffee nearby?", &[], Some((48.85837, 2.29448)));
        match &parts[0] {
            TurnPart::Text(t) => {
                assert!(t.contains("latitude 48.85837"));
                assert!(t.contains("longitude 2.29448"));
                assert!(t.ends_with("coffee nearby?"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_compose_parts_images_as_inline_data() {
        let files = vec![UploadedFile::image("a.jpg", "image/jpeg", "REVG".into())];
        let parts = compose_parts("edit hint", &files, None);
        assert_eq!(parts.len(), 2);
        assert!(matches!(&parts[1], TurnPart::InlineData { data, .. } if data == "REVG"));
    }

    // ---- Tip cadence ----

    #[tokio::test]
    async fn test_tip_after_fifth_user_turn() {
        let store = store();
        let sid = store.active_id();
        let mut backend = MockChatBackend::new();
        for _ in 0..5 {
            backend = backend.with_reply(vec![ReplyChunk::text("r")]);
        }
        let engine = engine_with(backend, &store);

        for i in 0..5 {
            let text = format!("turn {}", i);
            let pid = stage_turn(&store, sid, &text);
            engine.submit(sid, pid, &text, &[], None).await.unwrap();
        }
        sleep(Duration::from_millis(50)).await;

        let session = store.session(sid).unwrap();
        let tips: Vec<_> = session.messages.iter().filter(|m| m.system).collect();
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].text, lang::strings_for("en-US").tips[0]);
    }

    #[tokio::test]
    async fn test_no_tip_before_fifth_turn() {
        let store = store();
        let sid = store.active_id();
        let mut backend = MockChatBackend::new();
        for _ in 0..4 {
            backend = backend.with_reply(vec![ReplyChunk::text("r")]);
        }
        let engine = engine_with(backend, &store);

        for i in 0..4 {
            let text = format!("turn {}", i);
            let pid = stage_turn(&store, sid, &text);
            engine.submit(sid, pid, &text, &[], None).await.unwrap();
        }
        sleep(Duration::from_millis(50)).await;

        let session = store.session(sid).unwrap();
        assert!(session.messages.iter().all(|m| !m.system));
    }

    #[tokio::test]
    async fn test_tip_counter_seeded_from_existing_history() {
        let store = store();
        let sid = store.active_id();
        // Four user turns already on disk; the next submit is the fifth.
        for i in 0..4 {
            store
                .push_message(sid, Message::user(format!("old {}", i), vec![]))
                .unwrap();
        }
        let backend = MockChatBackend::new().with_reply(vec![ReplyChunk::text("r")]);
        let engine = engine_with(backend, &store);

        let pid = stage_turn(&store, sid, "fifth");
        engine.submit(sid, pid, "fifth", &[], None).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        let session = store.session(sid).unwrap();
        assert!(session.messages.iter().any(|m| m.system));
    }
}
