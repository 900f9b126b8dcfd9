//! Domain types for the Wayfarer conversation model.
//!
//! Sessions own an ordered message list; messages carry everything the UI
//! layer must be able to render (text, suggestions, images, citations, video
//! lifecycle). Delivery and video lifecycles are modeled as small transition
//! tables so that invalid state changes are rejected rather than silently
//! applied.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lang;

/// Default title for a session whose first user message has not arrived yet.
pub const DEFAULT_SESSION_TITLE: &str = "New chat";

/// Maximum number of characters of the first user message used as a title.
pub const TITLE_MAX_CHARS: usize = 40;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

/// Delivery lifecycle of a message.
///
/// A placeholder message starts `Pending`, moves to `Streaming` once the first
/// chunk lands, and ends in `Resolved` or `Failed`. Exactly one non-final
/// placeholder may exist per in-flight request per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Streaming,
    Resolved,
    Failed,
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryState::Pending => write!(f, "Pending"),
            DeliveryState::Streaming => write!(f, "Streaming"),
            DeliveryState::Resolved => write!(f, "Resolved"),
            DeliveryState::Failed => write!(f, "Failed"),
        }
    }
}

impl DeliveryState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &DeliveryState) -> bool {
        matches!(
            (self, target),
            (DeliveryState::Pending, DeliveryState::Streaming)
                | (DeliveryState::Pending, DeliveryState::Resolved)
                | (DeliveryState::Pending, DeliveryState::Failed)
                | (DeliveryState::Streaming, DeliveryState::Resolved)
                | (DeliveryState::Streaming, DeliveryState::Failed)
        )
    }

    /// Whether the message is still being filled (the UI shows a spinner).
    pub fn is_loading(&self) -> bool {
        matches!(self, DeliveryState::Pending | DeliveryState::Streaming)
    }
}

/// Video generation lifecycle carried by a bot message.
///
/// Transitions only run forward: `Generating -> Done` or
/// `Generating -> Failed`, never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPhase {
    Generating,
    Done,
    Failed,
}

impl fmt::Display for VideoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoPhase::Generating => write!(f, "Generating"),
            VideoPhase::Done => write!(f, "Done"),
            VideoPhase::Failed => write!(f, "Failed"),
        }
    }
}

impl VideoPhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &VideoPhase) -> bool {
        matches!(
            (self, target),
            (VideoPhase::Generating, VideoPhase::Done)
                | (VideoPhase::Generating, VideoPhase::Failed)
        )
    }
}

/// A grounding citation returned alongside a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub uri: String,
    pub title: String,
}

/// A quick-reply chip: initial quick-start suggestions and follow-up chips
/// surfaced after a bot reply both use this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Text shown on the chip.
    pub text: String,
    /// Icon identifier for the rendering layer.
    pub icon: String,
    /// Prompt submitted when the chip is tapped; defaults to `text`.
    pub prompt: Option<String>,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon: icon.into(),
            prompt: None,
        }
    }

    /// The prompt a tap on this chip submits.
    pub fn effective_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(&self.text)
    }
}

/// Encoded payload of a staged upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePayload {
    /// Base64-encoded binary content (images and other binary types).
    Base64(String),
    /// Raw text content for plain-text files.
    Text(String),
}

/// A file staged for one pending submission.
///
/// Immutable once staged; its lifetime is bounded to a single submission
/// (cleared after send or on manual removal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub payload: FilePayload,
    /// Optional rendered preview source for the staging strip.
    pub preview: Option<String>,
}

impl UploadedFile {
    pub fn image(name: impl Into<String>, mime_type: impl Into<String>, data: String) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            payload: FilePayload::Base64(data),
            preview: None,
        }
    }

    pub fn text(name: impl Into<String>, content: String) -> Self {
        Self {
            name: name.into(),
            mime_type: "text/plain".to_string(),
            payload: FilePayload::Text(content),
            preview: None,
        }
    }

    /// Whether this upload is an image by MIME type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Monotonic message id derived from submission time in milliseconds.
///
/// Two submissions inside the same millisecond still receive distinct,
/// strictly increasing ids.
fn next_message_id() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = Utc::now().timestamp_millis().max(0) as u64;
    LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        Some(now.max(last + 1))
    })
    .unwrap_or(now)
}

/// One exchange unit (user or bot turn) within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    /// Rendered image sources attached to a bot reply.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    pub delivery: DeliveryState,
    /// Files the user attached to this turn.
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    /// First message of a fresh session; never forwarded as backend history.
    #[serde(default)]
    pub welcome: bool,
    /// System-style notice (tips, device errors); never backend history.
    #[serde(default)]
    pub system: bool,
    pub video: Option<VideoPhase>,
    pub video_url: Option<String>,
}

impl Message {
    /// A user turn, already delivered by definition.
    pub fn user(text: impl Into<String>, files: Vec<UploadedFile>) -> Self {
        Self {
            id: next_message_id(),
            text: text.into(),
            sender: Sender::User,
            suggestions: Vec::new(),
            images: Vec::new(),
            sources: Vec::new(),
            delivery: DeliveryState::Resolved,
            files,
            welcome: false,
            system: false,
            video: None,
            video_url: None,
        }
    }

    /// A resolved bot turn.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: next_message_id(),
            text: text.into(),
            sender: Sender::Bot,
            suggestions: Vec::new(),
            images: Vec::new(),
            sources: Vec::new(),
            delivery: DeliveryState::Resolved,
            files: Vec::new(),
            welcome: false,
            system: false,
            video: None,
            video_url: None,
        }
    }

    /// A loading placeholder created on request dispatch and later filled by
    /// the streaming or generation result.
    pub fn placeholder() -> Self {
        Self {
            delivery: DeliveryState::Pending,
            ..Self::bot(String::new())
        }
    }

    /// A placeholder for a video job, tagged `Generating` from the start.
    pub fn video_placeholder() -> Self {
        Self {
            video: Some(VideoPhase::Generating),
            ..Self::placeholder()
        }
    }

    /// The welcome greeting of a fresh session, carrying the localized
    /// quick-start suggestion chips.
    pub fn welcome(language: &str) -> Self {
        let s = lang::strings_for(language);
        let mut msg = Self::bot(s.welcome.to_string());
        msg.welcome = true;
        msg.suggestions = vec![
            Suggestion::new(s.trip_plan_label, "map"),
            Suggestion::new(s.suggest_image_label, "image"),
            Suggestion::new(s.suggest_phrases_label, "translate"),
        ];
        msg
    }

    /// A system-style notice (sustainability tip, device error).
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            system: true,
            ..Self::bot(text)
        }
    }

    /// Whether the message is still being filled.
    pub fn is_loading(&self) -> bool {
        self.delivery.is_loading()
    }
}

/// One persisted conversation thread with its own history and language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    /// BCP 47 code, e.g. `en-US`.
    pub language: String,
}

impl Session {
    /// Create a fresh session in the given language with its welcome message.
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: vec![Message::welcome(&language)],
            language,
        }
    }

    /// Derive a title from the first user message if the title is still the
    /// default. Truncates at a character boundary.
    pub fn derive_title(&mut self) {
        if self.title != DEFAULT_SESSION_TITLE {
            return;
        }
        if let Some(first) = self
            .messages
            .iter()
            .find(|m| m.sender == Sender::User && !m.text.trim().is_empty())
        {
            self.title = first.text.chars().take(TITLE_MAX_CHARS).collect();
        }
    }

    /// Whether the session has no real user turns yet.
    pub fn is_fresh(&self) -> bool {
        !self.messages.iter().any(|m| m.sender == Sender::User)
    }
}

/// Derived gallery entry: a generated image with its provenance.
///
/// Never stored; computed by scanning all sessions' bot messages with
/// images, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub src: String,
    pub session_id: Uuid,
    pub message_id: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Message ids ----

    #[test]
    fn test_message_ids_strictly_increasing() {
        let a = Message::user("one", vec![]);
        let b = Message::user("two", vec![]);
        let c = Message::bot("three");
        assert!(b.id > a.id);
        assert!(c.id > b.id);
    }

    #[test]
    fn test_message_id_derived_from_time() {
        let before = Utc::now().timestamp_millis() as u64;
        let msg = Message::user("hi", vec![]);
        // Either the wall clock or the monotonic guard produced the id, so it
        // can never be below the clock reading taken before creation minus
        // clock adjustment slack.
        assert!(msg.id + 1000 >= before);
    }

    // ---- DeliveryState ----

    #[test]
    fn test_delivery_valid_transitions() {
        assert!(DeliveryState::Pending.can_transition_to(&DeliveryState::Streaming));
        assert!(DeliveryState::Pending.can_transition_to(&DeliveryState::Resolved));
        assert!(DeliveryState::Pending.can_transition_to(&DeliveryState::Failed));
        assert!(DeliveryState::Streaming.can_transition_to(&DeliveryState::Resolved));
        assert!(DeliveryState::Streaming.can_transition_to(&DeliveryState::Failed));
    }

    #[test]
    fn test_delivery_invalid_transitions() {
        assert!(!DeliveryState::Resolved.can_transition_to(&DeliveryState::Streaming));
        assert!(!DeliveryState::Failed.can_transition_to(&DeliveryState::Pending));
        assert!(!DeliveryState::Streaming.can_transition_to(&DeliveryState::Pending));
        assert!(!DeliveryState::Resolved.can_transition_to(&DeliveryState::Failed));
        assert!(!DeliveryState::Pending.can_transition_to(&DeliveryState::Pending));
    }

    #[test]
    fn test_delivery_is_loading() {
        assert!(DeliveryState::Pending.is_loading());
        assert!(DeliveryState::Streaming.is_loading());
        assert!(!DeliveryState::Resolved.is_loading());
        assert!(!DeliveryState::Failed.is_loading());
    }

    // ---- VideoPhase ----

    #[test]
    fn test_video_phase_forward_only() {
        assert!(VideoPhase::Generating.can_transition_to(&VideoPhase::Done));
        assert!(VideoPhase::Generating.can_transition_to(&VideoPhase::Failed));

        assert!(!VideoPhase::Done.can_transition_to(&VideoPhase::Generating));
        assert!(!VideoPhase::Failed.can_transition_to(&VideoPhase::Done));
        assert!(!VideoPhase::Done.can_transition_to(&VideoPhase::Failed));
        assert!(!VideoPhase::Failed.can_transition_to(&VideoPhase::Generating));
        assert!(!VideoPhase::Generating.can_transition_to(&VideoPhase::Generating));
    }

    #[test]
    fn test_video_phase_display() {
        assert_eq!(VideoPhase::Generating.to_string(), "Generating");
        assert_eq!(VideoPhase::Done.to_string(), "Done");
        assert_eq!(VideoPhase::Failed.to_string(), "Failed");
    }

    // ---- Constructors ----

    #[test]
    fn test_user_message_resolved() {
        let msg = Message::user("hello", vec![]);
        assert_eq!(msg.sender, Sender::User);
        assert_eq!(msg.delivery, DeliveryState::Resolved);
        assert!(!msg.is_loading());
        assert!(!msg.welcome);
        assert!(!msg.system);
    }

    #[test]
    fn test_placeholder_is_loading() {
        let msg = Message::placeholder();
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.delivery, DeliveryState::Pending);
        assert!(msg.is_loading());
        assert!(msg.text.is_empty());
    }

    #[test]
    fn test_video_placeholder_generating() {
        let msg = Message::video_placeholder();
        assert_eq!(msg.video, Some(VideoPhase::Generating));
        assert!(msg.is_loading());
        assert!(msg.video_url.is_none());
    }

    #[test]
    fn test_welcome_message_has_suggestions() {
        let msg = Message::welcome("en-US");
        assert!(msg.welcome);
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.suggestions.len(), 3);
        assert!(!msg.is_loading());
    }

    #[test]
    fn test_system_message_flag() {
        let msg = Message::system("tip");
        assert!(msg.system);
        assert!(!msg.welcome);
    }

    // ---- UploadedFile ----

    #[test]
    fn test_uploaded_file_is_image() {
        let img = UploadedFile::image("a.png", "image/png", "AAAA".to_string());
        assert!(img.is_image());

        let txt = UploadedFile::text("notes.txt", "hello".to_string());
        assert!(!txt.is_image());
        assert_eq!(txt.mime_type, "text/plain");
    }

    // ---- Suggestion ----

    #[test]
    fn test_suggestion_effective_prompt() {
        let plain = Suggestion::new("Plan a trip", "map");
        assert_eq!(plain.effective_prompt(), "Plan a trip");

        let with_override = Suggestion {
            prompt: Some("Plan a 3-day trip to Jaipur".to_string()),
            ..Suggestion::new("Trip plan", "map")
        };
        assert_eq!(with_override.effective_prompt(), "Plan a 3-day trip to Jaipur");
    }

    // ---- Session ----

    #[test]
    fn test_new_session_has_welcome_only() {
        let session = Session::new("en-US");
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
        assert_eq!(session.messages.len(), 1);
        assert!(session.messages[0].welcome);
        assert!(session.is_fresh());
    }

    #[test]
    fn test_derive_title_from_first_user_message() {
        let mut session = Session::new("en-US");
        session
            .messages
            .push(Message::user("plan a weekend in Lisbon", vec![]));
        session.derive_title();
        assert_eq!(session.title, "plan a weekend in Lisbon");
    }

    #[test]
    fn test_derive_title_truncates_to_forty_chars() {
        let mut session = Session::new("en-US");
        let long = "x".repeat(120);
        session.messages.push(Message::user(long, vec![]));
        session.derive_title();
        assert_eq!(session.title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_derive_title_keeps_custom_title() {
        let mut session = Session::new("en-US");
        session.title = "Honeymoon ideas".to_string();
        session.messages.push(Message::user("hello", vec![]));
        session.derive_title();
        assert_eq!(session.title, "Honeymoon ideas");
    }

    #[test]
    fn test_derive_title_ignores_bot_messages() {
        let mut session = Session::new("en-US");
        session.messages.push(Message::bot("I am a bot"));
        session.derive_title();
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
    }

    #[test]
    fn test_session_not_fresh_after_user_turn() {
        let mut session = Session::new("en-US");
        session.messages.push(Message::user("hi", vec![]));
        assert!(!session.is_fresh());
    }

    // ---- Serde ----

    #[test]
    fn test_session_serde_round_trip() {
        let mut session = Session::new("hi-IN");
        session.messages.push(Message::user(
            "show me the beach",
            vec![UploadedFile::image("b.jpg", "image/jpeg", "QUJD".into())],
        ));
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_delivery_state_serde_snake_case() {
        let json = serde_json::to_string(&DeliveryState::Streaming).unwrap();
        assert_eq!(json, "\"streaming\"");
    }
}
