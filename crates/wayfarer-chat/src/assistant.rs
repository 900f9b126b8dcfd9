//! Assistant orchestrator.
//!
//! Takes one user submission, routes it, and executes the decided action
//! against the session store. Actions that never reach a backend (language
//! switch, style offer, trip plan) append their canned messages directly;
//! backend-bound actions append a user message plus a Pending placeholder and
//! hand the placeholder id to the engine or the media coordinator.
//!
//! The pending image prompt lives here, not in the store: it is provisional
//! state with a short lifetime, cleared on style selection, cancellation, or
//! any superseding submission.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use wayfarer_core::error::Result;
use wayfarer_core::lang;
use wayfarer_core::types::{GeneratedImage, Message, Suggestion};
use wayfarer_media::{InlineImage, MediaCoordinator};
use wayfarer_router::{ArtStyle, IntentRouter, RouteContext, RouterAction, Submission};
use wayfarer_store::SessionStore;

use crate::engine::ConversationEngine;

/// Persisted key for the text-to-speech toggle.
const TTS_KEY: &str = "tts_enabled";

/// Orchestrates routed actions against the store, the conversation engine,
/// and the media coordinator.
pub struct Assistant {
    router: IntentRouter,
    engine: Arc<ConversationEngine>,
    media: Arc<MediaCoordinator>,
    store: Arc<SessionStore>,
    pending_prompt: Mutex<Option<String>>,
}

impl Assistant {
    pub fn new(
        engine: Arc<ConversationEngine>,
        media: Arc<MediaCoordinator>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            router: IntentRouter::new(),
            engine,
            media,
            store,
            pending_prompt: Mutex::new(None),
        }
    }

    /// Route and execute one submission against the active session.
    pub async fn submit(&self, submission: Submission, location: Option<(f64, f64)>) -> Result<()> {
        let session = self.store.active_session();
        let session_id = session.id;
        let original_text = submission.text.clone();

        let pending = self.pending_prompt();
        let action = self.router.route(
            submission,
            &RouteContext {
                session_language: &session.language,
                pending_image_prompt: pending.as_deref(),
            },
        );

        match action {
            RouterAction::SwitchLanguage { language } => {
                self.set_pending(None);
                self.store
                    .push_message(session_id, Message::user(original_text, vec![]))?;
                self.store.set_language(session_id, language.code)?;
                let confirmation = lang::strings_for(language.code).switch_confirmation;
                self.store
                    .push_message(session_id, Message::bot(confirmation))?;
                self.engine.reset();
                tracing::info!(language = language.code, "Session language switched");
            }
            RouterAction::GenerateImage { prompt, style } => {
                self.set_pending(None);
                self.store
                    .push_message(session_id, Message::user(original_text, vec![]))?;
                let placeholder = Message::placeholder();
                let placeholder_id = placeholder.id;
                self.store.push_message(session_id, placeholder)?;
                self.media
                    .generate_image(session_id, placeholder_id, &prompt, style.label())
                    .await?;
            }
            RouterAction::EditImage { file, instruction } => {
                self.set_pending(None);
                self.store.push_message(
                    session_id,
                    Message::user(original_text, vec![file.clone()]),
                )?;
                let placeholder = Message::placeholder();
                let placeholder_id = placeholder.id;
                self.store.push_message(session_id, placeholder)?;
                self.media
                    .edit_image(session_id, placeholder_id, &file, &instruction)
                    .await?;
            }
            RouterAction::OfferStyles { prompt } => {
                self.set_pending(Some(prompt));
                self.store
                    .push_message(session_id, Message::user(original_text, vec![]))?;
                let mut offer =
                    Message::bot(lang::strings_for(&session.language).style_offer);
                offer.suggestions = ArtStyle::ALL
                    .iter()
                    .map(|s| Suggestion::new(s.label(), "palette"))
                    .collect();
                self.store.push_message(session_id, offer)?;
            }
            RouterAction::TripPlan { language_code } => {
                self.set_pending(None);
                self.store
                    .push_message(session_id, Message::user(original_text, vec![]))?;
                let reply = lang::strings_for(language_code).trip_plan_reply;
                self.store.push_message(session_id, Message::bot(reply))?;
            }
            RouterAction::Chat { text, files } => {
                self.set_pending(None);
                self.store
                    .push_message(session_id, Message::user(text.clone(), files.clone()))?;
                let placeholder = Message::placeholder();
                let placeholder_id = placeholder.id;
                self.store.push_message(session_id, placeholder)?;
                self.engine
                    .submit(session_id, placeholder_id, &text, &files, location)
                    .await?;
            }
        }
        Ok(())
    }

    /// Start a video job animating a generated image. The image travels as
    /// inline data when the source is a data URI, otherwise prompt-only.
    pub async fn animate_image(
        &self,
        session_id: Uuid,
        src: &str,
        prompt: &str,
    ) -> Result<()> {
        let image = parse_data_uri(src);
        let placeholder = Message::video_placeholder();
        let placeholder_id = placeholder.id;
        self.store.push_message(session_id, placeholder)?;
        self.media
            .generate_video(session_id, placeholder_id, image, prompt)
            .await
    }

    /// Create a new session in the given language and make it active.
    pub fn new_chat(&self, language: &str) -> Result<Uuid> {
        self.set_pending(None);
        self.engine.reset();
        self.store.create_session(language)
    }

    /// Delete a session; returns the id active afterwards.
    pub fn delete_session(&self, id: Uuid) -> Result<Uuid> {
        if self.store.active_id() == id {
            self.set_pending(None);
            self.engine.reset();
        }
        self.store.delete_session(id)
    }

    /// Switch the active session.
    pub fn set_active(&self, id: Uuid) -> Result<()> {
        self.set_pending(None);
        self.store.set_active(id)
    }

    /// Drop the pending image prompt without generating anything.
    pub fn cancel_pending_prompt(&self) {
        self.set_pending(None);
    }

    /// The prompt currently awaiting a style selection, if any.
    pub fn pending_prompt(&self) -> Option<String> {
        self.pending_prompt
            .lock()
            .expect("assistant mutex poisoned")
            .clone()
    }

    /// All generated images across sessions, newest first.
    pub fn gallery(&self) -> Vec<GeneratedImage> {
        self.store.gallery()
    }

    /// Whether spoken replies are enabled. Defaults to on.
    pub fn tts_enabled(&self) -> Result<bool> {
        Ok(self.store.load_setting(TTS_KEY)?.unwrap_or(true))
    }

    /// Persist the text-to-speech toggle.
    pub fn set_tts_enabled(&self, enabled: bool) -> Result<()> {
        self.store.save_setting(TTS_KEY, enabled)
    }

    fn set_pending(&self, value: Option<String>) {
        *self
            .pending_prompt
            .lock()
            .expect("assistant mutex poisoned") = value;
    }
}

/// Split a `data:<mime>;base64,<payload>` URI into an inline image.
fn parse_data_uri(src: &str) -> Option<InlineImage> {
    let rest = src.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    Some(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
