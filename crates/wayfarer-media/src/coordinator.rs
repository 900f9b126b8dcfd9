//! Media generation coordinator.
//!
//! Resolves exactly one placeholder message per call through the session
//! store's update path. Image flows map the backend's three rejection shapes
//! (safety block, explicit block reason, empty result) to distinct localized
//! variants; the video flow is the poll-until-ready loop.

use std::sync::Arc;

use uuid::Uuid;

use wayfarer_core::config::MediaSettings;
use wayfarer_core::error::Result;
use wayfarer_core::lang;
use wayfarer_core::types::{DeliveryState, FilePayload, UploadedFile, VideoPhase};
use wayfarer_store::SessionStore;

use crate::backend::{ImageResult, InlineImage, MediaBackend, VideoStatus};

/// Coordinates image generation/editing and video jobs against the store.
pub struct MediaCoordinator {
    backend: Arc<dyn MediaBackend>,
    store: Arc<SessionStore>,
    settings: MediaSettings,
}

impl MediaCoordinator {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        store: Arc<SessionStore>,
        settings: MediaSettings,
    ) -> Self {
        Self {
            backend,
            store,
            settings,
        }
    }

    /// Generate an image for a stored prompt and chosen style, resolving the
    /// placeholder with the result. No retries.
    pub async fn generate_image(
        &self,
        session_id: Uuid,
        placeholder_id: u64,
        prompt: &str,
        style_label: &str,
    ) -> Result<()> {
        let full_prompt = format!("{}, in {} style", prompt, style_label);
        tracing::info!(session = %session_id, style = style_label, "Image generation started");
        let outcome = self.backend.generate_image(&full_prompt).await;
        self.resolve_image(session_id, placeholder_id, outcome)
    }

    /// Edit a single attached image with an instruction.
    pub async fn edit_image(
        &self,
        session_id: Uuid,
        placeholder_id: u64,
        file: &UploadedFile,
        instruction: &str,
    ) -> Result<()> {
        let image = match &file.payload {
            FilePayload::Base64(data) => InlineImage {
                mime_type: file.mime_type.clone(),
                data: data.clone(),
            },
            FilePayload::Text(_) => {
                // Router guarantees an image MIME; a text payload here means
                // the staging layer misbehaved.
                let lang_code = self.language_of(session_id);
                let notice = lang::strings_for(&lang_code).image_empty.to_string();
                self.fail_placeholder(session_id, placeholder_id, notice)?;
                return Ok(());
            }
        };
        tracing::info!(session = %session_id, file = %file.name, "Image edit started");
        let outcome = self.backend.edit_image(&image, instruction).await;
        self.resolve_image(session_id, placeholder_id, outcome)
    }

    /// Generate a video from an image and prompt, polling until the job is
    /// done. Resolves the tagged placeholder to `Done` with a credentialed
    /// URL, or `Failed` with the error's message. The loop has no timeout and
    /// no cancellation; teardown simply abandons the pending timer.
    pub async fn generate_video(
        &self,
        session_id: Uuid,
        placeholder_id: u64,
        image: Option<InlineImage>,
        prompt: &str,
    ) -> Result<()> {
        match self.run_video_job(image, prompt).await {
            Ok(url) => {
                self.store.update_message(session_id, placeholder_id, |m| {
                    if m.video == Some(VideoPhase::Generating) {
                        m.video = Some(VideoPhase::Done);
                        m.video_url = Some(url);
                        m.delivery = DeliveryState::Resolved;
                    }
                })?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "Video job failed");
                self.store.update_message(session_id, placeholder_id, |m| {
                    if m.video == Some(VideoPhase::Generating) {
                        m.video = Some(VideoPhase::Failed);
                        m.text = e.to_string();
                        m.delivery = DeliveryState::Failed;
                    }
                })?;
                Ok(())
            }
        }
    }

    /// Submit and poll one video job to completion.
    async fn run_video_job(&self, image: Option<InlineImage>, prompt: &str) -> Result<String> {
        let job = self
            .backend
            .start_video(image.as_ref(), prompt, &self.settings.video_aspect_ratio)
            .await?;
        tracing::info!(job = %job.id, "Video job submitted");

        let interval = std::time::Duration::from_secs(self.settings.video_poll_interval_secs);
        let status: VideoStatus = loop {
            let status = self.backend.poll_video(&job).await?;
            if status.done {
                break status;
            }
            tracing::debug!(job = %job.id, "Video job still running");
            tokio::time::sleep(interval).await;
        };

        let uri = status.result_uri.ok_or_else(|| {
            wayfarer_core::error::WayfarerError::Media(
                "Video job completed without a result URL".to_string(),
            )
        })?;
        Ok(self.credentialed(&uri))
    }

    /// Append the access token to a playable URL.
    fn credentialed(&self, uri: &str) -> String {
        if self.settings.access_token.is_empty() {
            return uri.to_string();
        }
        let sep = if uri.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", uri, sep, self.settings.access_token)
    }

    /// Resolve an image placeholder from a backend outcome.
    fn resolve_image(
        &self,
        session_id: Uuid,
        placeholder_id: u64,
        outcome: Result<ImageResult>,
    ) -> Result<()> {
        let lang_code = self.language_of(session_id);
        let strings = lang::strings_for(&lang_code);

        match outcome {
            Ok(result) => {
                if result.safety_blocked {
                    return self.fail_placeholder(
                        session_id,
                        placeholder_id,
                        strings.image_safety.to_string(),
                    );
                }
                if let Some(reason) = result.block_reason {
                    let notice = format!("{}{}", strings.image_blocked_prefix, reason);
                    return self.fail_placeholder(session_id, placeholder_id, notice);
                }
                if result.image.is_none() && result.text.is_none() {
                    return self.fail_placeholder(
                        session_id,
                        placeholder_id,
                        strings.image_empty.to_string(),
                    );
                }
                self.store.update_message(session_id, placeholder_id, |m| {
                    if let Some(img) = &result.image {
                        m.images.push(img.to_data_uri());
                    }
                    m.text = result.text.clone().unwrap_or_default();
                    m.delivery = DeliveryState::Resolved;
                })?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "Image call failed");
                self.fail_placeholder(
                    session_id,
                    placeholder_id,
                    strings.failure_notice.to_string(),
                )
            }
        }
    }

    fn fail_placeholder(&self, session_id: Uuid, placeholder_id: u64, notice: String) -> Result<()> {
        self.store.update_message(session_id, placeholder_id, |m| {
            m.text = notice;
            m.delivery = DeliveryState::Failed;
        })?;
        Ok(())
    }

    fn language_of(&self, session_id: Uuid) -> String {
        self.store
            .session(session_id)
            .map(|s| s.language)
            .unwrap_or_else(|| "en-US".to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
