//! Media backend capability interface.
//!
//! The generative backend is an external collaborator; this trait is the
//! narrow surface the coordinator depends on. A mock implementation is
//! provided for testing without a real service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use wayfarer_core::error::{Result, WayfarerError};

/// An inline binary image: MIME type plus base64 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    /// Render as a `data:` URI for display layers.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Outcome of an image generation or edit call.
///
/// A successful response carries an inline image, an explanatory text, or
/// both; a response with neither is treated as a failure by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct ImageResult {
    pub image: Option<InlineImage>,
    pub text: Option<String>,
    /// Explicit block reason reported by the backend.
    pub block_reason: Option<String>,
    /// The safety system rejected the request outright.
    pub safety_blocked: bool,
}

/// Handle for a submitted video generation job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub id: String,
}

/// One status check of a video job.
#[derive(Debug, Clone, Default)]
pub struct VideoStatus {
    pub done: bool,
    pub result_uri: Option<String>,
}

/// Capability interface for image and video generation.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Generate an image from a prompt.
    async fn generate_image(&self, prompt: &str) -> Result<ImageResult>;

    /// Edit an existing image with an instruction.
    async fn edit_image(&self, image: &InlineImage, instruction: &str) -> Result<ImageResult>;

    /// Submit a video generation job.
    async fn start_video(
        &self,
        image: Option<&InlineImage>,
        prompt: &str,
        aspect_ratio: &str,
    ) -> Result<VideoJob>;

    /// Check a job once. The coordinator owns the poll loop.
    async fn poll_video(&self, job: &VideoJob) -> Result<VideoStatus>;
}

/// Mock media backend for testing.
///
/// Image calls return a scripted `ImageResult` (or a scripted error); video
/// polls pop from a scripted status sequence, repeating the last status once
/// the sequence is exhausted.
#[derive(Default)]
pub struct MockMediaBackend {
    image_response: Mutex<Option<ImageResult>>,
    image_error: Mutex<Option<String>>,
    video_error: Mutex<Option<String>>,
    poll_sequence: Mutex<VecDeque<VideoStatus>>,
    poll_count: AtomicU32,
}

impl MockMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next image result.
    pub fn with_image_result(self, result: ImageResult) -> Self {
        *self.image_response.lock().expect("mock mutex poisoned") = Some(result);
        self
    }

    /// Script image calls to fail with a backend error.
    pub fn with_image_error(self, message: &str) -> Self {
        *self.image_error.lock().expect("mock mutex poisoned") = Some(message.to_string());
        self
    }

    /// Script video submission to fail.
    pub fn with_video_error(self, message: &str) -> Self {
        *self.video_error.lock().expect("mock mutex poisoned") = Some(message.to_string());
        self
    }

    /// Script the poll status sequence.
    pub fn with_poll_sequence(self, statuses: Vec<VideoStatus>) -> Self {
        *self.poll_sequence.lock().expect("mock mutex poisoned") = statuses.into();
        self
    }

    /// Number of poll calls observed.
    pub fn polls(&self) -> u32 {
        self.poll_count.load(Ordering::Relaxed)
    }

    fn image_call(&self) -> Result<ImageResult> {
        if let Some(msg) = self.image_error.lock().expect("mock mutex poisoned").clone() {
            return Err(WayfarerError::Backend(msg));
        }
        Ok(self
            .image_response
            .lock()
            .expect("mock mutex poisoned")
            .clone()
            .unwrap_or_default())
    }
}

#[async_trait]
impl MediaBackend for MockMediaBackend {
    async fn generate_image(&self, _prompt: &str) -> Result<ImageResult> {
        self.image_call()
    }

    async fn edit_image(&self, _image: &InlineImage, _instruction: &str) -> Result<ImageResult> {
        self.image_call()
    }

    async fn start_video(
        &self,
        _image: Option<&InlineImage>,
        _prompt: &str,
        _aspect_ratio: &str,
    ) -> Result<VideoJob> {
        if let Some(msg) = self.video_error.lock().expect("mock mutex poisoned").clone() {
            return Err(WayfarerError::Backend(msg));
        }
        Ok(VideoJob {
            id: "mock-job-1".to_string(),
        })
    }

    async fn poll_video(&self, _job: &VideoJob) -> Result<VideoStatus> {
        self.poll_count.fetch_add(1, Ordering::Relaxed);
        let mut seq = self.poll_sequence.lock().expect("mock mutex poisoned");
        if seq.len() > 1 {
            Ok(seq.pop_front().unwrap_or_default())
        } else {
            Ok(seq.front().cloned().unwrap_or(VideoStatus {
                done: true,
                result_uri: None,
            }))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
