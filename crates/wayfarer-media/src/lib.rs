//! Media generation: image generation/editing and the long-running video flow.
//!
//! The coordinator resolves exactly one placeholder message per call and maps
//! backend rejections to distinct localized user-facing variants. The video
//! flow is a poll-until-ready loop with a fixed interval, no retries, no
//! timeout.

pub mod backend;
pub mod coordinator;

pub use backend::{ImageResult, InlineImage, MediaBackend, MockMediaBackend, VideoJob, VideoStatus};
pub use coordinator::MediaCoordinator;
