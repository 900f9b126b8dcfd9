//! Wayfarer core crate - shared domain types, errors, configuration, languages.
//!
//! Everything the other Wayfarer crates agree on lives here: the session and
//! message model, the error taxonomy, the TOML configuration schema, and the
//! supported-language table with its localized canned strings.

pub mod config;
pub mod error;
pub mod lang;
pub mod types;

pub use config::WayfarerConfig;
pub use error::{Result, WayfarerError};
pub use lang::{find_by_code, find_by_name, strings_for, Language, Strings, SUPPORTED_LANGUAGES};
pub use types::{
    DeliveryState, FilePayload, GeneratedImage, Message, Sender, Session, SourceRef, Suggestion,
    UploadedFile, VideoPhase,
};
