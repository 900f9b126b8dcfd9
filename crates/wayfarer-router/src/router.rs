//! Ordered routing decision procedure.
//!
//! Priority order (first match wins):
//! 1. Language switch
//! 2. Art-style selection (pending image prompt exists)
//! 3. Image edit (exactly one attached image + instruction)
//! 4. Image-generation intent (offer styles, no backend call)
//! 5. Trip-plan shortcut phrase
//! 6. Default conversational turn

use wayfarer_core::lang::{self, Language};
use wayfarer_core::types::UploadedFile;

use crate::patterns::RouterPatterns;

/// Fixed enumerated art styles offered after an image-generation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtStyle {
    Photorealistic,
    Watercolor,
    Anime,
    OilPainting,
    PixelArt,
    Minimalist,
}

impl ArtStyle {
    /// Every style, in presentation order.
    pub const ALL: [ArtStyle; 6] = [
        ArtStyle::Photorealistic,
        ArtStyle::Watercolor,
        ArtStyle::Anime,
        ArtStyle::OilPainting,
        ArtStyle::PixelArt,
        ArtStyle::Minimalist,
    ];

    /// Display label, also the exact text a selection must match.
    pub fn label(&self) -> &'static str {
        match self {
            ArtStyle::Photorealistic => "Photorealistic",
            ArtStyle::Watercolor => "Watercolor",
            ArtStyle::Anime => "Anime",
            ArtStyle::OilPainting => "Oil Painting",
            ArtStyle::PixelArt => "Pixel Art",
            ArtStyle::Minimalist => "Minimalist",
        }
    }

    /// Resolve a submitted text to a style, case-insensitively, trimmed.
    pub fn from_label(text: &str) -> Option<ArtStyle> {
        let text = text.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(text))
    }
}

/// One user submission: text plus any staged files.
#[derive(Debug, Clone)]
pub struct Submission {
    pub text: String,
    pub files: Vec<UploadedFile>,
}

impl Submission {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(text: impl Into<String>, files: Vec<UploadedFile>) -> Self {
        Self {
            text: text.into(),
            files,
        }
    }
}

/// Session-side state the router classifies against.
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// Language code of the current session.
    pub session_language: &'a str,
    /// Provisional prompt awaiting an art-style selection, if any.
    pub pending_image_prompt: Option<&'a str>,
}

/// The single action decided for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    /// Mutate session language and confirm in the new language. No backend.
    SwitchLanguage { language: &'static Language },
    /// Pending prompt plus a chosen style; clears pending state.
    GenerateImage { prompt: String, style: ArtStyle },
    /// Edit the single attached image with the given instruction.
    EditImage {
        file: UploadedFile,
        instruction: String,
    },
    /// Record the pending prompt and offer the art-style chips. No backend.
    OfferStyles { prompt: String },
    /// Canned, language-specific static reply. No backend.
    TripPlan { language_code: &'static str },
    /// Plain conversational turn, delegated to the conversation engine.
    Chat {
        text: String,
        files: Vec<UploadedFile>,
    },
}

/// Classifies submissions. Patterns are compiled once at construction.
pub struct IntentRouter {
    patterns: RouterPatterns,
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentRouter {
    pub fn new() -> Self {
        Self {
            patterns: RouterPatterns::new(),
        }
    }

    /// Decide exactly one action for the submission. Pure: no side effects,
    /// idempotent per submission.
    pub fn route(&self, submission: Submission, ctx: &RouteContext<'_>) -> RouterAction {
        let Submission { text, files } = submission;

        // 1. Language switch, only when the target actually differs.
        if let Some(language) = self.patterns.detect_language(&text) {
            if language.code != ctx.session_language {
                tracing::debug!(target_language = language.code, "Routed: language switch");
                return RouterAction::SwitchLanguage { language };
            }
        }

        // 2. Art-style selection against a pending prompt.
        if let Some(pending) = ctx.pending_image_prompt {
            if let Some(style) = ArtStyle::from_label(&text) {
                tracing::debug!(style = style.label(), "Routed: style selection");
                return RouterAction::GenerateImage {
                    prompt: pending.to_string(),
                    style,
                };
            }
        }

        // 3. Image edit: exactly one image file plus an instruction.
        if files.len() == 1 && files[0].is_image() && !text.trim().is_empty() {
            let mut files = files;
            return RouterAction::EditImage {
                file: files.remove(0),
                instruction: text,
            };
        }

        // 4. Image-generation intent, text only.
        if files.is_empty() && self.patterns.is_image_request(&text) {
            return RouterAction::OfferStyles { prompt: text };
        }

        // 5. Trip-plan shortcut, matched across every supported language.
        let trimmed = text.trim().to_lowercase();
        for language in lang::SUPPORTED_LANGUAGES {
            let label = lang::strings_for(language.code).trip_plan_label;
            if trimmed == label.to_lowercase() {
                return RouterAction::TripPlan {
                    language_code: language.code,
                };
            }
        }

        // 6. Default conversational turn.
        RouterAction::Chat { text, files }
    }
}

// =============================================================================
// Tests
// =============================================================================
