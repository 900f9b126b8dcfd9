//! Regex-based submission pattern matching.
//!
//! Provides the compiled patterns the router evaluates: the language-switch
//! phrase, the image-request lexical pattern, and the meta-question exclusion
//! that keeps questions *about* image generation out of the image flow.

use regex::Regex;

use wayfarer_core::lang::{self, Language, SUPPORTED_LANGUAGES};

/// Compiled router patterns, built once and reused.
pub struct RouterPatterns {
    language_switch: Regex,
    image_request: Regex,
    image_meta: Regex,
}

impl Default for RouterPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterPatterns {
    /// Compile all patterns. The language alternation is built from the
    /// supported-language table so the two can never drift apart.
    pub fn new() -> Self {
        let names = SUPPORTED_LANGUAGES
            .iter()
            .map(|l| l.name)
            .collect::<Vec<_>>()
            .join("|");

        let language_switch = Regex::new(&format!(
            r"(?i)\b(?:speak|talk\s+in|respond\s+in|change\s+to|switch\s+to|use|in)\s+({})\b",
            names
        ))
        .expect("Invalid language-switch regex");

        let image_request = Regex::new(
            r"(?i)\b(?:generate|create|draw|make|imagine|paint|sketch|render|show\s+me)\b",
        )
        .expect("Invalid image-request regex");

        let image_meta = Regex::new(
            r"(?i)\b(?:how|why|what|explain)\b.*\b(?:generate|create|draw|make|edit)",
        )
        .expect("Invalid image-meta regex");

        Self {
            language_switch,
            image_request,
            image_meta,
        }
    }

    /// Detect a language-switch phrase and resolve it against the
    /// supported-language table.
    pub fn detect_language(&self, text: &str) -> Option<&'static Language> {
        let caps = self.language_switch.captures(text)?;
        caps.get(1).and_then(|m| lang::find_by_name(m.as_str()))
    }

    /// Whether the text is an image request: matches the request lexicon and
    /// is not a meta-question about image generation.
    pub fn is_image_request(&self, text: &str) -> bool {
        self.image_request.is_match(text) && !self.image_meta.is_match(text)
    }
}

// =============================================================================
// Tests
// =============================================================================
