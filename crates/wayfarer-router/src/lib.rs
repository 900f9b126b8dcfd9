//! Intent routing for user submissions.
//!
//! Classifies one submission `{text, files}` against the current session and
//! pending state, and decides exactly one action, evaluated in a fixed
//! priority order. The order is a literal, tested contract - downstream
//! behavior depends on it.

pub mod patterns;
pub mod router;

pub use patterns::RouterPatterns;
pub use router::{ArtStyle, IntentRouter, RouteContext, RouterAction, Submission};
