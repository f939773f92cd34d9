//! Text anchor resolution.
//!
//! Places each finding's cited phrases back into document text:
//! admissibility filters, whitespace normalization with offset mapping,
//! ordered matcher strategies, match scoring, and per-document resolution.

pub mod admissibility;
pub mod matchers;
pub mod normalize;
pub mod resolve;
pub mod score;

pub use admissibility::{check_match, check_phrase, Rejection};
pub use matchers::{SearchText, Strategy, STRATEGIES};
pub use normalize::NormalizedText;
pub use resolve::{locate, resolve_all, resolve_anchor, resolve_document, trim_span};
pub use score::{match_quality, similarity};
