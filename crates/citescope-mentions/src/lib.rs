//! Brand mention detection over raw answer-engine text.
//!
//! Independent of URL citations: finds brand names, aliases, domain
//! references and near-miss spellings, and scores the sentiment around each
//! hit with a small cue-word lexicon.

pub mod detector;
pub mod lexicon;

pub use detector::{detect_brand_mentions, detect_brand_mentions_with, MentionInput};
pub use lexicon::classify_sentiment;
