//! Brand mention detector.
//!
//! Detection is a fixed precedence chain of stages. Each stage inspects the
//! shared [`Detection`] state, may push mentions, and either lets the chain
//! continue or stops it:
//!
//! 1. empty text → `not_found`, stop
//! 2. brand citation already found by the classifier → `direct_citation`
//! 3. exact brand name / alias → `brand_name` per distinct matched text
//! 4. project domain written in the text → `direct_citation`
//! 5. no textual hit → closest fuzzy word → `indirect_mention`
//! 6. still nothing → `not_found`

use std::collections::HashSet;
use std::sync::LazyLock;

use citescope_core::{DetectedMention, DetectorConfig, MentionType};
use regex::{Regex, RegexBuilder};

use crate::lexicon::classify_sentiment;

static DEFAULT_CONFIG: LazyLock<DetectorConfig> = LazyLock::new(DetectorConfig::default);

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid word regex"));

const DOMAIN_TEXT_CONFIDENCE: f64 = 0.9;
const SCANNED_NOT_FOUND_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy)]
pub struct MentionInput<'a> {
    pub response_text: &'a str,
    pub brand_name: &'a str,
    pub brand_aliases: &'a [String],
    pub project_domain: &'a str,
    /// `true` when the classifier found at least one brand citation for this response.
    pub has_citation_match: bool,
}

/// Detect brand mentions using the built-in tuning.
#[must_use]
pub fn detect_brand_mentions(input: &MentionInput<'_>) -> Vec<DetectedMention> {
    detect_brand_mentions_with(input, &DEFAULT_CONFIG)
}

/// Detect brand mentions with explicit tuning.
///
/// Never fails: a response without any brand presence yields exactly one
/// `not_found` mention, and `not_found` never appears alongside anything else.
#[must_use]
pub fn detect_brand_mentions_with(
    input: &MentionInput<'_>,
    config: &DetectorConfig,
) -> Vec<DetectedMention> {
    let mut detection = Detection {
        input,
        config,
        mentions: Vec::new(),
        textual_match: false,
    };

    for stage in STAGES {
        if let Stage::Stop = stage(&mut detection) {
            break;
        }
    }

    detection.mentions
}

enum Stage {
    Continue,
    Stop,
}

struct Detection<'a> {
    input: &'a MentionInput<'a>,
    config: &'a DetectorConfig,
    mentions: Vec<DetectedMention>,
    /// Set once a brand name, alias or domain was found verbatim in the text.
    textual_match: bool,
}

impl Detection<'_> {
    fn push_match(&mut self, mention_type: MentionType, start: usize, end: usize, confidence: f64) {
        let text = self.input.response_text;
        let context = context_window(text, start, end, self.config.context_window);
        let sentiment = classify_sentiment(context, self.config);
        self.mentions.push(DetectedMention {
            mention_type,
            matched_text: text[start..end].to_string(),
            context: context.to_string(),
            confidence,
            sentiment: Some(sentiment),
        });
    }
}

type StageFn = fn(&mut Detection<'_>) -> Stage;

const STAGES: &[StageFn] = &[
    empty_text,
    citation_match,
    exact_match,
    domain_reference,
    fuzzy_match,
    not_found,
];

fn empty_text(d: &mut Detection<'_>) -> Stage {
    if d.input.response_text.trim().is_empty() {
        d.mentions.push(not_found_mention(1.0));
        return Stage::Stop;
    }
    Stage::Continue
}

fn citation_match(d: &mut Detection<'_>) -> Stage {
    if !d.input.has_citation_match {
        return Stage::Continue;
    }

    let text = d.input.response_text;
    if let Some((start, end)) = find_domain(text, d.input.project_domain) {
        d.push_match(MentionType::DirectCitation, start, end, 1.0);
        return Stage::Continue;
    }

    // Cited only through a URL the text never spells out: no context to quote.
    let domain = d.input.project_domain.trim().to_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain).to_string();
    d.mentions.push(DetectedMention {
        mention_type: MentionType::DirectCitation,
        matched_text: domain,
        context: String::new(),
        confidence: 1.0,
        sentiment: Some(classify_sentiment("", d.config)),
    });
    Stage::Continue
}

fn exact_match(d: &mut Detection<'_>) -> Stage {
    let text = d.input.response_text;
    let terms = std::iter::once(d.input.brand_name)
        .chain(d.input.brand_aliases.iter().map(String::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let mut seen: HashSet<String> = HashSet::new();
    let mut hits: Vec<(usize, usize)> = Vec::new();

    for term in terms {
        for (start, end) in whole_word_matches(text, term) {
            if seen.insert(text[start..end].to_string()) {
                hits.push((start, end));
            }
        }
    }

    hits.sort_unstable();
    for (start, end) in hits {
        d.push_match(MentionType::BrandName, start, end, 1.0);
        d.textual_match = true;
    }
    Stage::Continue
}

fn domain_reference(d: &mut Detection<'_>) -> Stage {
    if d.input.has_citation_match {
        return Stage::Continue;
    }
    if let Some((start, end)) = find_domain(d.input.response_text, d.input.project_domain) {
        d.push_match(MentionType::DirectCitation, start, end, DOMAIN_TEXT_CONFIDENCE);
        d.textual_match = true;
    }
    Stage::Continue
}

fn fuzzy_match(d: &mut Detection<'_>) -> Stage {
    if d.textual_match {
        return Stage::Continue;
    }

    let Some(target) = d
        .input
        .brand_name
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
    else {
        return Stage::Continue;
    };
    if target.chars().count() < d.config.fuzzy_min_length {
        return Stage::Continue;
    }

    let text = d.input.response_text;
    let mut best: Option<(usize, usize, usize)> = None;

    for word in WORD_RE.find_iter(text) {
        let distance = strsim::levenshtein(&word.as_str().to_lowercase(), &target);
        if distance > d.config.fuzzy_max_distance {
            continue;
        }
        // Strictly closer hits replace earlier ones; ties keep the first.
        if best.is_none_or(|(_, _, best_distance)| distance < best_distance) {
            best = Some((word.start(), word.end(), distance));
        }
    }

    if let Some((start, end, distance)) = best {
        tracing::debug!(
            matched = &text[start..end],
            distance,
            "fuzzy brand mention detected"
        );
        d.push_match(
            MentionType::IndirectMention,
            start,
            end,
            fuzzy_confidence(distance),
        );
    }
    Stage::Continue
}

fn not_found(d: &mut Detection<'_>) -> Stage {
    if d.mentions.is_empty() {
        d.mentions.push(not_found_mention(SCANNED_NOT_FOUND_CONFIDENCE));
    }
    Stage::Stop
}

fn not_found_mention(confidence: f64) -> DetectedMention {
    DetectedMention {
        mention_type: MentionType::NotFound,
        matched_text: String::new(),
        context: String::new(),
        confidence,
        sentiment: None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn fuzzy_confidence(distance: usize) -> f64 {
    (0.8 - 0.15 * distance as f64).clamp(0.1, 0.8)
}

/// Slice of `text` spanning up to `window` characters on either side of
/// `start..end`, clipped to the text bounds on char boundaries.
fn context_window(text: &str, start: usize, end: usize, window: usize) -> &str {
    let ctx_start = text[..start]
        .char_indices()
        .rev()
        .take(window)
        .last()
        .map_or(start, |(i, _)| i);
    let ctx_end = text[end..]
        .char_indices()
        .nth(window)
        .map_or(text.len(), |(i, _)| end + i);
    &text[ctx_start..ctx_end]
}

/// Case-insensitive occurrences of `term` that are not glued to other word
/// characters. Byte offsets index into `text`.
fn whole_word_matches(text: &str, term: &str) -> Vec<(usize, usize)> {
    let Ok(re) = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };

    re.find_iter(text)
        .filter(|m| is_boundary_before(text, m.start()) && is_boundary_after(text, m.end()))
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// First occurrence of the project domain (with optional `www.`) in `text`.
fn find_domain(text: &str, project_domain: &str) -> Option<(usize, usize)> {
    let domain = project_domain.trim().to_lowercase();
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);
    if domain.is_empty() {
        return None;
    }

    let pattern = format!(r"(?:www\.)?{}", regex::escape(domain));
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()?;

    let found = re
        .find_iter(text)
        .find(|m| is_boundary_before(text, m.start()) && is_boundary_after(text, m.end()))
        .map(|m| (m.start(), m.end()));
    found
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary_before(text: &str, start: usize) -> bool {
    let mut chars = text[..start].chars().rev();
    match chars.next() {
        None => true,
        Some(c) if is_word_char(c) => false,
        // "www.brand" or "sub.brand" glue the match into a longer host name.
        Some('.') => !chars.next().is_some_and(is_word_char),
        Some(_) => true,
    }
}

fn is_boundary_after(text: &str, end: usize) -> bool {
    let mut chars = text[end..].chars();
    match chars.next() {
        None => true,
        Some(c) if is_word_char(c) => false,
        // "brand.com" continues the token; "brand." ending a sentence does not.
        Some('.') => !chars.next().is_some_and(is_word_char),
        Some(_) => true,
    }
}

#[cfg(test)]
#[path = "detector_test.rs"]
mod tests;
