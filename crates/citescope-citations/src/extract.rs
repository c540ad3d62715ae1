//! Raw citation extraction from one engine response.

use std::collections::HashSet;
use std::sync::LazyLock;

use citescope_core::RawCitation;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{canonicalize_url, url_domain};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhttps?://[^\s<>"'`\[\]*]+"#).expect("valid url regex")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionInput {
    /// URLs the engine reported as sources, in the engine's order.
    #[serde(default)]
    pub structured_citations: Vec<String>,
    /// Full answer text; inline links are recovered from it.
    #[serde(default)]
    pub raw_response_text: String,
}

/// Build the ranked, de-duplicated citation list for one response.
///
/// Structured URLs come first in their reported order, followed by any URLs
/// found in the text. Duplicates (by canonical URL) keep their first
/// occurrence; positions are 1-based ranks in the de-duplicated list.
/// Malformed URLs are skipped.
#[must_use]
pub fn extract_citations(input: &ExtractionInput) -> Vec<RawCitation> {
    let inline = URL_RE
        .find_iter(&input.raw_response_text)
        .map(|m| trim_inline_url(m.as_str()));

    let candidates = input
        .structured_citations
        .iter()
        .map(String::as_str)
        .chain(inline);

    let mut seen: HashSet<String> = HashSet::new();
    let mut citations = Vec::new();
    let mut skipped = 0usize;

    for raw in candidates {
        let Some(url) = canonicalize_url(raw) else {
            skipped += 1;
            continue;
        };
        let Some(domain) = url_domain(&url) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        let position = u32::try_from(citations.len() + 1).unwrap_or(u32::MAX);
        citations.push(RawCitation {
            url,
            domain,
            position: Some(position),
        });
    }

    if skipped > 0 {
        tracing::debug!(skipped, kept = citations.len(), "skipped malformed citation urls");
    }

    citations
}

/// Drop sentence punctuation and closing parens that belong to the
/// surrounding prose. Balanced parens inside the URL stay.
fn trim_inline_url(raw: &str) -> &str {
    let mut url = raw;
    loop {
        url = url.trim_end_matches(TRAILING_PUNCTUATION);
        let unbalanced = url.matches(')').count() > url.matches('(').count();
        match url.strip_suffix(')') {
            Some(rest) if unbalanced => url = rest,
            _ => return url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(structured: &[&str], text: &str) -> ExtractionInput {
        ExtractionInput {
            structured_citations: structured.iter().map(|s| (*s).to_string()).collect(),
            raw_response_text: text.to_string(),
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(extract_citations(&ExtractionInput::default()).is_empty());
    }

    #[test]
    fn structured_urls_keep_order_and_rank() {
        let out = extract_citations(&input(
            &[
                "https://www.soldierdata.com/x",
                "https://ahrefs.com/y",
                "https://techcrunch.com/z",
            ],
            "",
        ));
        let positions: Vec<_> = out.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(out[0].domain, "soldierdata.com");
        assert_eq!(out[1].domain, "ahrefs.com");
    }

    #[test]
    fn duplicates_keep_first_position() {
        let out = extract_citations(&input(
            &["https://a.com/page", "https://b.com/", "https://a.com/page/"],
            "See https://a.com/page#section and https://c.com/new.",
        ));
        let urls: Vec<_> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.com/page", "https://b.com/", "https://c.com/new"]
        );
        assert_eq!(out[2].position, Some(3));
    }

    #[test]
    fn same_domain_different_paths_are_distinct_citations() {
        let out = extract_citations(&input(&["https://a.com/one", "https://a.com/two"], ""));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].position, Some(2));
    }

    #[test]
    fn inline_markdown_links_are_recovered() {
        let out = extract_citations(&input(
            &[],
            "According to [G2](https://www.g2.com/categories/seo), it leads.",
        ));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://www.g2.com/categories/seo");
        assert_eq!(out[0].domain, "g2.com");
    }

    #[test]
    fn balanced_parens_stay_in_the_url() {
        let out = extract_citations(&input(
            &[],
            "See https://en.wikipedia.org/wiki/Foo_(bar) for background.",
        ));
        assert_eq!(out.len(), 1);
        assert!(out[0].url.ends_with("/wiki/Foo_(bar)"), "{}", out[0].url);
    }

    #[test]
    fn enclosing_parens_are_not_part_of_the_url() {
        let out = extract_citations(&input(
            &[],
            "Tools vary (see https://a.com/x). Also [wiki](https://en.wikipedia.org/wiki/Foo_(bar)).",
        ));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://a.com/x");
        assert!(out[1].url.ends_with("/wiki/Foo_(bar)"), "{}", out[1].url);
    }

    #[test]
    fn trailing_punctuation_is_trimmed() {
        let out = extract_citations(&input(&[], "Read https://moz.com/learn, then decide!"));
        assert_eq!(out[0].url, "https://moz.com/learn");
    }

    #[test]
    fn malformed_urls_are_skipped_without_shifting_ranks() {
        let out = extract_citations(&input(
            &["not-a-url", "https://good.com/a", "ftp://files.example.com", "https://"],
            "",
        ));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position, Some(1));
    }
}
