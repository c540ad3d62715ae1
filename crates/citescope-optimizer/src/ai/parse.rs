//! Tolerant parsing of free-text reasoning-service replies.
//!
//! The service is asked for a JSON object but nothing enforces it. Replies
//! are tried against each strategy in turn; the first that yields a valid
//! [`AiResponse`] wins and total failure is `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("valid fenced block regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiResponse {
    #[serde(default)]
    pub recommendations: Vec<AiRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AiRecommendation {
    /// Raw type string as the service wrote it; normalized by the analyzer.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "actionable_steps", alias = "actionableSteps")]
    pub steps: Vec<String>,
}

type Strategy = fn(&str) -> Option<AiResponse>;

const STRATEGIES: &[Strategy] = &[parse_direct, parse_fenced, parse_first_object];

/// Parse a reply into an [`AiResponse`], or `None` if no strategy succeeds.
#[must_use]
pub fn parse_ai_response(text: &str) -> Option<AiResponse> {
    STRATEGIES.iter().find_map(|strategy| strategy(text))
}

fn parse_direct(text: &str) -> Option<AiResponse> {
    serde_json::from_str(text.trim()).ok()
}

fn parse_fenced(text: &str) -> Option<AiResponse> {
    FENCED_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| parse_direct(body.as_str()))
}

fn parse_first_object(text: &str) -> Option<AiResponse> {
    first_balanced_object(text).and_then(parse_direct)
}

/// Slice of the first `{...}` whose braces balance, ignoring braces inside
/// JSON string literals.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{"recommendations":[{"type":"add_comparison","title":"Compare","description":"d","steps":["a","b"]}]}"#;

    fn titles(resp: &AiResponse) -> Vec<&str> {
        resp.recommendations.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn parses_bare_json() {
        let resp = parse_ai_response(BODY).unwrap();
        assert_eq!(titles(&resp), vec!["Compare"]);
        assert_eq!(resp.recommendations[0].kind, "add_comparison");
        assert_eq!(resp.recommendations[0].steps, vec!["a", "b"]);
    }

    #[test]
    fn parses_fenced_json_block() {
        let text = format!("Here you go:\n```json\n{BODY}\n```\nGood luck!");
        assert_eq!(titles(&parse_ai_response(&text).unwrap()), vec!["Compare"]);
    }

    #[test]
    fn parses_unlabelled_fence() {
        let text = format!("```\n{BODY}\n```");
        assert!(parse_ai_response(&text).is_some());
    }

    #[test]
    fn falls_back_to_first_balanced_object() {
        let text = format!("Sure! {BODY} Let me know if you need more.");
        assert_eq!(titles(&parse_ai_response(&text).unwrap()), vec!["Compare"]);
    }

    #[test]
    fn braces_inside_strings_do_not_break_matching() {
        let text = r#"Result: {"recommendations":[{"type":"x","title":"Use {braces} and \"quotes\"","steps":[]}]} trailing }"#;
        let resp = parse_ai_response(text).unwrap();
        assert_eq!(titles(&resp), vec![r#"Use {braces} and "quotes""#]);
    }

    #[test]
    fn accepts_camel_case_steps() {
        let text = r#"{"recommendations":[{"type":"add_schema","title":"t","actionableSteps":["one"]}]}"#;
        assert_eq!(parse_ai_response(text).unwrap().recommendations[0].steps, vec!["one"]);
    }

    #[test]
    fn missing_fields_default() {
        let resp = parse_ai_response(r#"{"recommendations":[{}]}"#).unwrap();
        assert_eq!(resp.recommendations[0].kind, "");
        assert!(resp.recommendations[0].steps.is_empty());
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_ai_response("I cannot help with that.").is_none());
        assert!(parse_ai_response("").is_none());
        assert!(parse_ai_response("{ not json at all }").is_none());
        assert!(parse_ai_response("{\"recommendations\": [").is_none());
    }

    #[test]
    fn wrong_shape_yields_none() {
        assert!(parse_ai_response(r#"{"recommendations":"nope"}"#).is_none());
        assert!(parse_ai_response("[1, 2, 3]").is_none());
    }
}
