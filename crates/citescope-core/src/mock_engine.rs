//! Deterministic stand-in for a real AI answer engine.
//!
//! Each `(keyword, engine)` pair hashes to a fixed PRNG seed, so the same
//! scenario always produces the same response text and citation list. Used by
//! the CLI `simulate` command and by pipeline tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

const THIRD_PARTY_DOMAINS: &[&str] = &[
    "techcrunch.com",
    "wikipedia.org",
    "g2.com",
    "reddit.com",
    "forbes.com",
];

const POSITIVE_TAILS: &[&str] = &[
    "is often recommended as the best option",
    "is a trusted and reliable choice",
    "stands out as a top choice for teams",
];

const NEGATIVE_TAILS: &[&str] = &[
    "can be expensive for small teams",
    "is sometimes described as complicated to set up",
];

const NEUTRAL_TAILS: &[&str] = &[
    "offers a range of features",
    "is one of several tools in this space",
];

/// A competitor as the mock engine knows it.
#[derive(Debug, Clone)]
pub struct MockCompetitor {
    pub name: String,
    pub domain: String,
}

/// Inputs shared by every response the mock engine produces.
#[derive(Debug, Clone)]
pub struct MockScenario {
    pub brand_name: String,
    pub brand_domain: String,
    pub competitors: Vec<MockCompetitor>,
    /// Probability in `[0, 1]` that the brand is cited for a keyword.
    pub brand_cite_probability: f64,
}

/// One simulated engine answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub engine: String,
    pub keyword: String,
    pub text: String,
    pub structured_citations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockEngine {
    scenario: MockScenario,
}

impl MockEngine {
    #[must_use]
    pub fn new(scenario: MockScenario) -> Self {
        Self { scenario }
    }

    /// Produce the response `engine` would give for `keyword`.
    #[must_use]
    pub fn respond(&self, keyword: &str, engine: &str) -> MockResponse {
        let mut rng = StdRng::seed_from_u64(seed_for(keyword, engine));
        let scenario = &self.scenario;

        let mut sentences = vec![format!(
            "Here is an overview of {keyword} based on current sources."
        )];
        let mut structured = Vec::new();

        let cites_brand = rng.random_bool(scenario.brand_cite_probability.clamp(0.0, 1.0));
        let brand_first = rng.random_bool(0.5);

        if cites_brand && brand_first {
            push_brand(scenario, keyword, &mut sentences, &mut structured, &mut rng);
        }

        for competitor in &scenario.competitors {
            if rng.random_bool(0.6) {
                let tail = pick_tail(&mut rng);
                sentences.push(format!("{} {tail}.", competitor.name));
                structured.push(format!(
                    "https://{}/{}",
                    competitor.domain,
                    slugify(keyword)
                ));
            }
        }

        if cites_brand && !brand_first {
            push_brand(scenario, keyword, &mut sentences, &mut structured, &mut rng);
        }

        let third_party = THIRD_PARTY_DOMAINS[rng.random_range(0..THIRD_PARTY_DOMAINS.len())];
        let inline_url = format!("https://{third_party}/articles/{}", slugify(keyword));
        sentences.push(format!("Further reading: [{third_party}]({inline_url})."));

        MockResponse {
            engine: engine.to_string(),
            keyword: keyword.to_string(),
            text: sentences.join(" "),
            structured_citations: structured,
        }
    }
}

fn push_brand(
    scenario: &MockScenario,
    keyword: &str,
    sentences: &mut Vec<String>,
    structured: &mut Vec<String>,
    rng: &mut StdRng,
) {
    let tail = pick_tail(rng);
    sentences.push(format!("{} {tail}.", scenario.brand_name));
    structured.push(format!(
        "https://www.{}/{}",
        scenario.brand_domain,
        slugify(keyword)
    ));
}

fn pick_tail(rng: &mut StdRng) -> &'static str {
    let roll: f64 = rng.random();
    let pool = if roll < 0.5 {
        POSITIVE_TAILS
    } else if roll < 0.75 {
        NEUTRAL_TAILS
    } else {
        NEGATIVE_TAILS
    };
    pool[rng.random_range(0..pool.len())]
}

fn seed_for(keyword: &str, engine: &str) -> u64 {
    let digest = Sha256::digest(format!("{keyword}|{engine}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn slugify(keyword: &str) -> String {
    keyword
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
