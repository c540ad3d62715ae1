//! Assembles the per-run [`AnalysisData`] read model from persisted rows.
//!
//! The database crate fetches the rows for one completed run; this module
//! folds them into per-keyword analyses. Pure and deterministic: the same
//! rows in any order produce the same `AnalysisData`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use citescope_core::{
    AnalysisData, AnalysisTotals, CitationClass, CitationRow, CompetitorCitationSummary,
    EngineBreakdown, KeywordAnalysis, KeywordRow, MentionRow, MentionType,
    PreviousRunSnapshot, ProjectContext, Sentiment,
};
use uuid::Uuid;

/// Sample URLs kept per competitor summary.
const MAX_SAMPLE_URLS: usize = 3;

/// Build the analysis snapshot for one run.
///
/// `previous_cited` lists the keywords that had a brand citation in the
/// immediately preceding completed run, or `None` when there is no such run.
/// Rows and previously cited ids for keywords outside `keywords` are ignored.
#[must_use]
pub fn build_analysis_data(
    project: ProjectContext,
    keywords: &[KeywordRow],
    citations: &[CitationRow],
    mentions: &[MentionRow],
    previous_cited: Option<Vec<Uuid>>,
) -> AnalysisData {
    let mut citations_by_keyword: HashMap<Uuid, Vec<&CitationRow>> = HashMap::new();
    for row in citations {
        citations_by_keyword.entry(row.keyword_id).or_default().push(row);
    }
    let mut mentions_by_keyword: HashMap<Uuid, Vec<&MentionRow>> = HashMap::new();
    for row in mentions {
        mentions_by_keyword.entry(row.keyword_id).or_default().push(row);
    }

    let keyword_analyses: Vec<KeywordAnalysis> = keywords
        .iter()
        .map(|kw| {
            build_keyword_analysis(
                kw,
                citations_by_keyword
                    .get(&kw.keyword_id)
                    .map_or(&[][..], Vec::as_slice),
                mentions_by_keyword
                    .get(&kw.keyword_id)
                    .map_or(&[][..], Vec::as_slice),
            )
        })
        .collect();

    let totals = AnalysisTotals {
        total_keywords: u32::try_from(keyword_analyses.len()).unwrap_or(u32::MAX),
        total_brand_citations: keyword_analyses
            .iter()
            .map(|k| k.brand_citation_count)
            .sum(),
        total_competitor_citations: keyword_analyses
            .iter()
            .map(KeywordAnalysis::competitor_citation_count)
            .sum(),
    };

    let tracked: BTreeSet<Uuid> = keywords.iter().map(|kw| kw.keyword_id).collect();
    let previous_run = previous_cited.map(|mut ids| {
        ids.retain(|id| tracked.contains(id));
        ids.sort_unstable();
        ids.dedup();
        PreviousRunSnapshot {
            cited_keyword_ids: ids,
        }
    });

    AnalysisData {
        project,
        keyword_analyses,
        previous_run,
        totals,
    }
}

#[derive(Default)]
struct EngineTally {
    brand: u32,
    competitor: u32,
}

struct CompetitorTally {
    name: String,
    count: u32,
    urls: BTreeSet<String>,
}

fn build_keyword_analysis(
    keyword: &KeywordRow,
    citations: &[&CitationRow],
    mentions: &[&MentionRow],
) -> KeywordAnalysis {
    // Every engine that answered stored at least one mention (`not_found`
    // included), so mentions and citations together cover all responding
    // engines.
    let mut engines: BTreeMap<&str, EngineTally> = BTreeMap::new();
    for m in mentions {
        engines.entry(m.engine.as_str()).or_default();
    }

    let mut brand_positions = Vec::new();
    let mut brand_citation_count = 0u32;
    let mut competitors: BTreeMap<Uuid, CompetitorTally> = BTreeMap::new();

    for c in citations {
        let tally = engines.entry(c.engine.as_str()).or_default();
        match c.classification {
            CitationClass::Brand => {
                tally.brand += 1;
                brand_citation_count += 1;
                if let Some(position) = c.position {
                    brand_positions.push(position);
                }
            }
            CitationClass::Competitor { competitor_id } => {
                tally.competitor += 1;
                let entry = competitors
                    .entry(competitor_id)
                    .or_insert_with(|| CompetitorTally {
                        name: String::new(),
                        count: 0,
                        urls: BTreeSet::new(),
                    });
                entry.count += 1;
                entry.urls.insert(c.url.clone());
                if entry.name.is_empty() {
                    if let Some(name) = &c.competitor_name {
                        entry.name.clone_from(name);
                    }
                }
            }
            CitationClass::Other => {}
        }
    }
    brand_positions.sort_unstable();

    let mut competitor_citations: Vec<CompetitorCitationSummary> = competitors
        .into_iter()
        .map(|(competitor_id, tally)| CompetitorCitationSummary {
            competitor_id,
            name: tally.name,
            count: tally.count,
            sample_urls: tally.urls.into_iter().take(MAX_SAMPLE_URLS).collect(),
        })
        .collect();
    competitor_citations.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.competitor_id.cmp(&b.competitor_id))
    });

    let engine_breakdown = engines
        .into_iter()
        .map(|(engine, tally)| EngineBreakdown {
            engine: engine.to_string(),
            has_brand_citation: tally.brand > 0,
            brand_citation_count: tally.brand,
            competitor_citation_count: tally.competitor,
        })
        .collect();

    let negative_contexts: BTreeSet<String> = mentions
        .iter()
        .filter(|m| m.sentiment == Some(Sentiment::Negative) && !m.context.is_empty())
        .map(|m| m.context.clone())
        .collect();

    KeywordAnalysis {
        keyword_id: keyword.keyword_id,
        keyword: keyword.keyword.clone(),
        has_brand_citation: brand_citation_count > 0,
        brand_citation_count,
        brand_positions,
        competitor_citations,
        engine_breakdown,
        dominant_mention_type: dominant_mention_type(mentions),
        dominant_sentiment: dominant_sentiment(mentions),
        negative_contexts: negative_contexts.into_iter().collect(),
    }
}

/// Most frequent mention type; ties go to the stronger signal.
fn dominant_mention_type(mentions: &[&MentionRow]) -> Option<MentionType> {
    const PRECEDENCE: [MentionType; 4] = [
        MentionType::DirectCitation,
        MentionType::BrandName,
        MentionType::IndirectMention,
        MentionType::NotFound,
    ];
    most_frequent(&PRECEDENCE, mentions.iter().map(|m| m.mention_type))
}

/// Most frequent sentiment among scored mentions; ties resolve to neutral,
/// then negative.
fn dominant_sentiment(mentions: &[&MentionRow]) -> Option<Sentiment> {
    const PRECEDENCE: [Sentiment; 3] =
        [Sentiment::Neutral, Sentiment::Negative, Sentiment::Positive];
    most_frequent(&PRECEDENCE, mentions.iter().filter_map(|m| m.sentiment))
}

/// The value in `precedence` seen most often; earlier entries win ties.
fn most_frequent<T: Copy + PartialEq>(
    precedence: &[T],
    values: impl Iterator<Item = T>,
) -> Option<T> {
    let mut counts = vec![0usize; precedence.len()];
    for value in values {
        if let Some(i) = precedence.iter().position(|p| *p == value) {
            counts[i] += 1;
        }
    }
    let mut best: Option<(usize, usize)> = None;
    for (i, &count) in counts.iter().enumerate() {
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| precedence[i])
}
