//! Offline analysis of one saved engine response.

use std::path::Path;

use anyhow::Context;
use citescope_core::{
    AppConfig, CitationClass, ClassifiedCitation, CompetitorDomain, DetectedMention, Sentiment,
};
use citescope_scoring::calculate_share_of_voice;
use serde::{Deserialize, Serialize};

use crate::pipeline::{find_project, load_tuning, offline_ids, process_response, Brand};

/// A saved engine response as written by hand or by an external collector.
#[derive(Debug, Deserialize)]
struct SavedResponse {
    #[serde(default)]
    engine: Option<String>,
    #[serde(default)]
    keyword: Option<String>,
    response_text: String,
    #[serde(default)]
    structured_citations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeOutput<'a> {
    engine: Option<&'a str>,
    keyword: Option<&'a str>,
    brand_share: f64,
    citations: &'a [ClassifiedCitation],
    mentions: &'a [DetectedMention],
}

/// Run extraction, classification and mention detection over a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the project is
/// not in the projects file.
pub(crate) fn run_analyze(
    config: &AppConfig,
    file: &Path,
    project_slug: &str,
    json: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let saved: SavedResponse = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let project = find_project(config, project_slug)?;
    let tuning = load_tuning(config)?;
    let (_, competitors) = offline_ids(&project);

    let processed = process_response(
        &Brand::from_project(&project),
        &competitors,
        &tuning.detector,
        saved.structured_citations,
        &saved.response_text,
    );
    let brand_share = brand_share(&processed.citations, &competitors);

    if json {
        let output = AnalyzeOutput {
            engine: saved.engine.as_deref(),
            keyword: saved.keyword.as_deref(),
            brand_share,
            citations: &processed.citations,
            mentions: &processed.mentions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "analyzed {} for '{}'{}",
        file.display(),
        project.brand_name,
        saved
            .keyword
            .as_deref()
            .map(|k| format!(" (keyword: {k})"))
            .unwrap_or_default()
    );
    println!();

    if processed.citations.is_empty() {
        println!("no citations found");
    } else {
        println!("{:<5}{:<28}{:<22}URL", "POS", "DOMAIN", "CLASS");
        for citation in &processed.citations {
            let position = citation
                .position
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            println!(
                "{:<5}{:<28}{:<22}{}",
                position,
                citation.domain,
                class_label(citation.classification, &competitors),
                citation.url
            );
        }
    }
    println!();

    println!("{:<18}{:<10}{:<11}MATCHED", "MENTION", "CONF", "SENTIMENT");
    for mention in &processed.mentions {
        println!(
            "{:<18}{:<10.2}{:<11}{}",
            mention.mention_type.as_str(),
            mention.confidence,
            mention.sentiment.map_or("-", Sentiment::as_str),
            mention.matched_text
        );
    }
    println!();
    println!("brand share of citations: {brand_share:.1}%");

    Ok(())
}

fn class_label(class: CitationClass, competitors: &[CompetitorDomain]) -> String {
    match class {
        CitationClass::Competitor { competitor_id } => competitors
            .iter()
            .find(|c| c.id == competitor_id)
            .map_or_else(|| "competitor".to_string(), |c| format!("competitor:{}", c.name)),
        other => other.to_string(),
    }
}

/// Brand share among brand and competitor citations of one response.
fn brand_share(citations: &[ClassifiedCitation], competitors: &[CompetitorDomain]) -> f64 {
    let brand = citations
        .iter()
        .filter(|c| c.classification.is_brand())
        .count();
    let per_competitor: Vec<u32> = competitors
        .iter()
        .map(|comp| {
            let count = citations
                .iter()
                .filter(|c| c.classification.competitor_id() == Some(comp.id))
                .count();
            u32::try_from(count).unwrap_or(u32::MAX)
        })
        .collect();
    calculate_share_of_voice(u32::try_from(brand).unwrap_or(u32::MAX), &per_competitor).brand_share
}
