//! Per-response processing shared by the `analyze` and `simulate` commands.

use citescope_citations::{
    classify_citations, extract_citations, has_brand_citation, ClassificationInput,
    ExtractionInput,
};
use citescope_core::{
    AppConfig, CitationRow, ClassifiedCitation, CompetitorDomain, DetectedMention,
    DetectorConfig, MentionRow, ProjectConfig, ProjectContext, Tuning,
};
use citescope_mentions::{detect_brand_mentions_with, MentionInput};
use uuid::Uuid;

/// The brand a response is analyzed for.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Brand<'a> {
    pub name: &'a str,
    pub domain: &'a str,
    pub aliases: &'a [String],
}

impl<'a> Brand<'a> {
    pub(crate) fn from_project(project: &'a ProjectConfig) -> Self {
        Self {
            name: &project.brand_name,
            domain: &project.domain,
            aliases: &project.aliases,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessedResponse {
    pub citations: Vec<ClassifiedCitation>,
    pub mentions: Vec<DetectedMention>,
}

/// Extract and classify citations, then detect mentions, for one response.
pub(crate) fn process_response(
    brand: &Brand<'_>,
    competitors: &[CompetitorDomain],
    detector: &DetectorConfig,
    structured_citations: Vec<String>,
    response_text: &str,
) -> ProcessedResponse {
    let raw = extract_citations(&ExtractionInput {
        structured_citations,
        raw_response_text: response_text.to_string(),
    });
    let citations = classify_citations(&ClassificationInput {
        citations: &raw,
        project_domain: brand.domain,
        competitors,
    });
    let mentions = detect_brand_mentions_with(
        &MentionInput {
            response_text,
            brand_name: brand.name,
            brand_aliases: brand.aliases,
            project_domain: brand.domain,
            has_citation_match: has_brand_citation(&citations),
        },
        detector,
    );

    ProcessedResponse {
        citations,
        mentions,
    }
}

/// Flatten a processed response into the row shapes the loader consumes.
pub(crate) fn to_rows(
    keyword_id: Uuid,
    engine: &str,
    processed: ProcessedResponse,
    competitors: &[CompetitorDomain],
) -> (Vec<CitationRow>, Vec<MentionRow>) {
    let citations = processed
        .citations
        .into_iter()
        .map(|c| CitationRow {
            keyword_id,
            engine: engine.to_string(),
            url: c.url,
            position: c.position,
            classification: c.classification,
            competitor_name: c.classification.competitor_id().and_then(|id| {
                competitors
                    .iter()
                    .find(|comp| comp.id == id)
                    .map(|comp| comp.name.clone())
            }),
        })
        .collect();
    let mentions = processed
        .mentions
        .into_iter()
        .map(|m| MentionRow {
            keyword_id,
            engine: engine.to_string(),
            mention_type: m.mention_type,
            sentiment: m.sentiment,
            context: m.context,
        })
        .collect();
    (citations, mentions)
}

/// Tuning from `CITESCOPE_TUNING_PATH`, or the compiled-in defaults.
pub(crate) fn load_tuning(config: &AppConfig) -> anyhow::Result<Tuning> {
    match &config.tuning_path {
        Some(path) => Ok(citescope_core::load_tuning(path)?),
        None => Ok(Tuning::default()),
    }
}

/// Look a project up by slug in the projects file.
pub(crate) fn find_project(config: &AppConfig, slug: &str) -> anyhow::Result<ProjectConfig> {
    let file = citescope_core::load_projects(&config.projects_path)?;
    file.projects
        .into_iter()
        .find(|p| p.slug() == slug)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "project '{slug}' not found in {}",
                config.projects_path.display()
            )
        })
}

/// Stable ids for a project that has never been seeded into a database.
pub(crate) fn offline_ids(project: &ProjectConfig) -> (ProjectContext, Vec<CompetitorDomain>) {
    let context = ProjectContext {
        project_id: Uuid::from_u128(1),
        brand_name: project.brand_name.clone(),
        brand_domain: project.domain.clone(),
    };
    let competitors = project
        .competitors
        .iter()
        .zip(100u128..)
        .map(|(c, id)| CompetitorDomain {
            id: Uuid::from_u128(id),
            name: c.name.clone(),
            domain: c.domain.clone(),
            aliases: c.aliases.clone(),
        })
        .collect();
    (context, competitors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citescope_core::{CitationClass, CompetitorConfig, MentionType, Tier};

    fn project() -> ProjectConfig {
        ProjectConfig {
            name: "Soldier Data".to_string(),
            brand_name: "Soldier Data".to_string(),
            domain: "soldierdata.com".to_string(),
            aliases: vec![],
            tier: Tier::Free,
            competitors: vec![CompetitorConfig {
                name: "Ahrefs".to_string(),
                domain: "ahrefs.com".to_string(),
                aliases: vec![],
            }],
            keywords: vec!["best seo tools".to_string()],
        }
    }

    #[test]
    fn processes_brand_and_competitor_citations() {
        let project = project();
        let (_, competitors) = offline_ids(&project);
        let processed = process_response(
            &Brand::from_project(&project),
            &competitors,
            &DetectorConfig::default(),
            vec!["https://ahrefs.com/blog".to_string()],
            "Soldier Data is a trusted choice, see https://soldierdata.com/guide for details.",
        );

        assert_eq!(processed.citations.len(), 2);
        assert_eq!(
            processed.citations[0].classification,
            CitationClass::Competitor {
                competitor_id: competitors[0].id
            }
        );
        assert_eq!(processed.citations[1].classification, CitationClass::Brand);
        assert!(processed
            .mentions
            .iter()
            .any(|m| m.mention_type == MentionType::DirectCitation));
    }

    #[test]
    fn rows_carry_competitor_names() {
        let project = project();
        let (_, competitors) = offline_ids(&project);
        let processed = process_response(
            &Brand::from_project(&project),
            &competitors,
            &DetectorConfig::default(),
            vec!["https://ahrefs.com/blog".to_string()],
            "No brand here.",
        );

        let keyword_id = Uuid::from_u128(10);
        let (citations, mentions) = to_rows(keyword_id, "chatgpt", processed, &competitors);
        assert_eq!(citations[0].competitor_name.as_deref(), Some("Ahrefs"));
        assert_eq!(citations[0].engine, "chatgpt");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].mention_type, MentionType::NotFound);
    }
}
