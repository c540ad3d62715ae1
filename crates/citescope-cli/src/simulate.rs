//! Mock-engine runs: feed deterministic simulated answers through the full
//! extraction and detection pipeline, either into a persisted run or straight
//! into the rule engine for an offline preview.

use citescope_citations::has_brand_citation;
use citescope_core::mock_engine::{MockCompetitor, MockEngine, MockScenario};
use citescope_core::{AnalysisData, AnalysisResult, AppConfig, CompetitorDomain, KeywordRow};
use citescope_optimizer::{analyze_with_rules_with, build_analysis_data};
use uuid::Uuid;

use crate::fail_run_best_effort;
use crate::pipeline::{find_project, load_tuning, offline_ids, process_response, to_rows, Brand};

pub(crate) const DEFAULT_ENGINES: [&str; 3] = ["chatgpt", "perplexity", "gemini"];

fn validate_inputs(cite_probability: f64, engines: &[String]) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&cite_probability) {
        anyhow::bail!("--cite-probability must be between 0 and 1, got {cite_probability}");
    }
    if engines.iter().all(|e| e.trim().is_empty()) {
        anyhow::bail!("at least one engine is required");
    }
    Ok(())
}

fn mock_engine(
    brand_name: &str,
    brand_domain: &str,
    competitors: &[CompetitorDomain],
    cite_probability: f64,
) -> MockEngine {
    MockEngine::new(MockScenario {
        brand_name: brand_name.to_string(),
        brand_domain: brand_domain.to_string(),
        competitors: competitors
            .iter()
            .map(|c| MockCompetitor {
                name: c.name.clone(),
                domain: c.domain.clone(),
            })
            .collect(),
        brand_cite_probability: cite_probability,
    })
}

fn normalized_engines(engines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = engines
        .iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Simulate a run for a seeded project and persist it as a completed run.
///
/// # Errors
///
/// Returns an error if the project is unknown, inputs are out of range, or a
/// response cannot be stored (the run is then marked failed).
pub(crate) async fn run_simulate(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    project_slug: &str,
    cite_probability: f64,
    engines: &[String],
) -> anyhow::Result<()> {
    validate_inputs(cite_probability, engines)?;
    let engines = normalized_engines(engines);
    let tuning = load_tuning(config)?;

    let project = citescope_db::get_project_by_slug(pool, project_slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project '{project_slug}' not found; run `db seed` first"))?;
    let competitors: Vec<CompetitorDomain> = citescope_db::list_competitors(pool, project.id)
        .await?
        .iter()
        .map(citescope_db::CompetitorRow::to_domain)
        .collect();
    let keywords = citescope_db::list_active_keywords(pool, project.id).await?;

    if keywords.is_empty() {
        println!("project '{project_slug}' has no active keywords; skipping run creation");
        return Ok(());
    }

    let engine = mock_engine(
        &project.brand_name,
        &project.brand_domain,
        &competitors,
        cite_probability,
    );
    let brand = Brand {
        name: &project.brand_name,
        domain: &project.brand_domain,
        aliases: &project.brand_aliases,
    };

    let run = citescope_db::create_run(pool, project.id).await?;
    tracing::info!(run_id = %run.id, project = %project.slug, "simulation run started");

    let mut responses = 0usize;
    let mut cited_responses = 0usize;
    for keyword in &keywords {
        for engine_name in &engines {
            let response = engine.respond(&keyword.keyword, engine_name);
            let processed = process_response(
                &brand,
                &competitors,
                &tuning.detector,
                response.structured_citations,
                &response.text,
            );
            if has_brand_citation(&processed.citations) {
                cited_responses += 1;
            }

            if let Err(e) = citescope_db::persist_response(
                pool,
                run.id,
                keyword.keyword_id,
                engine_name,
                &response.text,
                &processed.citations,
                &processed.mentions,
            )
            .await
            {
                fail_run_best_effort(pool, run.id, "simulate").await;
                return Err(e.into());
            }
            responses += 1;
        }
    }

    citescope_db::complete_run(pool, run.id).await?;
    tracing::info!(
        run_id = %run.id,
        responses,
        cited_responses,
        "simulation run completed"
    );
    println!(
        "run {} completed: {responses} responses over {} keywords x {} engines, brand cited in {cited_responses}",
        run.id,
        keywords.len(),
        engines.len()
    );
    println!("next: `citescope optimize --project {project_slug}`");

    Ok(())
}

/// Simulate a project from the projects file and print the rule-engine
/// result without touching a database.
///
/// # Errors
///
/// Returns an error if the projects or tuning file cannot be loaded, the
/// project is unknown, or inputs are out of range.
pub(crate) fn run_simulate_offline(
    config: &AppConfig,
    project_slug: &str,
    cite_probability: f64,
    engines: &[String],
) -> anyhow::Result<()> {
    validate_inputs(cite_probability, engines)?;
    let engines = normalized_engines(engines);
    let tuning = load_tuning(config)?;
    let project = find_project(config, project_slug)?;
    let (context, competitors) = offline_ids(&project);

    let keywords: Vec<KeywordRow> = project
        .keywords
        .iter()
        .zip(1000u128..)
        .map(|(keyword, id)| KeywordRow {
            keyword_id: Uuid::from_u128(id),
            keyword: keyword.trim().to_string(),
        })
        .collect();

    let engine = mock_engine(
        &project.brand_name,
        &project.domain,
        &competitors,
        cite_probability,
    );
    let brand = Brand::from_project(&project);

    let mut citation_rows = Vec::new();
    let mut mention_rows = Vec::new();
    for keyword in &keywords {
        for engine_name in &engines {
            let response = engine.respond(&keyword.keyword, engine_name);
            let processed = process_response(
                &brand,
                &competitors,
                &tuning.detector,
                response.structured_citations,
                &response.text,
            );
            let (citations, mentions) =
                to_rows(keyword.keyword_id, engine_name, processed, &competitors);
            citation_rows.extend(citations);
            mention_rows.extend(mentions);
        }
    }

    let data = build_analysis_data(context, &keywords, &citation_rows, &mention_rows, None);
    let result = analyze_with_rules_with(&data, &tuning.engine_weights);
    print_offline_summary(&data, &result);

    Ok(())
}

fn print_offline_summary(data: &AnalysisData, result: &AnalysisResult) {
    println!("{:<45}{:<8}{:<8}COMPETITOR CITES", "KEYWORD", "CITED", "ENGINES");
    for k in &data.keyword_analyses {
        let engines = format!("{}/{}", k.engines_citing_brand(), k.engine_breakdown.len());
        println!(
            "{:<45}{:<8}{:<8}{}",
            k.keyword,
            if k.has_brand_citation { "yes" } else { "no" },
            engines,
            k.competitor_citation_count()
        );
    }
    println!();

    let score = &result.score;
    println!(
        "optimization score {:.1} (coverage {:.1}, competitive {:.1}, consistency {:.1}, freshness {:.1})",
        score.overall_score,
        score.content_coverage,
        score.competitive_gap,
        score.citation_consistency,
        score.freshness
    );
    println!(
        "{} recommendations, {} content gaps",
        result.recommendations.len(),
        result.content_gaps.len()
    );
    println!();

    println!("{:<10}{:<20}TITLE", "PRIORITY", "TYPE");
    for rec in &result.recommendations {
        println!(
            "{:<10}{:<20}{}",
            rec.priority.as_str(),
            rec.recommendation_type.as_str(),
            rec.title
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_probability() {
        let engines = vec!["chatgpt".to_string()];
        assert!(validate_inputs(1.5, &engines).is_err());
        assert!(validate_inputs(-0.1, &engines).is_err());
        assert!(validate_inputs(0.0, &engines).is_ok());
        assert!(validate_inputs(1.0, &engines).is_ok());
    }

    #[test]
    fn rejects_empty_engine_list() {
        assert!(validate_inputs(0.5, &[]).is_err());
        assert!(validate_inputs(0.5, &[" ".to_string()]).is_err());
    }

    #[test]
    fn engines_are_normalized_and_deduplicated() {
        let engines = vec![
            "Perplexity".to_string(),
            "chatgpt ".to_string(),
            "perplexity".to_string(),
            String::new(),
        ];
        assert_eq!(normalized_engines(&engines), vec!["chatgpt", "perplexity"]);
    }
}
