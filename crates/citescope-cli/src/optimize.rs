//! The `optimize` command: analyze the latest completed run and persist
//! recommendations, content gaps and the optimization score.

use citescope_core::{AnalysisData, AnalysisResult, AppConfig};
use citescope_optimizer::{
    analyze_with_ai, analyze_with_rules_with, build_analysis_data, merge_results,
    recommendations_to_expire, AiContext, HttpReasoningClient,
};

use crate::pipeline::load_tuning;

/// Load the latest completed run of a project as an analysis snapshot.
///
/// The run before it, if any, supplies the previously cited keywords.
pub(crate) async fn load_latest_analysis(
    pool: &sqlx::PgPool,
    project: &citescope_db::ProjectRow,
) -> anyhow::Result<Option<(uuid::Uuid, AnalysisData)>> {
    let runs = citescope_db::latest_completed_runs(pool, project.id, 2).await?;
    let Some(latest) = runs.first() else {
        return Ok(None);
    };

    let rows = citescope_db::load_run_rows(pool, project.id, latest.id).await?;
    let previous_cited = match runs.get(1) {
        Some(previous) => Some(citescope_db::load_cited_keyword_ids(pool, previous.id).await?),
        None => None,
    };

    let data = build_analysis_data(
        project.context(),
        &rows.keywords,
        &rows.citations,
        &rows.mentions,
        previous_cited,
    );
    Ok(Some((latest.id, data)))
}

/// Run the rule engine (and optionally the AI analyzer) over the latest run.
///
/// Re-running on the same run replaces its recommendations and score rather
/// than adding to them.
///
/// # Errors
///
/// Returns an error if the project is unknown, it has no completed run, or a
/// database write fails. AI failures are logged and never fatal.
pub(crate) async fn run_optimize(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    project_slug: &str,
    with_ai: bool,
) -> anyhow::Result<()> {
    let project = citescope_db::get_project_by_slug(pool, project_slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project '{project_slug}' not found"))?;
    let tuning = load_tuning(config)?;

    let Some((run_id, data)) = load_latest_analysis(pool, &project).await? else {
        println!("no completed runs for '{project_slug}'; run `simulate` first");
        return Ok(());
    };

    let mut result = analyze_with_rules_with(&data, &tuning.engine_weights);
    if with_ai {
        let ai = run_ai(config, &project, &data).await;
        result = merge_results(&data, result, ai);
    }

    let existing = citescope_db::list_expirable_recommendations(pool, project.id).await?;
    let expire_ids = recommendations_to_expire(&existing, &data);
    let expired = citescope_db::expire_recommendations(pool, &expire_ids).await?;

    let stored =
        citescope_db::replace_run_recommendations(pool, project.id, run_id, &result.recommendations)
            .await?;
    let gaps = citescope_db::sync_content_gaps(pool, project.id, &result.content_gaps).await?;
    citescope_db::replace_run_score(pool, project.id, run_id, &result.score).await?;

    tracing::info!(
        project = %project.slug,
        %run_id,
        recommendations = stored,
        gaps = gaps.upserted,
        resolved_gaps = gaps.resolved,
        expired,
        "optimization stored"
    );

    print_result(&result, expired, gaps.resolved);
    Ok(())
}

/// AI recommendations, or an empty result when the analyzer cannot run.
async fn run_ai(
    config: &AppConfig,
    project: &citescope_db::ProjectRow,
    data: &AnalysisData,
) -> AnalysisResult {
    let ctx = AiContext::from_app_config(config, project.tier().allows_ai());
    match HttpReasoningClient::from_app_config(config) {
        Ok(client) => analyze_with_ai(data, &ctx, &client).await,
        Err(e) => {
            tracing::warn!(error = %e, "reasoning client unavailable, skipping AI analysis");
            AnalysisResult {
                recommendations: Vec::new(),
                content_gaps: Vec::new(),
                score: citescope_scoring::calculate_optimization_score(data),
            }
        }
    }
}

fn print_result(result: &AnalysisResult, expired: u64, resolved_gaps: u64) {
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
        "stored {} recommendations and {} content gaps; expired {expired} resolved recommendation(s)",
        result.recommendations.len(),
        result.content_gaps.len()
    );
    println!("closed {resolved_gaps} content gap(s) that no longer apply");
    println!();

    println!("{:<10}{:<20}{:<8}{:<12}TITLE", "PRIORITY", "TYPE", "IMPACT", "SOURCE");
    for rec in &result.recommendations {
        println!(
            "{:<10}{:<20}{:<8.1}{:<12}{}",
            rec.priority.as_str(),
            rec.recommendation_type.as_str(),
            rec.estimated_impact,
            rec.source.as_str(),
            rec.title
        );
    }
}
