use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Citations
// ---------------------------------------------------------------------------

/// A URL recovered from one engine response, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCitation {
    /// Canonical URL (fragment stripped, host lowercased, no trailing slash).
    pub url: String,
    /// Lowercase host with any leading `www.` removed.
    pub domain: String,
    /// 1-based rank of first occurrence in the de-duplicated list.
    /// `None` for citations loaded from storage without a rank.
    pub position: Option<u32>,
}

/// Who a cited URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CitationClass {
    Brand,
    Competitor { competitor_id: Uuid },
    Other,
}

impl CitationClass {
    #[must_use]
    pub fn is_brand(&self) -> bool {
        matches!(self, CitationClass::Brand)
    }

    #[must_use]
    pub fn competitor_id(&self) -> Option<Uuid> {
        match self {
            CitationClass::Competitor { competitor_id } => Some(*competitor_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for CitationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitationClass::Brand => write!(f, "brand"),
            CitationClass::Competitor { competitor_id } => write!(f, "competitor:{competitor_id}"),
            CitationClass::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedCitation {
    pub url: String,
    pub domain: String,
    pub position: Option<u32>,
    pub classification: CitationClass,
}

/// A tracked competitor as the classifier sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorDomain {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    /// Extra domain strings that count as this competitor on exact match only.
    #[serde(default)]
    pub aliases: Vec<String>,
}

// ---------------------------------------------------------------------------
// Mentions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionType {
    DirectCitation,
    BrandName,
    IndirectMention,
    NotFound,
}

impl MentionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MentionType::DirectCitation => "direct_citation",
            MentionType::BrandName => "brand_name",
            MentionType::IndirectMention => "indirect_mention",
            MentionType::NotFound => "not_found",
        }
    }

    /// Parse the storage representation. Unknown values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "direct_citation" => Some(MentionType::DirectCitation),
            "brand_name" => Some(MentionType::BrandName),
            "indirect_mention" => Some(MentionType::IndirectMention),
            "not_found" => Some(MentionType::NotFound),
            _ => None,
        }
    }
}

impl std::fmt::Display for MentionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection of brand presence in a response's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedMention {
    pub mention_type: MentionType,
    /// Exact substring of the response that matched (empty for `not_found`).
    pub matched_text: String,
    /// Text surrounding the match, clipped to the response bounds.
    pub context: String,
    /// Detection confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// `None` only for `not_found`.
    pub sentiment: Option<Sentiment>,
}

// ---------------------------------------------------------------------------
// Analysis read model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorCitationSummary {
    pub competitor_id: Uuid,
    pub name: String,
    pub count: u32,
    /// Up to three distinct cited URLs, in URL order.
    pub sample_urls: Vec<String>,
}

/// Per-engine slice of one keyword's run. An entry exists only for engines
/// that returned a response for the keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineBreakdown {
    pub engine: String,
    pub has_brand_citation: bool,
    pub brand_citation_count: u32,
    pub competitor_citation_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    pub keyword_id: Uuid,
    pub keyword: String,
    pub has_brand_citation: bool,
    pub brand_citation_count: u32,
    /// Ranks of every brand citation across engines, ascending.
    pub brand_positions: Vec<u32>,
    pub competitor_citations: Vec<CompetitorCitationSummary>,
    pub engine_breakdown: Vec<EngineBreakdown>,
    pub dominant_mention_type: Option<MentionType>,
    pub dominant_sentiment: Option<Sentiment>,
    /// Distinct contexts of mentions scored `negative`, sorted.
    #[serde(default)]
    pub negative_contexts: Vec<String>,
}

impl KeywordAnalysis {
    /// Best (lowest) brand rank for this keyword, if any brand citation is ranked.
    #[must_use]
    pub fn best_brand_position(&self) -> Option<u32> {
        self.brand_positions.iter().copied().min()
    }

    #[must_use]
    pub fn competitor_citation_count(&self) -> u32 {
        self.competitor_citations.iter().map(|c| c.count).sum()
    }

    #[must_use]
    pub fn engines_citing_brand(&self) -> usize {
        self.engine_breakdown
            .iter()
            .filter(|e| e.has_brand_citation)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_id: Uuid,
    pub brand_name: String,
    pub brand_domain: String,
}

/// What the immediately preceding completed run looked like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousRunSnapshot {
    pub cited_keyword_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTotals {
    pub total_keywords: u32,
    pub total_brand_citations: u32,
    pub total_competitor_citations: u32,
}

/// Everything the rule engine and AI analyzer need for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisData {
    pub project: ProjectContext,
    pub keyword_analyses: Vec<KeywordAnalysis>,
    /// `None` when there is no earlier completed run to compare against.
    pub previous_run: Option<PreviousRunSnapshot>,
    pub totals: AnalysisTotals,
}

// ---------------------------------------------------------------------------
// Persisted run rows
// ---------------------------------------------------------------------------

/// A tracked keyword of the project being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub keyword_id: Uuid,
    pub keyword: String,
}

/// One stored citation of a completed run, joined with its response's engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRow {
    pub keyword_id: Uuid,
    pub engine: String,
    pub url: String,
    pub position: Option<u32>,
    pub classification: CitationClass,
    /// Display name for competitor citations.
    pub competitor_name: Option<String>,
}

/// One stored brand mention of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionRow {
    pub keyword_id: Uuid,
    pub engine: String,
    pub mention_type: MentionType,
    pub sentiment: Option<Sentiment>,
    pub context: String,
}

/// A recommendation already stored for the project, as needed for expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingRecommendation {
    pub id: Uuid,
    pub keyword_id: Option<Uuid>,
    pub recommendation_type: RecommendationType,
    pub status: RecommendationStatus,
}

// ---------------------------------------------------------------------------
// Optimizer output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    CreateContent,
    UpdateContent,
    AddSchema,
    ImproveStructure,
    AddComparison,
    ImproveAuthority,
    OptimizeCitations,
}

impl RecommendationType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationType::CreateContent => "create_content",
            RecommendationType::UpdateContent => "update_content",
            RecommendationType::AddSchema => "add_schema",
            RecommendationType::ImproveStructure => "improve_structure",
            RecommendationType::AddComparison => "add_comparison",
            RecommendationType::ImproveAuthority => "improve_authority",
            RecommendationType::OptimizeCitations => "optimize_citations",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create_content" => Some(RecommendationType::CreateContent),
            "update_content" => Some(RecommendationType::UpdateContent),
            "add_schema" => Some(RecommendationType::AddSchema),
            "improve_structure" => Some(RecommendationType::ImproveStructure),
            "add_comparison" => Some(RecommendationType::AddComparison),
            "improve_authority" => Some(RecommendationType::ImproveAuthority),
            "optimize_citations" => Some(RecommendationType::OptimizeCitations),
            _ => None,
        }
    }

    /// Types that become pointless once the keyword is cited again.
    #[must_use]
    pub fn expires_on_citation(self) -> bool {
        matches!(
            self,
            RecommendationType::CreateContent | RecommendationType::AddSchema
        )
    }
}

impl std::fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Larger is more urgent.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    RuleBased,
    AiPowered,
}

impl RecommendationSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationSource::RuleBased => "rule_based",
            RecommendationSource::AiPowered => "ai_powered",
        }
    }
}

/// Persisted lifecycle of a recommendation. New recommendations start `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Active,
    Dismissed,
    Completed,
    Expired,
}

impl RecommendationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationStatus::Active => "active",
            RecommendationStatus::Dismissed => "dismissed",
            RecommendationStatus::Completed => "completed",
            RecommendationStatus::Expired => "expired",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(RecommendationStatus::Active),
            "dismissed" => Some(RecommendationStatus::Dismissed),
            "completed" => Some(RecommendationStatus::Completed),
            "expired" => Some(RecommendationStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecommendation {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub priority: Priority,
    pub source: RecommendationSource,
    pub title: String,
    pub description: String,
    pub actionable_steps: Vec<String>,
    /// Heuristic uplift in percentage points.
    pub estimated_impact: f64,
    pub keyword_id: Option<Uuid>,
    pub competitor_id: Option<Uuid>,
    pub target_url: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl GeneratedRecommendation {
    /// Identity used to collapse duplicates within one run.
    #[must_use]
    pub fn dedup_key(&self) -> (Option<Uuid>, RecommendationType, Option<Uuid>) {
        (self.keyword_id, self.recommendation_type, self.competitor_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    NoBrandCitation,
    CompetitorOnly,
    StaleContent,
    LowProminence,
}

impl GapType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GapType::NoBrandCitation => "no_brand_citation",
            GapType::CompetitorOnly => "competitor_only",
            GapType::StaleContent => "stale_content",
            GapType::LowProminence => "low_prominence",
        }
    }
}

impl std::fmt::Display for GapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContentGap {
    pub keyword_id: Uuid,
    pub gap_type: GapType,
    /// `[0.0, 1.0]`.
    pub severity: f64,
    pub competitor_id: Option<Uuid>,
    pub competitor_url: Option<String>,
    /// Engines on which the gap was observed, sorted.
    pub engine_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizationScoreData {
    pub overall_score: f64,
    pub content_coverage: f64,
    pub competitive_gap: f64,
    pub citation_consistency: f64,
    pub freshness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub recommendations: Vec<GeneratedRecommendation>,
    pub content_gaps: Vec<GeneratedContentGap>,
    pub score: OptimizationScoreData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_class_display() {
        let id = Uuid::from_u128(7);
        assert_eq!(CitationClass::Brand.to_string(), "brand");
        assert_eq!(CitationClass::Other.to_string(), "other");
        assert_eq!(
            CitationClass::Competitor { competitor_id: id }.to_string(),
            format!("competitor:{id}")
        );
    }

    #[test]
    fn mention_type_round_trips_through_storage_string() {
        for t in [
            MentionType::DirectCitation,
            MentionType::BrandName,
            MentionType::IndirectMention,
            MentionType::NotFound,
        ] {
            assert_eq!(MentionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(MentionType::parse("bogus"), None);
    }

    #[test]
    fn recommendation_serializes_type_field() {
        let rec = GeneratedRecommendation {
            recommendation_type: RecommendationType::AddSchema,
            priority: Priority::Low,
            source: RecommendationSource::RuleBased,
            title: "t".to_string(),
            description: "d".to_string(),
            actionable_steps: vec![],
            estimated_impact: 8.0,
            keyword_id: None,
            competitor_id: None,
            target_url: None,
            metadata: Map::new(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "add_schema");
        assert_eq!(json["priority"], "low");
        assert_eq!(json["source"], "rule_based");
    }

    #[test]
    fn priority_rank_orders_critical_first() {
        assert!(Priority::Critical.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn only_content_and_schema_expire_on_citation() {
        assert!(RecommendationType::CreateContent.expires_on_citation());
        assert!(RecommendationType::AddSchema.expires_on_citation());
        assert!(!RecommendationType::UpdateContent.expires_on_citation());
        assert!(!RecommendationType::AddComparison.expires_on_citation());
    }
}
