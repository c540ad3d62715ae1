//! Brand / competitor / third-party classification of extracted citations.

use citescope_core::{CitationClass, ClassifiedCitation, CompetitorDomain, RawCitation};

use crate::domain::{domain_matches, normalize_domain};

#[derive(Debug, Clone)]
pub struct ClassificationInput<'a> {
    pub citations: &'a [RawCitation],
    pub project_domain: &'a str,
    pub competitors: &'a [CompetitorDomain],
}

/// A competitor with its domain and aliases normalized once up front.
struct CompetitorMatcher {
    id: uuid::Uuid,
    domain: String,
    aliases: Vec<String>,
}

impl CompetitorMatcher {
    fn matches(&self, domain: &str) -> bool {
        domain_matches(domain, &self.domain) || self.aliases.iter().any(|a| a == domain)
    }
}

/// Label every citation as brand, competitor, or other.
///
/// Matching is case-insensitive and ignores a leading `www.`. A citation is a
/// brand citation when its domain equals the project domain or is a
/// sub-domain of it; that check runs first, so brand wins any tie. Otherwise
/// the first configured competitor whose domain matches the same way, or
/// whose alias equals the domain exactly, claims it.
#[must_use]
pub fn classify_citations(input: &ClassificationInput<'_>) -> Vec<ClassifiedCitation> {
    let project_domain = normalize_domain(input.project_domain);
    let competitors: Vec<CompetitorMatcher> = input
        .competitors
        .iter()
        .map(|c| CompetitorMatcher {
            id: c.id,
            domain: normalize_domain(&c.domain),
            aliases: c
                .aliases
                .iter()
                .map(|a| normalize_domain(a))
                .filter(|a| !a.is_empty())
                .collect(),
        })
        .collect();

    input
        .citations
        .iter()
        .map(|citation| {
            let domain = normalize_domain(&citation.domain);
            let classification = if domain_matches(&domain, &project_domain) {
                CitationClass::Brand
            } else if let Some(c) = competitors.iter().find(|c| c.matches(&domain)) {
                CitationClass::Competitor { competitor_id: c.id }
            } else {
                CitationClass::Other
            };

            ClassifiedCitation {
                url: citation.url.clone(),
                domain,
                position: citation.position,
                classification,
            }
        })
        .collect()
}

/// `true` if any citation was classified as a brand citation.
///
/// This is the `has_citation_match` input of the mention detector.
#[must_use]
pub fn has_brand_citation(citations: &[ClassifiedCitation]) -> bool {
    citations.iter().any(|c| c.classification.is_brand())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_citations, ExtractionInput};
    use uuid::Uuid;

    fn competitor(id: u128, name: &str, domain: &str, aliases: &[&str]) -> CompetitorDomain {
        CompetitorDomain {
            id: Uuid::from_u128(id),
            name: name.to_string(),
            domain: domain.to_string(),
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }

    fn raw(url: &str, domain: &str, position: u32) -> RawCitation {
        RawCitation {
            url: url.to_string(),
            domain: domain.to_string(),
            position: Some(position),
        }
    }

    #[test]
    fn brand_competitor_other_example() {
        let citations = extract_citations(&ExtractionInput {
            structured_citations: vec![
                "https://www.soldierdata.com/x".to_string(),
                "https://ahrefs.com/y".to_string(),
                "https://techcrunch.com/z".to_string(),
            ],
            raw_response_text: String::new(),
        });
        let ahrefs = competitor(1, "Ahrefs", "ahrefs.com", &[]);
        let competitors = [ahrefs.clone()];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "soldierdata.com",
            competitors: &competitors,
        });

        let classes: Vec<_> = out.iter().map(|c| c.classification).collect();
        assert_eq!(
            classes,
            vec![
                CitationClass::Brand,
                CitationClass::Competitor {
                    competitor_id: ahrefs.id
                },
                CitationClass::Other,
            ]
        );
        let positions: Vec<_> = out.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn subdomain_of_competitor_is_competitor() {
        let citations = [raw("https://blog.ahrefs.com/a", "blog.ahrefs.com", 1)];
        let competitors = [competitor(1, "Ahrefs", "https://www.ahrefs.com", &[])];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "soldierdata.com",
            competitors: &competitors,
        });
        assert_eq!(out[0].classification.competitor_id(), Some(Uuid::from_u128(1)));
    }

    #[test]
    fn alias_requires_exact_match() {
        let citations = [
            raw("https://ahrefs.io/a", "ahrefs.io", 1),
            raw("https://docs.ahrefs.io/a", "docs.ahrefs.io", 2),
        ];
        let competitors = [competitor(1, "Ahrefs", "ahrefs.com", &["AHREFS.io"])];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "soldierdata.com",
            competitors: &competitors,
        });
        assert!(matches!(out[0].classification, CitationClass::Competitor { .. }));
        assert_eq!(out[1].classification, CitationClass::Other);
    }

    #[test]
    fn brand_wins_when_domain_satisfies_both() {
        let citations = [raw("https://shared.example.com/a", "shared.example.com", 1)];
        let competitors = [competitor(1, "Rival", "shared.example.com", &[])];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "example.com",
            competitors: &competitors,
        });
        assert_eq!(out[0].classification, CitationClass::Brand);
    }

    #[test]
    fn first_matching_competitor_claims_citation() {
        let citations = [raw("https://moz.com/a", "moz.com", 1)];
        let competitors = [
            competitor(1, "Moz", "moz.com", &[]),
            competitor(2, "Moz Again", "moz.com", &[]),
        ];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "soldierdata.com",
            competitors: &competitors,
        });
        assert_eq!(out[0].classification.competitor_id(), Some(Uuid::from_u128(1)));
    }

    #[test]
    fn has_brand_citation_detects_brand() {
        let citations = [raw("https://soldierdata.com/", "soldierdata.com", 1)];
        let out = classify_citations(&ClassificationInput {
            citations: &citations,
            project_domain: "SoldierData.com",
            competitors: &[],
        });
        assert!(has_brand_citation(&out));
        assert!(!has_brand_citation(&[]));
    }
}
