use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Subscription plan of a tracked project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Starter,
    Pro,
    Agency,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Agency => "agency",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Tier::Free),
            "starter" => Some(Tier::Starter),
            "pro" => Some(Tier::Pro),
            "agency" => Some(Tier::Agency),
            _ => None,
        }
    }

    /// Plans that include the AI-powered analyzer.
    #[must_use]
    pub fn allows_ai(self) -> bool {
        matches!(self, Tier::Pro | Tier::Agency)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorConfig {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub brand_name: String,
    pub domain: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub competitors: Vec<CompetitorConfig>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ProjectConfig {
    /// URL-safe slug derived from the project name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectsFile {
    pub projects: Vec<ProjectConfig>,
}

/// Lowercase, ASCII alphanumerics only, words joined by single dashes.
#[must_use]
pub fn slugify(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphanumeric)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Load and validate project definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_projects(path: &Path) -> Result<ProjectsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProjectsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_projects(&content)
}

/// Parse, normalize and validate a projects document.
///
/// Brand and competitor domains are trimmed, lowercased and lose a leading
/// `www.`, matching how citation hosts are normalized.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_projects(content: &str) -> Result<ProjectsFile, ConfigError> {
    let mut projects_file: ProjectsFile =
        serde_yaml::from_str(content).map_err(ConfigError::ProjectsFileParse)?;

    for project in &mut projects_file.projects {
        project.domain = normalize_config_domain(&project.domain);
        for competitor in &mut project.competitors {
            competitor.domain = normalize_config_domain(&competitor.domain);
        }
    }

    validate_projects(&projects_file)?;
    Ok(projects_file)
}

fn normalize_config_domain(raw: &str) -> String {
    let lower = raw.trim().trim_end_matches('.').to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

fn validate_projects(projects_file: &ProjectsFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();

    for project in &projects_file.projects {
        if project.name.trim().is_empty() || project.brand_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "project name and brand_name must be non-empty".to_string(),
            ));
        }
        if project.domain.trim().is_empty() || project.domain.contains('/') {
            return Err(ConfigError::Validation(format!(
                "project '{}' needs a bare domain such as example.com, got '{}'",
                project.name, project.domain
            )));
        }

        let slug = project.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "project name '{}' yields an empty slug",
                project.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate project slug: '{slug}' (from project '{}')",
                project.name
            )));
        }

        let mut seen_domains = HashSet::new();
        for competitor in &project.competitors {
            let domain = competitor.domain.trim().to_lowercase();
            if domain.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "competitor '{}' of project '{}' has no domain",
                    competitor.name, project.name
                )));
            }
            if domain == project.domain.trim().to_lowercase() {
                return Err(ConfigError::Validation(format!(
                    "competitor '{}' shares the brand domain of project '{}'",
                    competitor.name, project.name
                )));
            }
            if !seen_domains.insert(domain) {
                return Err(ConfigError::Validation(format!(
                    "duplicate competitor domain '{}' in project '{}'",
                    competitor.domain, project.name
                )));
            }
        }

        let mut seen_keywords = HashSet::new();
        for keyword in &project.keywords {
            if keyword.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "project '{}' has an empty keyword",
                    project.name
                )));
            }
            if !seen_keywords.insert(keyword.trim().to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate keyword '{keyword}' in project '{}'",
                    project.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<ProjectsFile, ConfigError> {
        parse_projects(yaml)
    }

    const VALID: &str = r"
projects:
  - name: Soldier Data
    brand_name: Soldier Data
    domain: soldierdata.com
    aliases: [SoldierData]
    tier: pro
    competitors:
      - name: Ahrefs
        domain: ahrefs.com
    keywords:
      - best seo tools
      - how to track ai citations
";

    #[test]
    fn parses_valid_file() {
        let file = parse(VALID).unwrap();
        let project = &file.projects[0];
        assert_eq!(project.slug(), "soldier-data");
        assert_eq!(project.tier, Tier::Pro);
        assert!(project.tier.allows_ai());
        assert_eq!(project.competitors[0].domain, "ahrefs.com");
        assert_eq!(project.keywords.len(), 2);
    }

    #[test]
    fn domains_are_normalized_on_load() {
        let yaml = "projects:\n  - name: A\n    brand_name: A\n    domain: ' WWW.SoldierData.com'\n    competitors:\n      - {name: Ahrefs, domain: www.Ahrefs.COM}\n";
        let file = parse(yaml).unwrap();
        assert_eq!(file.projects[0].domain, "soldierdata.com");
        assert_eq!(file.projects[0].competitors[0].domain, "ahrefs.com");
    }

    #[test]
    fn www_variant_of_brand_domain_is_not_a_competitor() {
        let yaml = "projects:\n  - name: A\n    brand_name: A\n    domain: a.com\n    competitors:\n      - {name: B, domain: www.a.com}\n";
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("shares the brand domain"));
    }

    #[test]
    fn tier_defaults_to_free() {
        let file = parse("projects:\n  - name: A\n    brand_name: A\n    domain: a.com\n").unwrap();
        assert_eq!(file.projects[0].tier, Tier::Free);
        assert!(!Tier::Free.allows_ai());
        assert!(!Tier::Starter.allows_ai());
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Uncle Arnie's  SEO_Tools"), "uncle-arnies-seo-tools");
        assert_eq!(slugify("Señorita"), "seorita");
    }

    #[test]
    fn rejects_url_as_domain() {
        let err = parse("projects:\n  - name: A\n    brand_name: A\n    domain: https://a.com/\n")
            .unwrap_err();
        assert!(err.to_string().contains("bare domain"));
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let yaml = "projects:\n  - {name: Soldier Data, brand_name: S, domain: a.com}\n  - {name: soldier-data, brand_name: S, domain: b.com}\n";
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate project slug"));
    }

    #[test]
    fn rejects_competitor_on_brand_domain() {
        let yaml = "projects:\n  - name: A\n    brand_name: A\n    domain: a.com\n    competitors:\n      - {name: Self, domain: A.com}\n";
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("shares the brand domain"));
    }

    #[test]
    fn rejects_duplicate_keywords() {
        let yaml = "projects:\n  - name: A\n    brand_name: A\n    domain: a.com\n    keywords: [SEO tools, seo tools]\n";
        let err = parse(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate keyword"));
    }

    #[test]
    fn tier_round_trips_through_storage_string() {
        for tier in [Tier::Free, Tier::Starter, Tier::Pro, Tier::Agency] {
            assert_eq!(Tier::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(Tier::parse("enterprise"), None);
    }
}
