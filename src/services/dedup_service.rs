use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::dto::job_dto::RawPosting;
use crate::models::job::KnownJobRow;
use crate::services::classifier::{normalize_text, ClassificationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DedupDecision {
    Insert,
    Update,
    Skip,
}

impl DedupDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupDecision::Insert => "insert",
            DedupDecision::Update => "update",
            DedupDecision::Skip => "skip",
        }
    }
}

/// Snapshot of the tracked fields of an already stored posting.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownPosting {
    pub description: String,
    pub location: String,
    pub employment_type: Option<String>,
    pub requires_english: bool,
    pub language_signals: Vec<String>,
}

pub type KnownPostings = HashMap<String, KnownPosting>;

impl From<KnownJobRow> for KnownPosting {
    fn from(row: KnownJobRow) -> Self {
        Self {
            description: row.description,
            location: row.location,
            employment_type: row.employment_type,
            requires_english: row.requires_english,
            language_signals: row.language_signals,
        }
    }
}

/// A scraped posting together with its fresh classification.
#[derive(Debug, Clone)]
pub struct ClassifiedPosting {
    pub source_key: String,
    pub posting: RawPosting,
    pub classification: ClassificationResult,
}

impl ClassifiedPosting {
    pub fn snapshot(&self) -> KnownPosting {
        KnownPosting {
            description: self.posting.description.clone(),
            location: self.posting.location.clone(),
            employment_type: self.posting.employment_type.clone(),
            requires_english: self.classification.requires_english,
            language_signals: self.classification.language_signals.clone(),
        }
    }
}

/// Canonical dedup key for a source URL.
///
/// Query string, fragment and trailing slashes are dropped so tracking
/// parameters do not split one posting into many. Returns `None` for blank input.
pub fn canonical_source_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let key = match Url::parse(trimmed) {
        Ok(mut url) if url.has_host() => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        _ => trimmed.trim_end_matches('/').to_lowercase(),
    };

    (!key.is_empty()).then_some(key)
}

/// Decides how a freshly scraped posting relates to what is already stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Insert for an unknown key, Update when a tracked field changed, Skip otherwise.
    pub fn decide(&self, candidate: &ClassifiedPosting, known: &KnownPostings) -> DedupDecision {
        match known.get(&candidate.source_key) {
            None => DedupDecision::Insert,
            Some(existing) if self.changed_fields(candidate, existing).is_empty() => {
                DedupDecision::Skip
            }
            Some(_) => DedupDecision::Update,
        }
    }

    /// Names of the tracked fields that differ from the stored snapshot.
    pub fn changed_fields(
        &self,
        candidate: &ClassifiedPosting,
        existing: &KnownPosting,
    ) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if normalize_text(&candidate.posting.description) != normalize_text(&existing.description)
        {
            changed.push("description");
        }
        if normalize_text(&candidate.posting.location) != normalize_text(&existing.location) {
            changed.push("location");
        }
        if normalize_optional(candidate.posting.employment_type.as_deref())
            != normalize_optional(existing.employment_type.as_deref())
        {
            changed.push("employment_type");
        }
        if candidate.classification.requires_english != existing.requires_english
            || sorted(&candidate.classification.language_signals)
                != sorted(&existing.language_signals)
        {
            changed.push("classification");
        }

        changed
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.map(normalize_text).filter(|v| !v.is_empty())
}

fn sorted(values: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = values.iter().map(String::as_str).collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::{Classifier, SearchIntent};

    fn classified(url: &str, description: &str) -> ClassifiedPosting {
        let posting = RawPosting {
            title: "DevOps Engineer".into(),
            company: "TechCorp Chile".into(),
            location: "Santiago, Chile".into(),
            description: description.into(),
            employment_type: Some("Full-time".into()),
            source_url: url.into(),
            ..Default::default()
        };
        let classification = Classifier::default().classify(
            &posting.title,
            &posting.description,
            &SearchIntent::new("DevOps"),
        );
        ClassifiedPosting {
            source_key: canonical_source_key(url).unwrap(),
            posting,
            classification,
        }
    }

    #[test]
    fn unknown_url_is_insert() {
        let candidate = classified("https://linkedin.com/jobs/view/1", "AWS y Docker");
        assert_eq!(
            Deduplicator::new().decide(&candidate, &KnownPostings::new()),
            DedupDecision::Insert
        );
    }

    #[test]
    fn known_unchanged_is_skip() {
        let candidate = classified("https://linkedin.com/jobs/view/1", "AWS y Docker");
        let mut known = KnownPostings::new();
        known.insert(candidate.source_key.clone(), candidate.snapshot());

        assert_eq!(
            Deduplicator::new().decide(&candidate, &known),
            DedupDecision::Skip
        );
    }

    #[test]
    fn known_with_changed_description_is_update() {
        let stored = classified("https://linkedin.com/jobs/view/1", "AWS y Docker");
        let mut known = KnownPostings::new();
        known.insert(stored.source_key.clone(), stored.snapshot());

        let candidate = classified("https://linkedin.com/jobs/view/1", "AWS, Docker y Kubernetes");
        let dedup = Deduplicator::new();
        assert_eq!(dedup.decide(&candidate, &known), DedupDecision::Update);
        assert_eq!(
            dedup.changed_fields(&candidate, &known[&candidate.source_key]),
            vec!["description"]
        );
    }

    #[test]
    fn stale_classification_is_update() {
        let candidate = classified("https://linkedin.com/jobs/view/1", "Fluent English required");
        let mut snapshot = candidate.snapshot();
        snapshot.requires_english = false;
        snapshot.language_signals.clear();
        let mut known = KnownPostings::new();
        known.insert(candidate.source_key.clone(), snapshot);

        let dedup = Deduplicator::new();
        assert_eq!(dedup.decide(&candidate, &known), DedupDecision::Update);
        assert_eq!(
            dedup.changed_fields(&candidate, &known[&candidate.source_key]),
            vec!["classification"]
        );
    }

    #[test]
    fn whitespace_and_case_churn_is_not_a_change() {
        let stored = classified("https://linkedin.com/jobs/view/1", "AWS y Docker");
        let mut known = KnownPostings::new();
        known.insert(stored.source_key.clone(), stored.snapshot());

        let mut candidate = classified("https://linkedin.com/jobs/view/1", "  aws   Y docker ");
        candidate.posting.employment_type = Some("FULL-TIME".into());
        assert_eq!(
            Deduplicator::new().decide(&candidate, &known),
            DedupDecision::Skip
        );
    }

    #[test]
    fn tracking_parameters_share_one_key() {
        let a = canonical_source_key("https://www.LinkedIn.com/jobs/view/3712/?trk=public_jobs");
        let b = canonical_source_key("https://www.linkedin.com/jobs/view/3712#details");
        assert_eq!(a, b);
        assert_eq!(a.as_deref(), Some("https://www.linkedin.com/jobs/view/3712"));
    }

    #[test]
    fn blank_urls_have_no_key() {
        assert_eq!(canonical_source_key("   "), None);
        assert_eq!(canonical_source_key("/"), None);
        assert_eq!(
            canonical_source_key("Sample_3/"),
            Some("sample_3".to_string())
        );
    }
}
