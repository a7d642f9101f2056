use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::job::Job;
use crate::models::scrape_log::ScrapeLog;
use crate::services::dedup_service::DedupDecision;
use crate::services::job_service::JobList;

/// One posting as handed over by the scraper.
///
/// Deserialization never fails on a single field: missing or `null` text is
/// empty, unreadable optional fields and dates are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RawPosting {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub requirements: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub salary_range: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub employment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub seniority_level: Option<String>,
    #[serde(
        default,
        alias = "linkedin_url",
        alias = "url",
        deserialize_with = "lenient_text"
    )]
    pub source_url: String,
    #[serde(
        default,
        alias = "linkedin_job_id",
        deserialize_with = "lenient_opt_text"
    )]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_datetime")]
    pub posted_date: Option<DateTime<Utc>>,
    /// Region the posting was found in during a multi-region scrape.
    #[serde(default, deserialize_with = "lenient_opt_text")]
    pub search_region: Option<String>,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn lenient_opt_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(value).filter(|s| !s.trim().is_empty()))
}

fn lenient_datetime<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(raw) => parse_posted_date(&raw),
        _ => None,
    })
}

/// RFC 3339, or a naive timestamp / date read as UTC. Anything else is `None`.
pub fn parse_posted_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct IngestPayload {
    #[validate(length(min = 1, max = 200))]
    pub search_term: String,
    pub location: Option<String>,
    #[validate(length(max = 1000))]
    pub postings: Vec<RawPosting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct ScrapeRequest {
    #[validate(length(min = 1, max = 200))]
    pub search_term: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 1, max = 200))]
    pub max_jobs: Option<usize>,
}

/// Sweep over several regions in one run. Unset fields use the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegionScrapeRequest {
    #[validate(length(min = 1, max = 200))]
    pub search_term: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub regions: Option<Vec<String>>,
    #[validate(range(min = 1, max = 200))]
    pub max_jobs_per_region: Option<usize>,
}

/// Per-posting outcome of an ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestDecision {
    Insert,
    Update,
    Skip,
    Rejected,
}

impl From<DedupDecision> for IngestDecision {
    fn from(value: DedupDecision) -> Self {
        match value {
            DedupDecision::Insert => IngestDecision::Insert,
            DedupDecision::Update => IngestDecision::Update,
            DedupDecision::Skip => IngestDecision::Skip,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestSummary {
    pub jobs_found: usize,
    pub jobs_inserted: usize,
    pub jobs_updated: usize,
    pub jobs_skipped: usize,
    pub jobs_rejected: usize,
    pub jobs_without_english: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestOutcome {
    pub source_url: String,
    pub title: String,
    pub decision: IngestDecision,
    pub requires_english: bool,
    pub match_score: f64,
    pub language_signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub summary: IngestSummary,
    pub outcomes: Vec<IngestOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: uuid::Uuid,
    pub source_url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub employment_type: Option<String>,
    pub seniority_level: Option<String>,
    pub external_id: Option<String>,
    pub requires_english: bool,
    pub match_score: f64,
    pub language_signals: Vec<String>,
    pub search_region: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub seniority_level: Option<String>,
    pub no_english: Option<bool>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobStatsResponse {
    pub total_jobs: i64,
    pub jobs_without_english: i64,
    pub english_percentage: f64,
    pub top_companies: Vec<NamedCount>,
    pub top_locations: Vec<NamedCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScrapeLogQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScrapeLogResponse {
    pub id: uuid::Uuid,
    pub search_term: String,
    pub location: Option<String>,
    pub regions: Vec<String>,
    pub source: String,
    pub jobs_found: i32,
    pub jobs_inserted: i32,
    pub jobs_updated: i32,
    pub jobs_skipped: i32,
    pub jobs_rejected: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResponse {
    fn from(value: Job) -> Self {
        Self {
            id: value.id,
            source_url: value.source_url,
            title: value.title,
            company: value.company,
            location: value.location,
            description: value.description,
            requirements: value.requirements,
            salary_range: value.salary_range,
            employment_type: value.employment_type,
            seniority_level: value.seniority_level,
            external_id: value.external_id,
            requires_english: value.requires_english,
            match_score: value.match_score,
            language_signals: value.language_signals,
            search_region: value.search_region,
            posted_date: value.posted_date,
            scraped_at: value.scraped_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<JobList> for JobListResponse {
    fn from(value: JobList) -> Self {
        Self {
            items: value.items.into_iter().map(Into::into).collect(),
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}

impl From<ScrapeLog> for ScrapeLogResponse {
    fn from(value: ScrapeLog) -> Self {
        Self {
            id: value.id,
            search_term: value.search_term,
            location: value.location,
            regions: value.regions,
            source: value.source,
            jobs_found: value.jobs_found,
            jobs_inserted: value.jobs_inserted,
            jobs_updated: value.jobs_updated,
            jobs_skipped: value.jobs_skipped,
            jobs_rejected: value.jobs_rejected,
            success: value.success,
            error_message: value.error_message,
            started_at: value.started_at,
            completed_at: value.completed_at,
        }
    }
}
