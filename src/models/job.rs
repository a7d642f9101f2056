use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
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
    pub search_term: Option<String>,
    pub search_region: Option<String>,
    pub posted_date: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Tracked columns of a stored job, as read back for deduplication.
#[derive(Debug, Clone, FromRow)]
pub struct KnownJobRow {
    pub source_url: String,
    pub description: String,
    pub location: String,
    pub employment_type: Option<String>,
    pub requires_english: bool,
    pub language_signals: Vec<String>,
}
