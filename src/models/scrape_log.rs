use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScrapeLog {
    pub id: Uuid,
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
