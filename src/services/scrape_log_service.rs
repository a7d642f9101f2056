use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::job_dto::IngestSummary;
use crate::error::Result;
use crate::models::scrape_log::ScrapeLog;
use crate::services::ingest_service::ScrapeRun;

#[derive(Debug, Clone)]
pub struct NewScrapeLog {
    pub search_term: String,
    pub location: Option<String>,
    pub regions: Vec<String>,
    pub source: &'static str,
    pub jobs_found: i32,
    pub jobs_inserted: i32,
    pub jobs_updated: i32,
    pub jobs_skipped: i32,
    pub jobs_rejected: i32,
    pub success: bool,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl NewScrapeLog {
    pub fn completed(run: &ScrapeRun, summary: &IngestSummary) -> Self {
        Self {
            search_term: run.search_term.clone(),
            location: run.location.clone(),
            regions: run.regions.clone(),
            source: run.source.as_str(),
            jobs_found: clamp_count(summary.jobs_found),
            jobs_inserted: clamp_count(summary.jobs_inserted),
            jobs_updated: clamp_count(summary.jobs_updated),
            jobs_skipped: clamp_count(summary.jobs_skipped),
            jobs_rejected: clamp_count(summary.jobs_rejected),
            success: true,
            error_message: None,
            started_at: run.started_at,
        }
    }

    pub fn failed(run: &ScrapeRun, jobs_found: usize, error_message: String) -> Self {
        Self {
            search_term: run.search_term.clone(),
            location: run.location.clone(),
            regions: run.regions.clone(),
            source: run.source.as_str(),
            jobs_found: clamp_count(jobs_found),
            jobs_inserted: 0,
            jobs_updated: 0,
            jobs_skipped: 0,
            jobs_rejected: 0,
            success: false,
            error_message: Some(error_message),
            started_at: run.started_at,
        }
    }
}

fn clamp_count(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[derive(Clone)]
pub struct ScrapeLogService {
    pool: PgPool,
}

impl ScrapeLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, log: NewScrapeLog) -> Result<ScrapeLog> {
        let row = sqlx::query_as::<_, ScrapeLog>(
            r#"
            INSERT INTO scrape_logs (
                id, search_term, location, regions, source, jobs_found, jobs_inserted,
                jobs_updated, jobs_skipped, jobs_rejected, success, error_message,
                started_at, completed_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,NOW())
            RETURNING id, search_term, location, regions, source, jobs_found, jobs_inserted,
                jobs_updated, jobs_skipped, jobs_rejected, success, error_message,
                started_at, completed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&log.search_term)
        .bind(&log.location)
        .bind(&log.regions)
        .bind(log.source)
        .bind(log.jobs_found)
        .bind(log.jobs_inserted)
        .bind(log.jobs_updated)
        .bind(log.jobs_skipped)
        .bind(log.jobs_rejected)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(log.started_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<ScrapeLog>> {
        let limit = if limit <= 0 { 20 } else { limit.min(100) };
        let rows = sqlx::query_as::<_, ScrapeLog>(
            r#"
            SELECT id, search_term, location, regions, source, jobs_found, jobs_inserted,
                jobs_updated, jobs_skipped, jobs_rejected, success, error_message,
                started_at, completed_at
            FROM scrape_logs
            ORDER BY started_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
