pub mod health;
pub mod jobs;
pub mod scrape;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        jobs::ingest_jobs,
        jobs::list_jobs,
        jobs::get_job,
        jobs::job_stats,
        jobs::list_scrape_logs,
        scrape::trigger_scrape,
        scrape::trigger_region_scrape,
    ),
    components(schemas(
        crate::dto::job_dto::RawPosting,
        crate::dto::job_dto::IngestPayload,
        crate::dto::job_dto::ScrapeRequest,
        crate::dto::job_dto::RegionScrapeRequest,
        crate::dto::job_dto::IngestDecision,
        crate::dto::job_dto::IngestSummary,
        crate::dto::job_dto::IngestOutcome,
        crate::dto::job_dto::IngestResponse,
        crate::dto::job_dto::JobResponse,
        crate::dto::job_dto::JobListResponse,
        crate::dto::job_dto::NamedCount,
        crate::dto::job_dto::JobStatsResponse,
        crate::dto::job_dto::ScrapeLogResponse,
        crate::services::classifier::ClassificationResult,
    )),
    tags((name = "jobs", description = "Scraped job postings"))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// All application routes, without middleware layers.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/ingest", post(jobs::ingest_jobs))
        .route("/api/jobs/scrape", post(scrape::trigger_scrape))
        .route("/api/jobs/scrape/regions", post(scrape::trigger_region_scrape))
        .route("/api/jobs/stats/summary", get(jobs::job_stats))
        .route("/api/jobs/scrape-logs", get(jobs::list_scrape_logs))
        .route("/api/jobs/:id", get(jobs::get_job))
}
