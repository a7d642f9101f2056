use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{
        IngestPayload, IngestResponse, JobListQuery, JobListResponse, JobResponse,
        JobStatsResponse, ScrapeLogQuery, ScrapeLogResponse,
    },
    error::Result,
    services::ingest_service::{RunSource, ScrapeRun},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs/ingest",
    request_body = IngestPayload,
    responses(
        (status = 200, description = "Batch classified, deduplicated and stored", body = IngestResponse),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn ingest_jobs(
    State(state): State<AppState>,
    Json(payload): Json<IngestPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let run = ScrapeRun::start(payload.search_term, payload.location, RunSource::Push);
    let report = state.ingest_service.ingest(run, payload.postings).await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!(
            "Stored {} new and {} updated jobs",
            report.summary.jobs_inserted, report.summary.jobs_updated
        ),
        summary: report.summary,
        outcomes: report.outcomes,
    }))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("search" = Option<String>, Query, description = "Search in title and description"),
        ("company" = Option<String>, Query, description = "Filter by company"),
        ("location" = Option<String>, Query, description = "Filter by location"),
        ("employment_type" = Option<String>, Query, description = "Filter by employment type"),
        ("seniority_level" = Option<String>, Query, description = "Filter by seniority level"),
        ("no_english" = Option<bool>, Query, description = "Only jobs that do not require English"),
        ("sort" = Option<String>, Query, description = "`posted_date` (default) or `match_score`")
    ),
    responses(
        (status = 200, description = "List of jobs", body = JobListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let result = state.job_service.list(query).await?;
    Ok(Json(JobListResponse::from(result)))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = JobResponse),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get_by_id(id).await?;
    Ok(Json(JobResponse::from(job)))
}

#[utoipa::path(
    get,
    path = "/api/jobs/stats/summary",
    responses(
        (status = 200, description = "Job statistics", body = JobStatsResponse)
    )
)]
#[axum::debug_handler]
pub async fn job_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.job_service.stats().await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/jobs/scrape-logs",
    params(
        ("limit" = Option<i64>, Query, description = "Number of runs to return")
    ),
    responses(
        (status = 200, description = "Most recent scrape runs", body = [ScrapeLogResponse])
    )
)]
#[axum::debug_handler]
pub async fn list_scrape_logs(
    State(state): State<AppState>,
    Query(query): Query<ScrapeLogQuery>,
) -> Result<impl IntoResponse> {
    let logs = state
        .scrape_log_service
        .list_recent(query.limit.unwrap_or(20))
        .await?;
    let items: Vec<ScrapeLogResponse> = logs.into_iter().map(Into::into).collect();
    Ok(Json(items))
}
