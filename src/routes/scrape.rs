use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::job_dto::{IngestResponse, RegionScrapeRequest, ScrapeRequest},
    error::Result,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs/scrape",
    request_body = ScrapeRequest,
    responses(
        (status = 200, description = "Feed pulled and ingested", body = IngestResponse),
        (status = 400, description = "Invalid payload or no feed configured"),
        (status = 503, description = "Scraper feed unavailable; retryable")
    )
)]
#[axum::debug_handler]
pub async fn trigger_scrape(
    State(state): State<AppState>,
    Json(payload): Json<ScrapeRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let defaults = &state.scrape_defaults;
    let search_term = payload
        .search_term
        .unwrap_or_else(|| defaults.search_term.clone());
    let location = payload
        .location
        .unwrap_or_else(|| defaults.location.clone());
    let max_jobs = payload.max_jobs.unwrap_or(defaults.max_jobs);

    let report = state
        .ingest_service
        .scrape(&state.feed_service, &search_term, &location, max_jobs)
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!(
            "Scraped {} jobs for '{}' in {}",
            report.summary.jobs_found, search_term, location
        ),
        summary: report.summary,
        outcomes: report.outcomes,
    }))
}

#[utoipa::path(
    post,
    path = "/api/jobs/scrape/regions",
    request_body = RegionScrapeRequest,
    responses(
        (status = 200, description = "All regions pulled, merged and ingested", body = IngestResponse),
        (status = 400, description = "Invalid payload or no feed configured"),
        (status = 503, description = "Every region failed; retryable")
    )
)]
#[axum::debug_handler]
pub async fn trigger_region_scrape(
    State(state): State<AppState>,
    Json(payload): Json<RegionScrapeRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let defaults = &state.scrape_defaults;
    let search_term = payload
        .search_term
        .unwrap_or_else(|| defaults.search_term.clone());
    let regions = payload
        .regions
        .unwrap_or_else(|| defaults.regions.clone());
    let region_count = regions.len();
    let max_jobs_per_region = payload
        .max_jobs_per_region
        .unwrap_or(defaults.max_jobs_per_region);

    let report = state
        .ingest_service
        .scrape_regions(
            &state.feed_service,
            &search_term,
            regions,
            max_jobs_per_region,
            defaults.region_pause,
        )
        .await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!(
            "Scraped {} jobs for '{}' across {} regions",
            report.summary.jobs_found, search_term, region_count
        ),
        summary: report.summary,
        outcomes: report.outcomes,
    }))
}
