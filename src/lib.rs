pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    classifier::Classifier, feed_service::FeedService, ingest_service::IngestService,
    job_service::JobService, scrape_log_service::ScrapeLogService,
};
use reqwest::Client;
use sqlx::PgPool;

/// Search parameters used when a scrape request leaves them out.
#[derive(Debug, Clone)]
pub struct ScrapeDefaults {
    pub search_term: String,
    pub location: String,
    pub max_jobs: usize,
    pub regions: Vec<String>,
    pub max_jobs_per_region: usize,
    pub region_pause: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub job_service: JobService,
    pub scrape_log_service: ScrapeLogService,
    pub ingest_service: IngestService,
    pub feed_service: FeedService,
    pub scrape_defaults: ScrapeDefaults,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.feed_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let classifier = Arc::new(Classifier::new(&config.keywords));
        let job_service = JobService::new(pool.clone());
        let scrape_log_service = ScrapeLogService::new(pool);
        let ingest_service = IngestService::new(
            classifier,
            job_service.clone(),
            scrape_log_service.clone(),
        );
        let feed_service = FeedService::new(config.scraper_feed_url.clone(), http_client);

        Ok(Self {
            job_service,
            scrape_log_service,
            ingest_service,
            feed_service,
            scrape_defaults: ScrapeDefaults {
                search_term: config.default_search_term.clone(),
                location: config.default_location.clone(),
                max_jobs: config.max_jobs,
                regions: config.scrape_regions.clone(),
                max_jobs_per_region: config.max_jobs_per_region,
                region_pause: Duration::from_millis(config.region_pause_ms),
            },
        })
    }
}
