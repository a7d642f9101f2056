pub mod classifier;
pub mod dedup_service;
pub mod feed_service;
pub mod ingest_service;
pub mod job_service;
pub mod scrape_log_service;
