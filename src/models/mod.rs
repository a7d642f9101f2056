pub mod job;
pub mod scrape_log;
