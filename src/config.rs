use crate::error::{Error, Result};
use crate::services::classifier::KeywordConfig;
use crate::services::feed_service::DEFAULT_REGIONS;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub scraper_feed_url: Option<String>,
    pub feed_timeout_secs: u64,
    pub default_search_term: String,
    pub default_location: String,
    pub max_jobs: usize,
    pub scrape_regions: Vec<String>,
    pub max_jobs_per_region: usize,
    pub region_pause_ms: u64,
    pub scrape_interval_secs: Option<u64>,
    pub allowed_origins: Vec<String>,
    pub keywords: KeywordConfig,
    pub json_logs: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mut keywords = KeywordConfig::default();
        if let Some(required) = get_env_list("ENGLISH_REQUIRED_KEYWORDS") {
            keywords.english_required = required;
        }
        if let Some(negation) = get_env_list("ENGLISH_NEGATION_KEYWORDS") {
            keywords.negation = negation;
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            scraper_feed_url: get_env_opt("SCRAPER_FEED_URL"),
            feed_timeout_secs: get_env_parse_or("FEED_TIMEOUT_SECS", 30)?,
            default_search_term: get_env_opt("DEFAULT_SEARCH_TERM")
                .unwrap_or_else(|| "DevOps".to_string()),
            default_location: get_env_opt("DEFAULT_LOCATION")
                .unwrap_or_else(|| "España".to_string()),
            max_jobs: get_env_parse_or("MAX_JOBS", 50)?,
            scrape_regions: get_env_list("SCRAPE_REGIONS").unwrap_or_else(|| {
                DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect()
            }),
            max_jobs_per_region: get_env_parse_or("MAX_JOBS_PER_REGION", 20)?,
            region_pause_ms: get_env_parse_or("REGION_PAUSE_MS", 3000)?,
            scrape_interval_secs: match get_env_opt("SCRAPE_INTERVAL_SECS") {
                Some(_) => Some(get_env_parse("SCRAPE_INTERVAL_SECS")?),
                None => None,
            },
            allowed_origins: get_env_list("ALLOWED_ORIGINS")
                .unwrap_or_else(|| vec!["*".to_string()]),
            keywords,
            json_logs: get_env_opt("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(_) => get_env_parse(name),
        None => Ok(default),
    }
}

/// Comma-separated list; `None` when unset or blank.
fn get_env_list(name: &str) -> Option<Vec<String>> {
    get_env_opt(name).map(|raw| parse_list(&raw)).filter(|v| !v.is_empty())
}

pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_drops_blanks_and_trims() {
        assert_eq!(
            parse_list(" fluent english, ,b2 ,"),
            vec!["fluent english".to_string(), "b2".to_string()]
        );
        assert!(parse_list(" , ").is_empty());
    }
}
