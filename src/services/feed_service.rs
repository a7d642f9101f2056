use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::dto::job_dto::RawPosting;
use crate::error::{Error, Result};

/// The scraper answers either with a bare array or with `{"jobs": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedBody {
    List(Vec<RawPosting>),
    Envelope {
        #[serde(alias = "jobs_data", alias = "postings")]
        jobs: Vec<RawPosting>,
    },
}

impl FeedBody {
    fn into_postings(self) -> Vec<RawPosting> {
        match self {
            FeedBody::List(postings) => postings,
            FeedBody::Envelope { jobs } => jobs,
        }
    }
}

/// Regions swept by a multi-region scrape when none are given.
pub const DEFAULT_REGIONS: [&str; 9] = [
    "España",
    "México",
    "Argentina",
    "Colombia",
    "Chile",
    "Perú",
    "Uruguay",
    "Costa Rica",
    "Remote",
];

/// Client for the external scraper's JSON feed.
#[derive(Clone)]
pub struct FeedService {
    client: Client,
    feed_url: Option<String>,
}

impl FeedService {
    pub fn new(feed_url: Option<String>, client: Client) -> Self {
        Self { client, feed_url }
    }

    pub fn is_configured(&self) -> bool {
        self.feed_url.is_some()
    }

    #[instrument(skip(self))]
    pub async fn fetch(
        &self,
        search_term: &str,
        location: &str,
        max_jobs: usize,
    ) -> Result<Vec<RawPosting>> {
        let Some(feed_url) = &self.feed_url else {
            return Err(Error::BadRequest(
                "No scraper feed configured (SCRAPER_FEED_URL)".to_string(),
            ));
        };

        let limit = max_jobs.to_string();
        info!("Fetching postings from scraper feed");

        let response = self
            .client
            .get(feed_url)
            .query(&[
                ("keywords", search_term),
                ("location", location),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Scraper feed returned an error status");
            return Err(Error::Fetch {
                message: format!("scraper feed returned status {}", status),
                status: Some(status.as_u16()),
            });
        }

        let body = response.json::<FeedBody>().await?;
        let mut postings = body.into_postings();
        postings.truncate(max_jobs);

        info!(count = postings.len(), "Fetched postings from scraper feed");
        Ok(postings)
    }

    /// Fetches every region in turn, pausing between requests, and merges the
    /// results into one batch tagged with `search_region`.
    ///
    /// A failing region is logged and skipped. The sweep only fails when every
    /// region failed, with the last error.
    #[instrument(skip(self, regions), fields(regions = regions.len()))]
    pub async fn fetch_regions(
        &self,
        search_term: &str,
        regions: &[String],
        max_jobs_per_region: usize,
        pause: Duration,
    ) -> Result<Vec<RawPosting>> {
        let mut merged = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for (index, region) in regions.iter().enumerate() {
            if index > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }

            match self.fetch(search_term, region, max_jobs_per_region).await {
                Ok(postings) => {
                    succeeded += 1;
                    info!(%region, count = postings.len(), "Region fetched");
                    merged.extend(tag_region(postings, region));
                }
                Err(err @ Error::BadRequest(_)) => return Err(err),
                Err(err) => {
                    warn!(%region, error = %err, "Region fetch failed, continuing");
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if succeeded == 0 => Err(err),
            _ => Ok(merged),
        }
    }
}

fn tag_region(postings: Vec<RawPosting>, region: &str) -> impl Iterator<Item = RawPosting> + '_ {
    postings.into_iter().map(move |mut posting| {
        posting.search_region = Some(region.to_string());
        posting
    })
}
