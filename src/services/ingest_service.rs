use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::dto::job_dto::{IngestDecision, IngestOutcome, IngestSummary, RawPosting};
use crate::error::{Error, Result};
use crate::services::classifier::{Classifier, ClassificationResult, SearchIntent};
use crate::services::dedup_service::{
    canonical_source_key, ClassifiedPosting, DedupDecision, Deduplicator, KnownPostings,
};
use crate::services::feed_service::FeedService;
use crate::services::job_service::JobService;
use crate::services::scrape_log_service::{NewScrapeLog, ScrapeLogService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSource {
    Push,
    Feed,
}

impl RunSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunSource::Push => "push",
            RunSource::Feed => "feed",
        }
    }
}

/// Metadata of one scrape run, written to `scrape_logs` when it finishes.
#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub search_term: String,
    pub location: Option<String>,
    pub regions: Vec<String>,
    pub source: RunSource,
    pub started_at: DateTime<Utc>,
}

impl ScrapeRun {
    pub fn start(search_term: impl Into<String>, location: Option<String>, source: RunSource) -> Self {
        Self {
            search_term: search_term.into(),
            regions: location.iter().cloned().collect(),
            location,
            source,
            started_at: Utc::now(),
        }
    }

    /// A feed run that sweeps several regions.
    pub fn regions(search_term: impl Into<String>, regions: Vec<String>) -> Self {
        Self {
            search_term: search_term.into(),
            location: None,
            regions,
            source: RunSource::Feed,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PlannedWrite {
    Accepted {
        candidate: ClassifiedPosting,
        decision: DedupDecision,
    },
    Rejected {
        posting: RawPosting,
        classification: ClassificationResult,
    },
}

impl PlannedWrite {
    pub fn classified(&self) -> Option<&ClassifiedPosting> {
        match self {
            PlannedWrite::Accepted { candidate, .. } => Some(candidate),
            PlannedWrite::Rejected { .. } => None,
        }
    }

    pub fn dedup_decision(&self) -> Option<DedupDecision> {
        match self {
            PlannedWrite::Accepted { decision, .. } => Some(*decision),
            PlannedWrite::Rejected { .. } => None,
        }
    }

    pub fn decision(&self) -> IngestDecision {
        self.dedup_decision()
            .map(IngestDecision::from)
            .unwrap_or(IngestDecision::Rejected)
    }

    pub fn classification(&self) -> &ClassificationResult {
        match self {
            PlannedWrite::Accepted { candidate, .. } => &candidate.classification,
            PlannedWrite::Rejected { classification, .. } => classification,
        }
    }

    fn posting(&self) -> &RawPosting {
        match self {
            PlannedWrite::Accepted { candidate, .. } => &candidate.posting,
            PlannedWrite::Rejected { posting, .. } => posting,
        }
    }

    pub fn outcome(&self) -> IngestOutcome {
        let classification = self.classification();
        let source_url = match self {
            PlannedWrite::Accepted { candidate, .. } => candidate.source_key.clone(),
            PlannedWrite::Rejected { posting, .. } => posting.source_url.clone(),
        };
        IngestOutcome {
            source_url,
            title: self.posting().title.clone(),
            decision: self.decision(),
            requires_english: classification.requires_english,
            match_score: classification.match_score,
            language_signals: classification.language_signals.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub summary: IngestSummary,
    pub outcomes: Vec<IngestOutcome>,
}

/// Classifies and deduplicates one batch against `known`.
///
/// Each accepted posting is recorded into `known` as it is planned, so a URL
/// repeated inside the batch resolves against its earlier occurrence.
pub fn plan_batch(
    classifier: &Classifier,
    deduplicator: &Deduplicator,
    batch: Vec<RawPosting>,
    intent: &SearchIntent,
    known: &mut KnownPostings,
) -> Vec<PlannedWrite> {
    batch
        .into_iter()
        .map(|posting| {
            let classification =
                classifier.classify(&posting.title, &posting.description, intent);

            let Some(source_key) = canonical_source_key(&posting.source_url) else {
                warn!(title = %posting.title, company = %posting.company, "Rejecting posting without source URL");
                return PlannedWrite::Rejected {
                    posting,
                    classification,
                };
            };

            let candidate = ClassifiedPosting {
                source_key,
                posting,
                classification,
            };
            let decision = deduplicator.decide(&candidate, known);
            debug!(
                source_key = %candidate.source_key,
                decision = decision.as_str(),
                requires_english = candidate.classification.requires_english,
                "Planned posting"
            );
            if decision != DedupDecision::Skip {
                known.insert(candidate.source_key.clone(), candidate.snapshot());
            }

            PlannedWrite::Accepted {
                candidate,
                decision,
            }
        })
        .collect()
}

pub fn summarize(writes: &[PlannedWrite]) -> IngestSummary {
    let mut summary = IngestSummary {
        jobs_found: writes.len(),
        ..Default::default()
    };
    for write in writes {
        match write.decision() {
            IngestDecision::Insert => summary.jobs_inserted += 1,
            IngestDecision::Update => summary.jobs_updated += 1,
            IngestDecision::Skip => summary.jobs_skipped += 1,
            IngestDecision::Rejected => summary.jobs_rejected += 1,
        }
        if write.decision() != IngestDecision::Rejected && !write.classification().requires_english
        {
            summary.jobs_without_english += 1;
        }
    }
    summary
}

#[derive(Clone)]
pub struct IngestService {
    classifier: Arc<Classifier>,
    deduplicator: Deduplicator,
    job_service: JobService,
    scrape_log_service: ScrapeLogService,
}

impl IngestService {
    pub fn new(
        classifier: Arc<Classifier>,
        job_service: JobService,
        scrape_log_service: ScrapeLogService,
    ) -> Self {
        Self {
            classifier,
            deduplicator: Deduplicator::new(),
            job_service,
            scrape_log_service,
        }
    }

    pub fn plan(
        &self,
        batch: Vec<RawPosting>,
        intent: &SearchIntent,
        known: &mut KnownPostings,
    ) -> Vec<PlannedWrite> {
        plan_batch(&self.classifier, &self.deduplicator, batch, intent, known)
    }

    #[instrument(skip(self, batch), fields(search_term = %run.search_term, source = run.source.as_str(), batch = batch.len()))]
    pub async fn ingest(&self, run: ScrapeRun, batch: Vec<RawPosting>) -> Result<IngestReport> {
        let keys: Vec<String> = batch
            .iter()
            .filter_map(|posting| canonical_source_key(&posting.source_url))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut known = match self.job_service.find_known(&keys).await {
            Ok(known) => known,
            Err(err) => {
                self.record_failed_run(&run, batch.len(), &err).await;
                return Err(err);
            }
        };

        let intent = SearchIntent::new(&run.search_term);
        let writes = self.plan(batch, &intent, &mut known);
        let summary = summarize(&writes);

        if let Err(err) = self.job_service.apply(&writes, &run.search_term).await {
            self.record_failed_run(&run, writes.len(), &err).await;
            return Err(err);
        }

        info!(
            jobs_found = summary.jobs_found,
            jobs_inserted = summary.jobs_inserted,
            jobs_updated = summary.jobs_updated,
            jobs_skipped = summary.jobs_skipped,
            jobs_rejected = summary.jobs_rejected,
            jobs_without_english = summary.jobs_without_english,
            "Ingest run completed"
        );

        let log = NewScrapeLog::completed(&run, &summary);
        if let Err(err) = self.scrape_log_service.create(log).await {
            warn!(error = ?err, "Failed to record scrape log");
        }

        Ok(IngestReport {
            summary,
            outcomes: writes.iter().map(PlannedWrite::outcome).collect(),
        })
    }

    /// Pulls one batch from the scraper feed and ingests it.
    pub async fn scrape(
        &self,
        feed: &FeedService,
        search_term: &str,
        location: &str,
        max_jobs: usize,
    ) -> Result<IngestReport> {
        if !feed.is_configured() {
            return Err(Error::BadRequest(
                "No scraper feed configured (SCRAPER_FEED_URL)".to_string(),
            ));
        }

        let run = ScrapeRun::start(search_term, Some(location.to_string()), RunSource::Feed);
        let batch = match feed.fetch(search_term, location, max_jobs).await {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, retryable = err.is_retryable(), "Scraper feed fetch failed");
                self.record_failed_run(&run, 0, &err).await;
                return Err(err);
            }
        };

        self.ingest(run, batch).await
    }

    /// Sweeps `regions` through the feed and ingests the merged batch, so a
    /// posting listed in several regions is stored once.
    pub async fn scrape_regions(
        &self,
        feed: &FeedService,
        search_term: &str,
        regions: Vec<String>,
        max_jobs_per_region: usize,
        pause: Duration,
    ) -> Result<IngestReport> {
        if !feed.is_configured() {
            return Err(Error::BadRequest(
                "No scraper feed configured (SCRAPER_FEED_URL)".to_string(),
            ));
        }

        let run = ScrapeRun::regions(search_term, regions);
        let batch = match feed
            .fetch_regions(search_term, &run.regions, max_jobs_per_region, pause)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                error!(error = %err, retryable = err.is_retryable(), "Multi-region scrape failed");
                self.record_failed_run(&run, 0, &err).await;
                return Err(err);
            }
        };

        self.ingest(run, batch).await
    }

    async fn record_failed_run(&self, run: &ScrapeRun, jobs_found: usize, err: &Error) {
        let log = NewScrapeLog::failed(run, jobs_found, err.to_string());
        if let Err(log_err) = self.scrape_log_service.create(log).await {
            warn!(error = ?log_err, "Failed to record failed scrape run");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(url: &str, description: &str) -> RawPosting {
        RawPosting {
            title: "DevOps Engineer".into(),
            company: "InnovaTech".into(),
            location: "Valparaíso, Chile".into(),
            description: description.into(),
            source_url: url.into(),
            ..Default::default()
        }
    }

    fn plan(batch: Vec<RawPosting>, known: &mut KnownPostings) -> Vec<PlannedWrite> {
        plan_batch(
            &Classifier::default(),
            &Deduplicator::new(),
            batch,
            &SearchIntent::new("DevOps"),
            known,
        )
    }

    #[test]
    fn repeated_url_in_one_batch_is_skipped() {
        let mut known = KnownPostings::new();
        let writes = plan(
            vec![
                posting("https://linkedin.com/jobs/view/1?trk=a", "AWS y Docker"),
                posting("https://linkedin.com/jobs/view/1?trk=b", "AWS y Docker"),
            ],
            &mut known,
        );

        let decisions: Vec<_> = writes.iter().map(PlannedWrite::decision).collect();
        assert_eq!(decisions, vec![IngestDecision::Insert, IngestDecision::Skip]);
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn repeated_url_with_new_text_is_update() {
        let mut known = KnownPostings::new();
        let writes = plan(
            vec![
                posting("https://linkedin.com/jobs/view/1", "AWS y Docker"),
                posting("https://linkedin.com/jobs/view/1", "AWS y Docker. Fluent English"),
            ],
            &mut known,
        );

        assert_eq!(writes[1].decision(), IngestDecision::Update);
        assert!(writes[1].classification().requires_english);
        assert!(known["https://linkedin.com/jobs/view/1"].requires_english);
    }

    #[test]
    fn postings_without_url_are_rejected() {
        let mut known = KnownPostings::new();
        let writes = plan(vec![posting("  ", "AWS")], &mut known);

        assert_eq!(writes[0].decision(), IngestDecision::Rejected);
        assert!(writes[0].classified().is_none());
        assert!(known.is_empty());
    }

    #[test]
    fn summary_counts_every_decision() {
        let mut known = KnownPostings::new();
        let stored = posting("https://linkedin.com/jobs/view/2", "Kubernetes");
        let warmup = plan(vec![stored.clone()], &mut known);
        assert_eq!(warmup[0].decision(), IngestDecision::Insert);

        let writes = plan(
            vec![
                posting("https://linkedin.com/jobs/view/1", "Se requiere inglés avanzado (B2)"),
                stored.clone(),
                posting("https://linkedin.com/jobs/view/2", "Kubernetes y Helm"),
                posting("", "Sin URL"),
            ],
            &mut known,
        );
        let summary = summarize(&writes);

        assert_eq!(
            summary,
            IngestSummary {
                jobs_found: 4,
                jobs_inserted: 1,
                jobs_updated: 1,
                jobs_skipped: 1,
                jobs_rejected: 1,
                jobs_without_english: 2,
            }
        );
    }

    #[test]
    fn posting_seen_in_two_regions_is_stored_once() {
        let mut known = KnownPostings::new();
        let mut in_chile = posting("https://linkedin.com/jobs/view/7?refId=cl", "Docker");
        in_chile.search_region = Some("Chile".into());
        let mut remote = posting("https://linkedin.com/jobs/view/7?refId=rm", "Docker");
        remote.search_region = Some("Remote".into());

        let writes = plan(vec![in_chile, remote], &mut known);
        let summary = summarize(&writes);

        assert_eq!(summary.jobs_found, 2);
        assert_eq!(summary.jobs_inserted, 1);
        assert_eq!(summary.jobs_skipped, 1);
        let stored = writes[0].classified().unwrap();
        assert_eq!(stored.posting.search_region.as_deref(), Some("Chile"));
    }

    #[test]
    fn region_run_records_every_region() {
        let regions = vec!["España".to_string(), "México".to_string()];
        let run = ScrapeRun::regions("DevOps", regions.clone());
        assert_eq!(run.regions, regions);
        assert_eq!(run.source, RunSource::Feed);
        assert!(run.location.is_none());

        let single = ScrapeRun::start("DevOps", Some("Chile".into()), RunSource::Feed);
        assert_eq!(single.regions, vec!["Chile".to_string()]);
    }

    #[test]
    fn outcome_reports_canonical_key() {
        let mut known = KnownPostings::new();
        let writes = plan(
            vec![posting("https://linkedin.com/jobs/view/9/?trk=x", "Docker")],
            &mut known,
        );
        let outcome = writes[0].outcome();
        assert_eq!(outcome.source_url, "https://linkedin.com/jobs/view/9");
        assert_eq!(outcome.decision, IngestDecision::Insert);
        assert_eq!(outcome.match_score, 66.67);
    }
}
