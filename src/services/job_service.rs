use crate::dto::job_dto::{JobListQuery, JobStatsResponse, NamedCount};
use crate::error::Result;
use crate::models::job::{Job, KnownJobRow};
use crate::services::classifier::round2;
use crate::services::dedup_service::{ClassifiedPosting, DedupDecision, KnownPostings};
use crate::services::ingest_service::PlannedWrite;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, source_url, title, company, location, description, requirements, salary_range, employment_type, seniority_level, external_id, requires_english, match_score, language_signals, search_term, search_region, posted_date, scraped_at, updated_at, is_active";

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

pub struct JobList {
    pub items: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored snapshots for the given source keys. Keys with no row are absent.
    pub async fn find_known(&self, keys: &[String]) -> Result<KnownPostings> {
        if keys.is_empty() {
            return Ok(KnownPostings::new());
        }

        let rows = sqlx::query_as::<_, KnownJobRow>(
            r#"
            SELECT source_url, description, location, employment_type, requires_english, language_signals
            FROM jobs
            WHERE source_url = ANY($1)
            "#,
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.source_url.clone(), row.into()))
            .collect())
    }

    /// Writes every Insert/Update in one transaction. Skips and rejects are ignored.
    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    pub async fn apply(&self, writes: &[PlannedWrite], search_term: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for write in writes {
            let Some(candidate) = write.classified() else {
                continue;
            };
            match write.dedup_decision() {
                Some(DedupDecision::Insert) | Some(DedupDecision::Update) => {
                    upsert(&mut *tx, candidate, search_term).await?;
                }
                _ => {}
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list(&self, query: JobListQuery) -> Result<JobList> {
        let (page, per_page, offset) = page_window(query.page, query.per_page);

        let mut filters = vec!["is_active = TRUE".to_string()];
        let mut args: Vec<String> = Vec::new();

        if query.no_english.unwrap_or(false) {
            filters.push("requires_english = FALSE".to_string());
        }
        if let Some(search) = non_blank(query.search) {
            let first = args.len() + 1;
            let second = first + 1;
            filters.push(format!(
                "(title ILIKE ${} ESCAPE '\\' OR description ILIKE ${} ESCAPE '\\')",
                first, second
            ));
            let pattern = contains_pattern(&search);
            args.push(pattern.clone());
            args.push(pattern);
        }
        for (column, value) in [
            ("company", query.company),
            ("location", query.location),
            ("employment_type", query.employment_type),
            ("seniority_level", query.seniority_level),
        ] {
            if let Some(value) = non_blank(value) {
                filters.push(format!(
                    "{} ILIKE ${} ESCAPE '\\'",
                    column,
                    args.len() + 1
                ));
                args.push(contains_pattern(&value));
            }
        }

        let where_clause = format!("WHERE {}", filters.join(" AND "));
        let order_by = match query.sort.as_deref() {
            Some("match_score") => "match_score DESC, posted_date DESC NULLS LAST",
            _ => "posted_date DESC NULLS LAST, scraped_at DESC",
        };

        let items_query = format!(
            "SELECT {} FROM jobs {} ORDER BY {} LIMIT ${} OFFSET ${}",
            JOB_COLUMNS,
            where_clause,
            order_by,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM jobs {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Job>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        items_statement = items_statement.bind(per_page).bind(offset);
        let items = items_statement.fetch_all(&self.pool).await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(JobList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    pub async fn stats(&self) -> Result<JobStatsResponse> {
        let total_jobs =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs WHERE is_active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        let jobs_without_english = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE is_active = TRUE AND requires_english = FALSE",
        )
        .fetch_one(&self.pool)
        .await?;

        let top_companies = self.top_by("company").await?;
        let top_locations = self.top_by("location").await?;

        Ok(JobStatsResponse {
            total_jobs,
            jobs_without_english,
            english_percentage: english_percentage(total_jobs, jobs_without_english),
            top_companies,
            top_locations,
        })
    }

    async fn top_by(&self, column: &'static str) -> Result<Vec<NamedCount>> {
        let query = format!(
            "SELECT {col} AS name, COUNT(*) AS count
             FROM jobs
             WHERE is_active = TRUE AND {col} <> ''
             GROUP BY {col}
             ORDER BY count DESC, name ASC
             LIMIT 5",
            col = column
        );
        let rows = sqlx::query_as::<_, NamedCount>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

async fn upsert(
    conn: &mut PgConnection,
    candidate: &ClassifiedPosting,
    search_term: &str,
) -> Result<()> {
    let posting = &candidate.posting;
    let classification = &candidate.classification;

    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, source_url, title, company, location, description, requirements,
            salary_range, employment_type, seniority_level, external_id,
            requires_english, match_score, language_signals, search_term, posted_date,
            search_region
        ) VALUES (
            $1,$2,$3,$4,$5,$6,$7,
            $8,$9,$10,$11,
            $12,$13,$14,$15,$16,
            $17
        )
        ON CONFLICT (source_url) DO UPDATE SET
            title = EXCLUDED.title,
            company = EXCLUDED.company,
            location = EXCLUDED.location,
            description = EXCLUDED.description,
            requirements = EXCLUDED.requirements,
            salary_range = EXCLUDED.salary_range,
            employment_type = EXCLUDED.employment_type,
            seniority_level = EXCLUDED.seniority_level,
            external_id = COALESCE(EXCLUDED.external_id, jobs.external_id),
            requires_english = EXCLUDED.requires_english,
            match_score = EXCLUDED.match_score,
            language_signals = EXCLUDED.language_signals,
            search_term = EXCLUDED.search_term,
            posted_date = COALESCE(EXCLUDED.posted_date, jobs.posted_date),
            search_region = COALESCE(EXCLUDED.search_region, jobs.search_region),
            is_active = TRUE,
            updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&candidate.source_key)
    .bind(&posting.title)
    .bind(&posting.company)
    .bind(&posting.location)
    .bind(&posting.description)
    .bind(&posting.requirements)
    .bind(&posting.salary_range)
    .bind(&posting.employment_type)
    .bind(&posting.seniority_level)
    .bind(&posting.external_id)
    .bind(classification.requires_english)
    .bind(classification.match_score)
    .bind(&classification.language_signals)
    .bind(search_term)
    .bind(posting.posted_date)
    .bind(&posting.search_region)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

const MAX_PER_PAGE: i64 = 100;

/// Page, page size and row offset. Out-of-range input is clamped so the
/// offset always fits in an `i64`.
fn page_window(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let per_page = per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE);
    let page = page.unwrap_or(1).clamp(1, i64::MAX / MAX_PER_PAGE);
    (page, per_page, (page - 1) * per_page)
}

/// `%value%` for ILIKE, with the pattern metacharacters escaped.
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Share of active jobs that require English, in percent.
pub fn english_percentage(total_jobs: i64, jobs_without_english: i64) -> f64 {
    if total_jobs <= 0 {
        return 0.0;
    }
    round2((total_jobs - jobs_without_english) as f64 / total_jobs as f64 * 100.0)
}
