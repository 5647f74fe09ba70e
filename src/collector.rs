use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Credentials;
use crate::db::{schema, SnapshotWriter};
use crate::error::{AppError, Result};
use crate::fetcher::MetricsSource;
use crate::scorer::{ScoringPolicy, TrendCalculator};

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub collected_at: DateTime<Utc>,
    pub templates_fetched: usize,
    pub templates_inserted: u64,
    /// `None` when the derived-metrics step failed.
    pub derived_rows: Option<usize>,
}

/// One collection run: bootstrap, fetch both inputs, store snapshots, then
/// derive trend metrics. Fetch and snapshot failures abort the run; a failed
/// derived-metrics step is only logged.
pub async fn run_collection<S, P>(
    source: &S,
    creds: &Credentials,
    pool: &SqlitePool,
    policy: P,
    collected_at: DateTime<Utc>,
) -> Result<RunSummary>
where
    S: MetricsSource,
    P: ScoringPolicy,
{
    info!(collected_at = %collected_at.to_rfc3339(), "Starting template metrics collection");

    schema::bootstrap(pool).await?;

    // Both fetches complete before anything is written.
    info!("Fetching earnings data...");
    let earnings = source.fetch_earnings(&creds.customer_id).await?;
    info!(
        "Fetched earnings data: ${:.2} template lifetime",
        earnings.template_earnings_lifetime as f64 / 100.0
    );

    info!("Fetching template data...");
    let templates = source.fetch_templates(&creds.workspace_id).await?;
    info!("Fetched {} templates", templates.len());

    let writer = SnapshotWriter::new(pool.clone());

    info!("Storing earnings snapshot...");
    writer.write_earnings_snapshot(&earnings, collected_at).await?;

    info!("Storing template snapshots...");
    let templates_inserted = writer.write_template_snapshots(&templates, collected_at).await?;

    info!("Calculating derived metrics...");
    let calculator = TrendCalculator::new(pool.clone(), policy);
    let derived_rows = match calculator.calculate(collected_at).await {
        Ok(n) => Some(n),
        Err(e) => {
            let e = AppError::DerivedMetrics(e.to_string());
            warn!("{e} (expected while fewer than two snapshots exist)");
            None
        }
    };

    info!("Metrics collection completed successfully");
    Ok(RunSummary {
        collected_at,
        templates_fetched: templates.len(),
        templates_inserted,
        derived_rows,
    })
}
