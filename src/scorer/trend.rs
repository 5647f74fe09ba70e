use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::models::{DerivedMetricRow, PriorSnapshot};
use crate::error::Result;
use crate::scorer::profitability::{ScoreInputs, ScoringPolicy};

const MS_PER_HOUR: i64 = 3_600_000;

/// Lookback horizons a snapshot is compared across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Day,
    Week,
    Month,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Day, Horizon::Week, Horizon::Month];

    pub fn days(self) -> i64 {
        match self {
            Horizon::Day => 1,
            Horizon::Week => 7,
            Horizon::Month => 30,
        }
    }

    pub fn millis(self) -> i64 {
        self.days() * 24 * MS_PER_HOUR
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Horizon::Day => "24h",
            Horizon::Week => "7d",
            Horizon::Month => "30d",
        };
        write!(f, "{s}")
    }
}

/// A template's snapshot at the run being evaluated.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CurrentSnapshot {
    pub template_id: String,
    pub template_name: Option<String>,
    pub total_payout: i64,
    pub active_projects: i64,
    pub retention_rate: f64,
    pub health: Option<f64>,
}

/// Nearest earlier snapshot per horizon; `None` when the window is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Priors {
    pub day: Option<PriorSnapshot>,
    pub week: Option<PriorSnapshot>,
    pub month: Option<PriorSnapshot>,
}

impl Priors {
    pub fn get(&self, horizon: Horizon) -> Option<PriorSnapshot> {
        match horizon {
            Horizon::Day => self.day,
            Horizon::Week => self.week,
            Horizon::Month => self.month,
        }
    }

    fn slot_mut(&mut self, horizon: Horizon) -> &mut Option<PriorSnapshot> {
        match horizon {
            Horizon::Day => &mut self.day,
            Horizon::Week => &mut self.week,
            Horizon::Month => &mut self.month,
        }
    }
}

/// Compares every template snapshot of a run against earlier snapshots and
/// stores one `template_metrics_derived` row per template.
pub struct TrendCalculator<P> {
    pool: SqlitePool,
    policy: P,
}

impl<P: ScoringPolicy> TrendCalculator<P> {
    pub fn new(pool: SqlitePool, policy: P) -> Self {
        Self { pool, policy }
    }

    /// Runs inside one transaction. No conflict handling: calling this twice
    /// for the same timestamp stores two rows per template.
    pub async fn calculate(&self, collected_at: DateTime<Utc>) -> Result<usize> {
        let at = collected_at.timestamp_millis();
        let mut tx = self.pool.begin().await?;

        let current: Vec<CurrentSnapshot> = sqlx::query_as(
            r#"
            SELECT template_id, template_name, total_payout, active_projects,
                   retention_rate, health
            FROM template_snapshots
            WHERE collected_at = ?
            ORDER BY template_id
            "#,
        )
        .bind(at)
        .fetch_all(&mut *tx)
        .await?;

        for snap in &current {
            let mut priors = Priors::default();
            for h in Horizon::ALL {
                *priors.slot_mut(h) = find_prior(&mut tx, &snap.template_id, at, h).await?;
            }
            let row = derive_metric(snap, &priors, at, &self.policy);
            debug!(
                template_id = %row.template_id,
                growth_24h = row.revenue_growth_24h,
                growth_7d = row.revenue_growth_7d,
                growth_30d = row.revenue_growth_30d,
                week_prior_at = priors.week.map(|p| p.collected_at),
                score = row.profitability_score,
                "Derived metrics"
            );
            insert_derived(&mut tx, &row).await?;
        }

        tx.commit().await?;
        info!(templates = current.len(), "Derived metrics calculated and stored");
        Ok(current.len())
    }
}

/// Most recent snapshot of `template_id` with `at - horizon <= collected_at < at`.
/// Uses the (template_id, collected_at) index.
pub async fn find_prior(
    conn: &mut SqliteConnection,
    template_id: &str,
    at: i64,
    horizon: Horizon,
) -> Result<Option<PriorSnapshot>> {
    let prior: Option<PriorSnapshot> = sqlx::query_as(
        r#"
        SELECT collected_at, total_payout, active_projects
        FROM template_snapshots
        WHERE template_id = ?
          AND collected_at >= ?
          AND collected_at < ?
        ORDER BY collected_at DESC
        LIMIT 1
        "#,
    )
    .bind(template_id)
    .bind(at - horizon.millis())
    .bind(at)
    .fetch_optional(conn)
    .await?;
    Ok(prior)
}

/// Growth and averages against each horizon's prior snapshot. A missing prior
/// counts as "no change": deltas and averages are 0, not null.
pub fn derive_metric(
    current: &CurrentSnapshot,
    priors: &Priors,
    calculated_at: i64,
    policy: &impl ScoringPolicy,
) -> DerivedMetricRow {
    let growth = |h: Horizon| {
        current.total_payout - priors.get(h).map_or(current.total_payout, |p| p.total_payout)
    };
    let active_change = |h: Horizon| {
        current.active_projects - priors.get(h).map_or(current.active_projects, |p| p.active_projects)
    };
    let avg_daily = |h: Horizon| match priors.get(h) {
        Some(p) => (current.total_payout - p.total_payout) as f64 / h.days() as f64,
        None => 0.0,
    };

    let revenue_growth_30d = growth(Horizon::Month);
    let profitability_score = policy.score(&ScoreInputs {
        total_payout: current.total_payout,
        revenue_growth_30d,
        retention_rate: current.retention_rate,
        health: current.health,
    });

    DerivedMetricRow {
        calculated_at,
        template_id: current.template_id.clone(),
        template_name: current.template_name.clone(),
        revenue_growth_24h: growth(Horizon::Day),
        revenue_growth_7d: growth(Horizon::Week),
        revenue_growth_30d,
        active_projects_change_24h: active_change(Horizon::Day),
        active_projects_change_7d: active_change(Horizon::Week),
        active_projects_change_30d: active_change(Horizon::Month),
        avg_daily_revenue_7d: avg_daily(Horizon::Week),
        avg_daily_revenue_30d: avg_daily(Horizon::Month),
        profitability_score,
    }
}

async fn insert_derived(conn: &mut SqliteConnection, row: &DerivedMetricRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO template_metrics_derived (
            calculated_at, template_id, template_name,
            revenue_growth_24h, revenue_growth_7d, revenue_growth_30d,
            active_projects_change_24h, active_projects_change_7d, active_projects_change_30d,
            avg_daily_revenue_7d, avg_daily_revenue_30d,
            profitability_score
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(row.calculated_at)
    .bind(&row.template_id)
    .bind(&row.template_name)
    .bind(row.revenue_growth_24h)
    .bind(row.revenue_growth_7d)
    .bind(row.revenue_growth_30d)
    .bind(row.active_projects_change_24h)
    .bind(row.active_projects_change_7d)
    .bind(row.active_projects_change_30d)
    .bind(row.avg_daily_revenue_7d)
    .bind(row.avg_daily_revenue_30d)
    .bind(row.profitability_score)
    .execute(conn)
    .await?;
    Ok(())
}
