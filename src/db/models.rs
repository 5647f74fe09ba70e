/// Row types for the SQLite schema in migrations/0001_metrics_schema.sql.
/// Timestamps are Unix milliseconds, money is cents.

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TemplateSnapshotRow {
    pub collected_at: i64,
    pub template_id: String,
    pub template_code: Option<String>,
    pub template_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// JSON array
    pub tags: String,
    /// JSON array
    pub languages: String,
    pub image: Option<String>,
    pub status: Option<String>,
    pub is_approved: Option<bool>,
    pub is_verified: Option<bool>,
    pub health: Option<f64>,
    pub projects: i64,
    pub active_projects: i64,
    pub recent_projects: i64,
    pub total_payout: i64,
    pub retention_rate: f64,
    pub revenue_per_active: i64,
    pub growth_momentum: f64,
}

/// The two counters the trend calculator compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct PriorSnapshot {
    pub collected_at: i64,
    pub total_payout: i64,
    pub active_projects: i64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DerivedMetricRow {
    pub calculated_at: i64,
    pub template_id: String,
    pub template_name: Option<String>,
    pub revenue_growth_24h: i64,
    pub revenue_growth_7d: i64,
    pub revenue_growth_30d: i64,
    pub active_projects_change_24h: i64,
    pub active_projects_change_7d: i64,
    pub active_projects_change_30d: i64,
    pub avg_daily_revenue_7d: f64,
    pub avg_daily_revenue_30d: f64,
    pub profitability_score: f64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct YearlyGoalRow {
    pub year: i64,
    pub goal_amount: i64,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row of the `earnings_by_year` view.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EarningsYearRow {
    pub year: i64,
    pub first_collected_at: i64,
    pub last_collected_at: i64,
    pub snapshot_count: i64,
    pub opening_lifetime_earnings: i64,
    pub closing_lifetime_earnings: i64,
}
