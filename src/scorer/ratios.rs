//! Per-template ratios computed at snapshot time from the raw counters.
//! Zero denominators yield 0, never NaN or a division error.

/// Active share of all projects, percent, 2 dp.
pub fn retention_rate(projects: i64, active_projects: i64) -> f64 {
    if projects <= 0 {
        return 0.0;
    }
    round2(active_projects as f64 / projects as f64 * 100.0)
}

/// Payout per active project in whole cents (floor division).
pub fn revenue_per_active(total_payout: i64, active_projects: i64) -> i64 {
    if active_projects <= 0 {
        return 0;
    }
    total_payout.div_euclid(active_projects)
}

/// Recently created projects relative to active ones, percent, 2 dp.
pub fn growth_momentum(recent_projects: i64, active_projects: i64) -> f64 {
    if active_projects <= 0 {
        return 0.0;
    }
    round2(recent_projects as f64 / active_projects as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
