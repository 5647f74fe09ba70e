use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::{EarningsYearRow, YearlyGoalRow};
use crate::error::Result;
use crate::scorer::ratios::round2;

/// Projected/goal ratios separating the three pace states.
/// Below `behind_below` is Behind, at or above `ahead_at` is Ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceThresholds {
    pub behind_below: f64,
    pub ahead_at: f64,
}

impl Default for PaceThresholds {
    fn default() -> Self {
        Self {
            behind_below: 1.0,
            ahead_at: 1.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceStatus {
    Behind,
    OnTrack,
    Ahead,
}

impl PaceStatus {
    pub fn classify(projected: f64, goal: i64, t: &PaceThresholds) -> Self {
        if goal <= 0 {
            return PaceStatus::OnTrack;
        }
        let ratio = projected / goal as f64;
        if ratio < t.behind_below {
            PaceStatus::Behind
        } else if ratio >= t.ahead_at {
            PaceStatus::Ahead
        } else {
            PaceStatus::OnTrack
        }
    }
}

impl std::fmt::Display for PaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaceStatus::Behind => "Behind",
            PaceStatus::OnTrack => "On Track",
            PaceStatus::Ahead => "Ahead",
        };
        write!(f, "{s}")
    }
}

/// Year-to-date standing against the yearly goal. Money is cents.
#[derive(Debug, Clone, PartialEq)]
pub struct YtdProgress {
    pub year: i32,
    pub ytd_earnings: i64,
    pub goal_amount: i64,
    pub progress_pct: f64,
    pub remaining_to_goal: i64,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    pub year_completion_pct: f64,
    pub avg_daily_earnings: f64,
    pub projected_year_end: f64,
    pub required_daily_avg: f64,
    pub pace: PaceStatus,
    pub last_updated: DateTime<Utc>,
    pub goal_notes: Option<String>,
}

pub struct GoalTracker {
    pool: SqlitePool,
    pace: PaceThresholds,
}

impl GoalTracker {
    pub fn new(pool: SqlitePool, pace: PaceThresholds) -> Self {
        Self { pool, pace }
    }

    pub async fn set_goal(
        &self,
        year: i32,
        amount_cents: i64,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<YearlyGoalRow> {
        let now_ms = now.timestamp_millis();
        sqlx::query(
            r#"
            INSERT INTO yearly_goals (year, goal_amount, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(year) DO UPDATE SET
                goal_amount = excluded.goal_amount,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(year)
        .bind(amount_cents)
        .bind(notes)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        info!(year, goal_amount = amount_cents, "Yearly goal saved");

        let goal: YearlyGoalRow = sqlx::query_as(
            "SELECT year, goal_amount, notes, created_at, updated_at FROM yearly_goals WHERE year = ?",
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(goal)
    }

    pub async fn goal(&self, year: i32) -> Result<Option<YearlyGoalRow>> {
        let goal: Option<YearlyGoalRow> = sqlx::query_as(
            "SELECT year, goal_amount, notes, created_at, updated_at FROM yearly_goals WHERE year = ?",
        )
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(goal)
    }

    /// Newest year first.
    pub async fn list_goals(&self) -> Result<Vec<YearlyGoalRow>> {
        let goals: Vec<YearlyGoalRow> = sqlx::query_as(
            "SELECT year, goal_amount, notes, created_at, updated_at FROM yearly_goals ORDER BY year DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(goals)
    }

    /// `None` until at least one earnings snapshot exists for `year`.
    pub async fn progress(&self, year: i32, as_of: DateTime<Utc>) -> Result<Option<YtdProgress>> {
        let rows: Vec<EarningsYearRow> = sqlx::query_as(
            r#"
            SELECT year, first_collected_at, last_collected_at, snapshot_count,
                   opening_lifetime_earnings, closing_lifetime_earnings
            FROM earnings_by_year
            WHERE year IN (?, ?)
            "#,
        )
        .bind(year)
        .bind(year - 1)
        .fetch_all(&self.pool)
        .await?;

        let Some(current) = rows.iter().find(|r| r.year == i64::from(year)) else {
            return Ok(None);
        };
        let previous = rows.iter().find(|r| r.year == i64::from(year) - 1);
        debug!(
            year,
            snapshots = current.snapshot_count,
            first_collected_at = current.first_collected_at,
            baseline_from_previous_year = previous.is_some(),
            "Computing YTD progress"
        );

        let goal = self.goal(year).await?;
        let last_updated = DateTime::from_timestamp_millis(current.last_collected_at).unwrap_or(as_of);

        Ok(Some(compute_progress(
            year,
            ytd_earnings(current, previous),
            goal.as_ref(),
            as_of,
            last_updated,
            &self.pace,
        )))
    }
}

/// Earnings accrued in the year: closing lifetime total minus the baseline,
/// which is the previous year's closing total when tracked, otherwise this
/// year's first snapshot.
pub fn ytd_earnings(current: &EarningsYearRow, previous: Option<&EarningsYearRow>) -> i64 {
    let baseline = previous
        .map(|p| p.closing_lifetime_earnings)
        .unwrap_or(current.opening_lifetime_earnings);
    current.closing_lifetime_earnings - baseline
}

pub fn days_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .map(|d| d.ordinal())
        .unwrap_or(365)
}

pub fn compute_progress(
    year: i32,
    ytd_earnings: i64,
    goal: Option<&YearlyGoalRow>,
    as_of: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    thresholds: &PaceThresholds,
) -> YtdProgress {
    let total_days = days_in_year(year);
    let days_elapsed = match as_of.year().cmp(&year) {
        std::cmp::Ordering::Less => 0,
        std::cmp::Ordering::Equal => as_of.ordinal(),
        std::cmp::Ordering::Greater => total_days,
    };
    let days_remaining = total_days - days_elapsed;

    let goal_amount = goal.map_or(0, |g| g.goal_amount);
    let remaining_to_goal = (goal_amount - ytd_earnings).max(0);

    let avg_daily_earnings = if days_elapsed > 0 {
        ytd_earnings as f64 / f64::from(days_elapsed)
    } else {
        0.0
    };
    let projected_year_end = avg_daily_earnings * f64::from(total_days);
    let required_daily_avg = if days_remaining > 0 {
        remaining_to_goal as f64 / f64::from(days_remaining)
    } else {
        0.0
    };
    let progress_pct = if goal_amount > 0 {
        round2(ytd_earnings as f64 / goal_amount as f64 * 100.0)
    } else {
        0.0
    };

    YtdProgress {
        year,
        ytd_earnings,
        goal_amount,
        progress_pct,
        remaining_to_goal,
        days_elapsed,
        days_remaining,
        year_completion_pct: round2(f64::from(days_elapsed) / f64::from(total_days) * 100.0),
        avg_daily_earnings,
        projected_year_end,
        required_daily_avg,
        pace: PaceStatus::classify(projected_year_end, goal_amount, thresholds),
        last_updated,
        goal_notes: goal.and_then(|g| g.notes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{schema, test_pool, SnapshotWriter};
    use crate::types::EarningsRecord;
    use chrono::TimeZone;

    fn goal(amount: i64) -> YearlyGoalRow {
        YearlyGoalRow {
            year: 2025,
            goal_amount: amount,
            notes: Some("stretch".to_string()),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    async fn tracker() -> (GoalTracker, SnapshotWriter) {
        let pool = test_pool().await;
        schema::bootstrap(&pool).await.unwrap();
        (
            GoalTracker::new(pool.clone(), PaceThresholds::default()),
            SnapshotWriter::new(pool),
        )
    }

    async fn earnings(writer: &SnapshotWriter, lifetime: i64, when: DateTime<Utc>) {
        let record = EarningsRecord {
            lifetime_earnings: lifetime,
            ..Default::default()
        };
        writer.write_earnings_snapshot(&record, when).await.unwrap();
    }

    #[test]
    fn twenty_percent_of_goal() {
        let p = compute_progress(2025, 10_000, Some(&goal(50_000)), at(2025, 6, 1), at(2025, 6, 1), &PaceThresholds::default());
        assert_eq!(p.progress_pct, 20.0);
        assert_eq!(p.remaining_to_goal, 40_000);
        assert_eq!(p.goal_notes.as_deref(), Some("stretch"));
    }

    #[test]
    fn day_counts_follow_calendar() {
        // 2024 is a leap year; Mar 1 is day 61.
        let p = compute_progress(2024, 6_100, None, at(2024, 3, 1), at(2024, 3, 1), &PaceThresholds::default());
        assert_eq!(p.days_elapsed, 61);
        assert_eq!(p.days_remaining, 366 - 61);
        assert_eq!(p.avg_daily_earnings, 100.0);
        assert_eq!(p.projected_year_end, 36_600.0);
        assert_eq!(p.progress_pct, 0.0);
        assert_eq!(p.pace, PaceStatus::OnTrack);
    }

    #[test]
    fn past_year_is_fully_elapsed() {
        let p = compute_progress(2024, 1_000, Some(&goal(2_000)), at(2025, 2, 1), at(2024, 12, 31), &PaceThresholds::default());
        assert_eq!(p.days_elapsed, 366);
        assert_eq!(p.days_remaining, 0);
        assert_eq!(p.required_daily_avg, 0.0);
        assert_eq!(p.year_completion_pct, 100.0);
    }

    #[test]
    fn pace_uses_thresholds() {
        let t = PaceThresholds::default();
        assert_eq!(PaceStatus::classify(90.0, 100, &t), PaceStatus::Behind);
        assert_eq!(PaceStatus::classify(100.0, 100, &t), PaceStatus::OnTrack);
        assert_eq!(PaceStatus::classify(109.0, 100, &t), PaceStatus::OnTrack);
        assert_eq!(PaceStatus::classify(110.0, 100, &t), PaceStatus::Ahead);

        let lenient = PaceThresholds {
            behind_below: 0.8,
            ahead_at: 1.5,
        };
        assert_eq!(PaceStatus::classify(90.0, 100, &lenient), PaceStatus::OnTrack);
        assert_eq!(PaceStatus::classify(140.0, 100, &lenient), PaceStatus::OnTrack);
    }

    #[tokio::test]
    async fn goal_upsert_keeps_one_row_per_year() {
        let (tracker, _) = tracker().await;
        tracker.set_goal(2025, 5_000_000, None, at(2025, 1, 1)).await.unwrap();
        let updated = tracker
            .set_goal(2025, 7_500_000, Some("Q2 launch"), at(2025, 3, 1))
            .await
            .unwrap();

        assert_eq!(updated.goal_amount, 7_500_000);
        assert_eq!(updated.notes.as_deref(), Some("Q2 launch"));
        assert_eq!(updated.created_at, at(2025, 1, 1).timestamp_millis());
        assert_eq!(updated.updated_at, at(2025, 3, 1).timestamp_millis());

        tracker.set_goal(2026, 9_000_000, None, at(2025, 3, 1)).await.unwrap();
        let goals = tracker.list_goals().await.unwrap();
        assert_eq!(goals.iter().map(|g| g.year).collect::<Vec<_>>(), vec![2026, 2025]);
    }

    #[tokio::test]
    async fn no_snapshots_means_no_progress() {
        let (tracker, _) = tracker().await;
        tracker.set_goal(2025, 100, None, at(2025, 1, 1)).await.unwrap();
        assert!(tracker.progress(2025, at(2025, 6, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ytd_measured_from_previous_year_close() {
        let (tracker, writer) = tracker().await;
        earnings(&writer, 40_000, at(2024, 12, 20)).await;
        earnings(&writer, 50_000, at(2025, 1, 10)).await;
        earnings(&writer, 60_000, at(2025, 5, 1)).await;
        tracker.set_goal(2025, 50_000, None, at(2025, 1, 1)).await.unwrap();

        let p = tracker.progress(2025, at(2025, 5, 1)).await.unwrap().unwrap();
        assert_eq!(p.ytd_earnings, 20_000);
        assert_eq!(p.progress_pct, 40.0);
        assert_eq!(p.last_updated, at(2025, 5, 1));
    }

    #[tokio::test]
    async fn first_tracked_year_uses_first_snapshot() {
        let (tracker, writer) = tracker().await;
        earnings(&writer, 50_000, at(2025, 2, 1)).await;
        earnings(&writer, 60_000, at(2025, 4, 1)).await;
        tracker.set_goal(2025, 50_000, None, at(2025, 1, 1)).await.unwrap();

        let p = tracker.progress(2025, at(2025, 4, 1)).await.unwrap().unwrap();
        assert_eq!(p.ytd_earnings, 10_000);
        assert_eq!(p.progress_pct, 20.0);
    }
}
