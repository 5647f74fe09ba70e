use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::config::SNAPSHOT_INSERT_CHUNK;
use crate::db::models::TemplateSnapshotRow;
use crate::error::Result;
use crate::scorer::ratios::{growth_momentum, retention_rate, revenue_per_active};
use crate::types::{EarningsRecord, TemplateRecord};

/// Persists one collection run's raw snapshots. Each call is a single
/// transaction: every row of the step commits or none does.
pub struct SnapshotWriter {
    pool: SqlitePool,
}

impl SnapshotWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn write_earnings_snapshot(
        &self,
        e: &EarningsRecord,
        collected_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO earnings_snapshots (
                collected_at,
                lifetime_earnings, lifetime_cash_withdrawals, lifetime_credit_withdrawals,
                available_balance,
                template_earnings_lifetime, template_earnings_30d,
                referral_earnings_lifetime, referral_earnings_30d,
                bounty_earnings_lifetime, bounty_earnings_30d,
                thread_earnings_lifetime, thread_earnings_30d
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(collected_at.timestamp_millis())
        .bind(e.lifetime_earnings)
        .bind(e.lifetime_cash_withdrawals)
        .bind(e.lifetime_credit_withdrawals)
        .bind(e.available_balance)
        .bind(e.template_earnings_lifetime)
        .bind(e.template_earnings_30d)
        .bind(e.referral_earnings_lifetime)
        .bind(e.referral_earnings_30d)
        .bind(e.bounty_earnings_lifetime)
        .bind(e.bounty_earnings_30d)
        .bind(e.thread_earnings_lifetime)
        .bind(e.thread_earnings_30d)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(lifetime_earnings = e.lifetime_earnings, "Earnings snapshot inserted");
        Ok(())
    }

    /// Bulk insert with `ON CONFLICT DO NOTHING` on (collected_at, template_id):
    /// repeating a run with the same timestamp adds no rows.
    /// Returns how many rows were actually inserted.
    pub async fn write_template_snapshots(
        &self,
        templates: &[TemplateRecord],
        collected_at: DateTime<Utc>,
    ) -> Result<u64> {
        let ts = collected_at.timestamp_millis();
        let rows = templates
            .iter()
            .map(|t| snapshot_row(t, ts))
            .collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(SNAPSHOT_INSERT_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO template_snapshots (
                    collected_at, template_id, template_code, template_name, description,
                    category, tags, languages, image, status, is_approved, is_verified,
                    health, projects, active_projects, recent_projects, total_payout,
                    retention_rate, revenue_per_active, growth_momentum
                ) ",
            );
            qb.push_values(chunk, |mut b, r| {
                b.push_bind(r.collected_at)
                    .push_bind(r.template_id.clone())
                    .push_bind(r.template_code.clone())
                    .push_bind(r.template_name.clone())
                    .push_bind(r.description.clone())
                    .push_bind(r.category.clone())
                    .push_bind(r.tags.clone())
                    .push_bind(r.languages.clone())
                    .push_bind(r.image.clone())
                    .push_bind(r.status.clone())
                    .push_bind(r.is_approved)
                    .push_bind(r.is_verified)
                    .push_bind(r.health)
                    .push_bind(r.projects)
                    .push_bind(r.active_projects)
                    .push_bind(r.recent_projects)
                    .push_bind(r.total_payout)
                    .push_bind(r.retention_rate)
                    .push_bind(r.revenue_per_active)
                    .push_bind(r.growth_momentum);
            });
            qb.push(" ON CONFLICT (collected_at, template_id) DO NOTHING");

            inserted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        info!(
            inserted,
            skipped = rows.len() as u64 - inserted,
            "Template snapshots stored"
        );
        Ok(inserted)
    }
}

/// Normalize one API record into a snapshot row: null counters become 0,
/// list metadata is serialized to JSON, ratios are computed.
pub fn snapshot_row(t: &TemplateRecord, collected_at: i64) -> Result<TemplateSnapshotRow> {
    let projects = t.projects.unwrap_or(0);
    let active_projects = t.active_projects.unwrap_or(0);
    let recent_projects = t.recent_projects.unwrap_or(0);
    let total_payout = t.total_payout.unwrap_or(0);

    Ok(TemplateSnapshotRow {
        collected_at,
        template_id: t.id.clone(),
        template_code: t.code.clone(),
        template_name: t.name.clone(),
        description: t.description.clone(),
        category: t.category.clone(),
        tags: serde_json::to_string(&t.tags)?,
        languages: serde_json::to_string(&t.languages)?,
        image: t.image.clone(),
        status: t.status.clone(),
        is_approved: t.is_approved,
        is_verified: t.is_verified,
        health: t.health,
        projects,
        active_projects,
        recent_projects,
        total_payout,
        retention_rate: retention_rate(projects, active_projects),
        revenue_per_active: revenue_per_active(total_payout, active_projects),
        growth_momentum: growth_momentum(recent_projects, active_projects),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{schema, test_pool, test_template as template};
    use chrono::TimeZone;

    async fn writer() -> (SnapshotWriter, SqlitePool) {
        let pool = test_pool().await;
        schema::bootstrap(&pool).await.unwrap();
        (SnapshotWriter::new(pool.clone()), pool)
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn null_counters_default_to_zero() {
        let t = TemplateRecord {
            id: "t".to_string(),
            ..Default::default()
        };
        let row = snapshot_row(&t, 1).unwrap();
        assert_eq!(row.projects, 0);
        assert_eq!(row.total_payout, 0);
        assert_eq!(row.retention_rate, 0.0);
        assert_eq!(row.revenue_per_active, 0);
        assert_eq!(row.growth_momentum, 0.0);
        assert_eq!(row.tags, "[]");
    }

    #[test]
    fn ratios_computed_at_write_time() {
        let row = snapshot_row(&template("t", 8, 4, 1, 1001), 1).unwrap();
        assert_eq!(row.retention_rate, 50.0);
        assert_eq!(row.revenue_per_active, 250);
        assert_eq!(row.growth_momentum, 25.0);
        assert_eq!(row.tags, r#"["database"]"#);
    }

    #[tokio::test]
    async fn earnings_snapshot_round_trips() {
        let (writer, pool) = writer().await;
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = EarningsRecord {
            lifetime_earnings: 123_456,
            template_earnings_30d: 9_000,
            ..Default::default()
        };

        writer.write_earnings_snapshot(&record, at).await.unwrap();

        let (ts, lifetime, t30): (i64, i64, i64) = sqlx::query_as(
            "SELECT collected_at, lifetime_earnings, template_earnings_30d FROM earnings_snapshots",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(ts, at.timestamp_millis());
        assert_eq!(lifetime, 123_456);
        assert_eq!(t30, 9_000);
    }

    #[tokio::test]
    async fn rewriting_same_timestamp_is_idempotent() {
        let (writer, pool) = writer().await;
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let templates = vec![template("a", 10, 5, 1, 500), template("b", 0, 0, 0, 0)];

        assert_eq!(writer.write_template_snapshots(&templates, at).await.unwrap(), 2);
        assert_eq!(count(&pool, "template_snapshots").await, 2);

        assert_eq!(writer.write_template_snapshots(&templates, at).await.unwrap(), 0);
        assert_eq!(count(&pool, "template_snapshots").await, 2);
    }

    #[tokio::test]
    async fn later_run_adds_new_rows() {
        let (writer, pool) = writer().await;
        let first = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let templates = vec![template("a", 10, 5, 1, 500)];

        writer.write_template_snapshots(&templates, first).await.unwrap();
        writer.write_template_snapshots(&templates, second).await.unwrap();
        assert_eq!(count(&pool, "template_snapshots").await, 2);
    }

    #[tokio::test]
    async fn zero_denominators_persist_as_zero() {
        let (writer, pool) = writer().await;
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        writer
            .write_template_snapshots(&[template("z", 0, 0, 3, 700)], at)
            .await
            .unwrap();

        let row: TemplateSnapshotRow = sqlx::query_as(
            r#"
            SELECT collected_at, template_id, template_code, template_name, description,
                   category, tags, languages, image, status, is_approved, is_verified,
                   health, projects, active_projects, recent_projects, total_payout,
                   retention_rate, revenue_per_active, growth_momentum
            FROM template_snapshots WHERE template_id = 'z'
            "#,
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.retention_rate, 0.0);
        assert_eq!(row.revenue_per_active, 0);
        assert_eq!(row.growth_momentum, 0.0);
        assert_eq!(row.total_payout, 700);
    }
}
