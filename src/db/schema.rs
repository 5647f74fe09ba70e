use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::{AppError, Result};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Tables whose joint presence means the schema has already been created.
pub const CORE_TABLES: [&str; 3] = [
    "earnings_snapshots",
    "template_snapshots",
    "template_metrics_derived",
];

/// Schema statements, all `IF NOT EXISTS`. Reapplied when a core table has
/// gone missing after the migration was already recorded.
const SCHEMA_SQL: &str = include_str!("../../migrations/0001_metrics_schema.sql");

/// Create the schema unless all core tables already exist. Safe to call on
/// every run.
pub async fn bootstrap(pool: &SqlitePool) -> Result<bool> {
    if core_tables_present(pool).await? {
        info!("Schema present, skipping bootstrap");
        return Ok(false);
    }
    MIGRATOR.run(pool).await?;

    if !core_tables_present(pool).await? {
        warn!("Core tables missing with migrations already applied, recreating schema");
        sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    }
    if !core_tables_present(pool).await? {
        return Err(AppError::Persistence(sqlx::Error::Protocol(
            "core tables still missing after bootstrap".to_string(),
        )));
    }

    info!("Schema created");
    Ok(true)
}

pub async fn core_tables_present(pool: &SqlitePool) -> Result<bool> {
    let present: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM sqlite_master
        WHERE type = 'table' AND name IN (?, ?, ?)
        "#,
    )
    .bind(CORE_TABLES[0])
    .bind(CORE_TABLES[1])
    .bind(CORE_TABLES[2])
    .fetch_one(pool)
    .await?;

    Ok(present as usize == CORE_TABLES.len())
}

/// Names of user tables and views, for the `setup` report.
pub async fn list_objects(pool: &SqlitePool) -> Result<(Vec<String>, Vec<String>)> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT type, name FROM sqlite_master
        WHERE type IN ('table', 'view')
          AND name NOT LIKE 'sqlite_%'
          AND name NOT LIKE '_sqlx_%'
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let (tables, views): (Vec<_>, Vec<_>) = rows.into_iter().partition(|(kind, _)| kind == "table");
    Ok((
        tables.into_iter().map(|(_, name)| name).collect(),
        views.into_iter().map(|(_, name)| name).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn bootstrap_creates_then_skips() {
        let pool = test_pool().await;
        assert!(!core_tables_present(&pool).await.unwrap());

        assert!(bootstrap(&pool).await.unwrap());
        assert!(core_tables_present(&pool).await.unwrap());

        assert!(!bootstrap(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn partial_schema_is_recreated() {
        let pool = test_pool().await;
        bootstrap(&pool).await.unwrap();
        sqlx::query("DROP TABLE template_metrics_derived")
            .execute(&pool)
            .await
            .unwrap();
        assert!(!core_tables_present(&pool).await.unwrap());

        assert!(bootstrap(&pool).await.unwrap());
        assert!(core_tables_present(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn lists_tables_and_view() {
        let pool = test_pool().await;
        bootstrap(&pool).await.unwrap();

        let (tables, views) = list_objects(&pool).await.unwrap();
        for name in CORE_TABLES.iter().chain(["yearly_goals"].iter()) {
            assert!(tables.iter().any(|t| t == name), "missing table {name}");
        }
        assert_eq!(views, vec!["earnings_by_year".to_string()]);
    }
}
