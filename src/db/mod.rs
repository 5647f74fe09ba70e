pub mod models;
pub mod schema;
pub mod writer;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::Result;

pub use writer::SnapshotWriter;

/// Open the metrics database, creating the file if needed. A single
/// connection is enough: every command runs its steps one after another.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // One connection that never recycles, so the in-memory database survives the test.
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

#[cfg(test)]
pub(crate) fn test_template(
    id: &str,
    projects: i64,
    active: i64,
    recent: i64,
    payout: i64,
) -> crate::types::TemplateRecord {
    crate::types::TemplateRecord {
        id: id.to_string(),
        name: Some(format!("Template {id}")),
        tags: vec!["database".to_string()],
        projects: Some(projects),
        active_projects: Some(active),
        recent_projects: Some(recent),
        total_payout: Some(payout),
        health: Some(80.0),
        ..Default::default()
    }
}
