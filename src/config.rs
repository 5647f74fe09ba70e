use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::goals::PaceThresholds;
use crate::scorer::ScoreWeights;

pub const RAILWAY_API_URL: &str = "https://backboard.railway.com/graphql/internal";

/// Per-request timeout for GraphQL calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Rows per INSERT statement in the template snapshot bulk insert.
/// 20 columns × 500 rows stays well under SQLite's bind parameter limit.
pub const SNAPSHOT_INSERT_CHUNK: usize = 500;

/// Settings shared by every command. Built once in `main` and passed down.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub api_url: String,
    pub http_timeout_secs: u64,
    /// Projected/goal ratios that split Behind / On Track / Ahead
    /// (PACE_BEHIND_BELOW, PACE_AHEAD_AT)
    pub pace: PaceThresholds,
    /// Weights of the default profitability score (SCORE_WEIGHT_*)
    pub score_weights: ScoreWeights,
}

/// Upstream identifiers needed only by the commands that talk to the API.
#[derive(Clone)]
pub struct Credentials {
    pub api_token: String,
    pub customer_id: String,
    pub workspace_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<redacted>")
            .field("customer_id", &self.customer_id)
            .field("workspace_id", &self.workspace_id)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = non_empty(&get, "DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL must be set".to_string()))?;

        let defaults = ScoreWeights::default();
        let pace_defaults = PaceThresholds::default();

        let pace = PaceThresholds {
            behind_below: parse_or(&get, "PACE_BEHIND_BELOW", pace_defaults.behind_below)?,
            ahead_at: parse_or(&get, "PACE_AHEAD_AT", pace_defaults.ahead_at)?,
        };
        if pace.ahead_at < pace.behind_below {
            return Err(AppError::Config(
                "PACE_AHEAD_AT must not be lower than PACE_BEHIND_BELOW".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_url: get("RAILWAY_API_URL").unwrap_or_else(|| RAILWAY_API_URL.to_string()),
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?,
            pace,
            score_weights: ScoreWeights {
                payout: parse_or(&get, "SCORE_WEIGHT_PAYOUT", defaults.payout)?,
                growth: parse_or(&get, "SCORE_WEIGHT_GROWTH", defaults.growth)?,
                retention: parse_or(&get, "SCORE_WEIGHT_RETENTION", defaults.retention)?,
                health: parse_or(&get, "SCORE_WEIGHT_HEALTH", defaults.health)?,
            },
        })
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reports every missing variable at once rather than the first one.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_token = non_empty(&get, "RAILWAY_API_TOKEN");
        let customer_id = non_empty(&get, "RAILWAY_CUSTOMER_ID");
        let workspace_id = non_empty(&get, "RAILWAY_WORKSPACE_ID");

        match (api_token, customer_id, workspace_id) {
            (Some(api_token), Some(customer_id), Some(workspace_id)) => Ok(Self {
                api_token,
                customer_id,
                workspace_id,
            }),
            (api_token, customer_id, workspace_id) => {
                let missing: Vec<&str> = [
                    ("RAILWAY_API_TOKEN", api_token.is_none()),
                    ("RAILWAY_CUSTOMER_ID", customer_id.is_none()),
                    ("RAILWAY_WORKSPACE_ID", workspace_id.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, missing)| missing.then_some(name))
                .collect();
                Err(AppError::Config(format!(
                    "Missing required environment variables: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn non_empty(get: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T> {
    match non_empty(get, name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}
