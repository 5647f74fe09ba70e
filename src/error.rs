use thiserror::Error;

/// Failure talking to the upstream GraphQL API. Every variant is fatal to a
/// collection run; nothing is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GraphQL errors: {0}")]
    Api(String),

    #[error("Response missing {0}")]
    MissingData(&'static str),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Derived metrics error: {0}")]
    DerivedMetrics(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
