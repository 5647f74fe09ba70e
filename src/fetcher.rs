use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::FetchError;
use crate::types::{
    EarningsData, EarningsRecord, GraphQlRequest, GraphQlResponse, TemplateRecord, Viewer,
    ViewerData, WorkspaceTemplatesData,
};

const EARNINGS_QUERY: &str = r#"
query withdrawalData($customerId: String!) {
  earningDetails(customerId: $customerId) {
    lifetimeEarnings
    referralEarningsLifetime
    referralEarnings30d
    templateEarningsLifetime
    templateEarnings30d
    bountyEarningsLifetime
    bountyEarnings30d
    threadEarningsLifetime
    threadEarnings30d
    availableBalance
    lifetimeCashWithdrawals
    lifetimeCreditWithdrawals
  }
}
"#;

const TEMPLATES_QUERY: &str = r#"
query workspaceTemplates($workspaceId: String!) {
  workspaceTemplates(workspaceId: $workspaceId) {
    edges {
      node {
        id
        code
        createdAt
        name
        description
        image
        category
        tags
        languages
        status
        isApproved
        isVerified
        health
        projects
        activeProjects
        recentProjects
        totalPayout
      }
    }
  }
}
"#;

const VIEWER_QUERY: &str = "query { me { id name email } }";

/// Longest slice of an error body kept in `FetchError::Status`.
const ERROR_BODY_MAX: usize = 500;

/// Where the collector reads its two inputs from. The production source is
/// [`RailwayClient`]; tests drive the pipeline with an in-memory source.
#[allow(async_fn_in_trait)]
pub trait MetricsSource {
    async fn fetch_earnings(&self, customer_id: &str) -> Result<EarningsRecord, FetchError>;

    async fn fetch_templates(&self, workspace_id: &str) -> Result<Vec<TemplateRecord>, FetchError>;
}

/// Bearer-authenticated client for the Railway GraphQL endpoint.
/// One POST per call, no retries.
pub struct RailwayClient {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl RailwayClient {
    pub fn new(cfg: &Config, api_token: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: cfg.api_url.clone(),
            api_token: api_token.to_string(),
        })
    }

    /// Identity of the token's owner. Only used to check credentials.
    pub async fn fetch_viewer(&self) -> Result<Viewer, FetchError> {
        let data: ViewerData = self.execute(VIEWER_QUERY, json!({}), None).await?;
        data.me.ok_or(FetchError::MissingData("me"))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        operation_name: Option<&str>,
    ) -> Result<T, FetchError> {
        let body = GraphQlRequest {
            query,
            variables,
            operation_name,
        };

        debug!(operation = operation_name.unwrap_or("anonymous"), "GraphQL request");

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        check_status(status, &text)?;

        let envelope: GraphQlResponse<T> = serde_json::from_str(&text)?;
        unwrap_envelope(envelope)
    }
}

impl MetricsSource for RailwayClient {
    async fn fetch_earnings(&self, customer_id: &str) -> Result<EarningsRecord, FetchError> {
        let data: EarningsData = self
            .execute(
                EARNINGS_QUERY,
                json!({ "customerId": customer_id }),
                Some("withdrawalData"),
            )
            .await?;
        data.earning_details
            .ok_or(FetchError::MissingData("earningDetails"))
    }

    async fn fetch_templates(&self, workspace_id: &str) -> Result<Vec<TemplateRecord>, FetchError> {
        let data: WorkspaceTemplatesData = self
            .execute(
                TEMPLATES_QUERY,
                json!({ "workspaceId": workspace_id }),
                Some("workspaceTemplates"),
            )
            .await?;
        templates_from(data)
    }
}

/// Any 4xx/5xx is a failed request; the body is kept, truncated, for the log.
pub fn check_status(status: StatusCode, body: &str) -> Result<(), FetchError> {
    if !(status.is_client_error() || status.is_server_error()) {
        return Ok(());
    }
    error!(status = status.as_u16(), "GraphQL request rejected");
    Err(FetchError::Status {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_MAX).collect(),
    })
}

/// A non-empty `errors` list wins over any partial `data`.
pub fn unwrap_envelope<T>(envelope: GraphQlResponse<T>) -> Result<T, FetchError> {
    if !envelope.errors.is_empty() {
        let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(FetchError::Api(messages.join("; ")));
    }
    envelope.data.ok_or(FetchError::MissingData("data"))
}

/// An empty list is reported as a failed fetch: there is nothing to snapshot.
pub fn templates_from(data: WorkspaceTemplatesData) -> Result<Vec<TemplateRecord>, FetchError> {
    let templates: Vec<TemplateRecord> = data
        .workspace_templates
        .ok_or(FetchError::MissingData("workspaceTemplates"))?
        .edges
        .into_iter()
        .map(|edge| edge.node)
        .collect();

    if templates.is_empty() {
        return Err(FetchError::MissingData("templates (list was empty)"));
    }
    Ok(templates)
}
