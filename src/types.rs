use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GraphQL envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
    pub operation_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Earnings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsData {
    pub earning_details: Option<EarningsRecord>,
}

/// Account-wide earnings totals. All amounts are cents; fields the API
/// leaves null are read as 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EarningsRecord {
    #[serde(deserialize_with = "null_as_zero")]
    pub lifetime_earnings: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub referral_earnings_lifetime: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub referral_earnings_30d: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub template_earnings_lifetime: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub template_earnings_30d: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub bounty_earnings_lifetime: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub bounty_earnings_30d: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub thread_earnings_lifetime: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub thread_earnings_30d: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub available_balance: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub lifetime_cash_withdrawals: i64,
    #[serde(deserialize_with = "null_as_zero")]
    pub lifetime_credit_withdrawals: i64,
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceTemplatesData {
    pub workspace_templates: Option<TemplateConnection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateConnection {
    #[serde(default)]
    pub edges: Vec<TemplateEdge>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateEdge {
    pub node: TemplateRecord,
}

/// One template as reported by the API. Counters may be null upstream and
/// are normalized to 0 before any ratio is computed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub code: Option<String>,
    pub created_at: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub languages: Vec<String>,
    pub status: Option<String>,
    pub is_approved: Option<bool>,
    pub is_verified: Option<bool>,
    pub health: Option<f64>,
    pub projects: Option<i64>,
    pub active_projects: Option<i64>,
    pub recent_projects: Option<i64>,
    pub total_payout: Option<i64>,
}

// ---------------------------------------------------------------------------
// Viewer (credential check)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ViewerData {
    pub me: Option<Viewer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

fn null_as_zero<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(d)?.unwrap_or(0))
}

fn null_as_empty<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earnings_nulls_and_missing_fields_read_as_zero() {
        let raw = r#"{"earningDetails":{"lifetimeEarnings":125000,"templateEarnings30d":null,"availableBalance":4200}}"#;
        let data: EarningsData = serde_json::from_str(raw).unwrap();
        let e = data.earning_details.unwrap();
        assert_eq!(e.lifetime_earnings, 125_000);
        assert_eq!(e.template_earnings_30d, 0);
        assert_eq!(e.available_balance, 4200);
        assert_eq!(e.bounty_earnings_lifetime, 0);
    }

    #[test]
    fn template_edges_unwrap_to_nodes() {
        let raw = r#"{"workspaceTemplates":{"edges":[
            {"node":{"id":"t1","code":"pg","name":"Postgres","tags":["db"],"languages":null,
                     "isApproved":true,"health":87.5,"projects":10,"activeProjects":4,
                     "recentProjects":null,"totalPayout":1999}}
        ]}}"#;
        let data: WorkspaceTemplatesData = serde_json::from_str(raw).unwrap();
        let edges = data.workspace_templates.unwrap().edges;
        assert_eq!(edges.len(), 1);
        let t = &edges[0].node;
        assert_eq!(t.id, "t1");
        assert_eq!(t.tags, vec!["db".to_string()]);
        assert!(t.languages.is_empty());
        assert_eq!(t.is_approved, Some(true));
        assert_eq!(t.recent_projects, None);
        assert_eq!(t.total_payout, Some(1999));
    }

    #[test]
    fn envelope_errors_default_to_empty() {
        let raw = r#"{"data":{"me":{"id":"u1","name":"Ada","email":null}}}"#;
        let resp: GraphQlResponse<ViewerData> = serde_json::from_str(raw).unwrap();
        assert!(resp.errors.is_empty());
        assert_eq!(resp.data.unwrap().me.unwrap().id, "u1");
    }
}
