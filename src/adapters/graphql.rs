//! GraphQL clients for the ranking API (corporate listing and details) and
//! the partner API (startup partner lookup).

use crate::domain::model::{Corporate, CorporatePage};
use crate::domain::ports::{CorporateSource, PartnerCounter};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

const GET_CORPORATES: &str = "query GetCorporates($filters: CorporateFilters, $page: Int) { corporates(filters: $filters, page: $page) { rows { id name } count } }";

const GET_CORPORATE_DETAILS: &str = "query GetCorporateDetails($id: String) { corporate(id: $id) { name description logo_url hq_city hq_country website_url linkedin_url twitter_url startup_partners_count startup_partners { company_name logo city website country theme_gd } startup_themes } }";

const GET_STARTUP_PARTNERS: &str = "query GetStartupPartners($companyName: String!) { company(name: $companyName) { startup_partners { company_name } } }";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub operation_name: &'static str,
    pub variables: Value,
    pub query: &'static str,
}

impl GraphQlRequest {
    pub fn corporates_page(page: u32) -> Self {
        Self {
            operation_name: "GetCorporates",
            variables: json!({
                "filters": { "hq_city": [], "industry": [] },
                "page": page,
            }),
            query: GET_CORPORATES,
        }
    }

    pub fn corporate_details(id: &str) -> Self {
        Self {
            operation_name: "GetCorporateDetails",
            variables: json!({ "id": id }),
            query: GET_CORPORATE_DETAILS,
        }
    }

    pub fn startup_partners(company_name: &str) -> Self {
        Self {
            operation_name: "GetStartupPartners",
            variables: json!({ "companyName": company_name }),
            query: GET_STARTUP_PARTNERS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
}

fn join_errors(errors: &[GraphQlErrorEntry]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Thin POST-JSON GraphQL transport over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    client: Client,
    endpoint: String,
}

impl GraphQlClient {
    pub fn new(endpoint: &str, timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent.to_string());
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
        })
    }

    pub async fn execute<T: DeserializeOwned>(&self, request: &GraphQlRequest) -> Result<T> {
        tracing::debug!(
            "POST {} operation={} variables={}",
            self.endpoint,
            request.operation_name,
            request.variables
        );

        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(AppError::UpstreamStatusError {
                operation: request.operation_name.to_string(),
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse<T> = response.json().await?;

        match body.data {
            Some(data) => {
                if !body.errors.is_empty() {
                    tracing::warn!(
                        "⚠️ {} returned partial data with errors: {}",
                        request.operation_name,
                        join_errors(&body.errors)
                    );
                }
                Ok(data)
            }
            None if body.errors.is_empty() => Err(AppError::graphql(
                request.operation_name,
                "response contained no data",
            )),
            None => Err(AppError::graphql(
                request.operation_name,
                join_errors(&body.errors),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CorporatesData {
    corporates: Option<CorporatePage>,
}

#[derive(Debug, Deserialize)]
struct CorporateDetailsData {
    corporate: Option<Corporate>,
}

#[derive(Debug, Deserialize)]
struct StartupPartnersData {
    company: Option<CompanyPartners>,
}

#[derive(Debug, Deserialize)]
struct CompanyPartners {
    #[serde(default)]
    startup_partners: Option<Vec<PartnerName>>,
}

#[derive(Debug, Deserialize)]
struct PartnerName {
    #[serde(default)]
    company_name: Option<String>,
}

/// 排名 API 客戶端：分頁列出企業並查詢詳細資料
#[derive(Debug, Clone)]
pub struct RankingClient {
    graphql: GraphQlClient,
}

impl RankingClient {
    pub fn new(endpoint: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        Ok(Self {
            graphql: GraphQlClient::new(endpoint, timeout, Some(user_agent))?,
        })
    }
}

#[async_trait]
impl CorporateSource for RankingClient {
    async fn fetch_page(&self, page: u32) -> Result<CorporatePage> {
        let request = GraphQlRequest::corporates_page(page);
        let data: CorporatesData = self.graphql.execute(&request).await?;
        data.corporates
            .ok_or_else(|| AppError::graphql(request.operation_name, format!("page {} has no corporates field", page)))
    }

    async fn fetch_details(&self, id: &str) -> Result<Corporate> {
        let request = GraphQlRequest::corporate_details(id);
        let data: CorporateDetailsData = self.graphql.execute(&request).await?;
        data.corporate
            .ok_or_else(|| AppError::graphql(request.operation_name, format!("corporate {} not found", id)))
    }
}

/// 合作夥伴 API 客戶端：計算不重複的新創合作夥伴數量
#[derive(Debug, Clone)]
pub struct PartnerClient {
    graphql: GraphQlClient,
}

impl PartnerClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            graphql: GraphQlClient::new(endpoint, timeout, None)?,
        })
    }

    async fn try_count(&self, company_name: &str) -> Result<u64> {
        let request = GraphQlRequest::startup_partners(company_name);
        let data: StartupPartnersData = self.graphql.execute(&request).await?;

        let Some(company) = data.company else {
            tracing::warn!("⚠️ Partner API has no company named '{}'", company_name);
            return Ok(0);
        };
        let partners = company.startup_partners.unwrap_or_default();

        let distinct: HashSet<&str> = partners
            .iter()
            .filter_map(|p| p.company_name.as_deref())
            .collect();

        Ok(distinct.len() as u64)
    }
}

#[async_trait]
impl PartnerCounter for PartnerClient {
    async fn count_partners(&self, company_name: &str) -> u64 {
        match self.try_count(company_name).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("⚠️ Partner lookup for '{}' failed: {}", company_name, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn ranking(server: &MockServer) -> RankingClient {
        RankingClient::new(&server.url("/graphql"), Duration::from_secs(5), "corp-fetch-test").unwrap()
    }

    fn partners(server: &MockServer) -> PartnerClient {
        PartnerClient::new(&server.url("/graphql"), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_envelope_shape() {
        let request = GraphQlRequest::corporates_page(3);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["operationName"], "GetCorporates");
        assert_eq!(body["variables"]["page"], 3);
        assert_eq!(body["variables"]["filters"]["hq_city"], json!([]));
        assert!(body["query"].as_str().unwrap().contains("corporates(filters: $filters, page: $page)"));
    }

    #[tokio::test]
    async fn test_fetch_page_parses_rows() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql")
                .header("content-type", "application/json")
                .header("user-agent", "corp-fetch-test")
                .json_body_partial(r#"{"operationName": "GetCorporates", "variables": {"page": 1}}"#);
            then.status(200).json_body(json!({
                "data": {"corporates": {"rows": [{"id": "1", "name": "Acme"}, {"id": "2", "name": "Globex"}], "count": 2}}
            }));
        });

        let page = ranking(&server).fetch_page(1).await.unwrap();

        api_mock.assert();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[1].id, "2");
        assert_eq!(page.count, Some(2));
    }

    #[tokio::test]
    async fn test_fetch_page_non_success_status_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(502);
        });

        let err = ranking(&server).fetch_page(1).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamStatusError { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_graphql_errors_without_data_are_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(json!({
                "data": null,
                "errors": [{"message": "Variable $id is invalid"}]
            }));
        });

        let err = ranking(&server).fetch_details("x").await.unwrap_err();
        assert!(err.to_string().contains("Variable $id is invalid"));
    }

    #[tokio::test]
    async fn test_fetch_details_missing_corporate_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(json!({"data": {"corporate": null}}));
        });

        let err = ranking(&server).fetch_details("404").await.unwrap_err();
        assert!(err.to_string().contains("corporate 404 not found"));
    }

    #[tokio::test]
    async fn test_count_partners_counts_distinct_names() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/graphql")
                .json_body_partial(r#"{"operationName": "GetStartupPartners", "variables": {"companyName": "Acme"}}"#);
            then.status(200).json_body(json!({
                "data": {"company": {"startup_partners": [
                    {"company_name": "A"}, {"company_name": "B"}, {"company_name": "A"}, {"company_name": null}
                ]}}
            }));
        });

        let count = partners(&server).count_partners("Acme").await;

        api_mock.assert();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_count_partners_failure_is_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(500);
        });

        assert_eq!(partners(&server).count_partners("Acme").await, 0);
    }

    #[tokio::test]
    async fn test_count_partners_unknown_company_is_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(json!({"data": {"company": null}}));
        });

        let client = partners(&server);
        // company 為 null 不算錯誤，直接回 0
        assert_eq!(client.try_count("Nobody").await.unwrap(), 0);
        assert_eq!(client.count_partners("Nobody").await, 0);
    }

    #[tokio::test]
    async fn test_slow_ranking_api_times_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"data": {"corporates": {"rows": [], "count": 0}}}));
        });
        let client =
            RankingClient::new(&server.url("/graphql"), Duration::from_millis(100), "corp-fetch-test").unwrap();

        let err = client.fetch_page(1).await.unwrap_err();

        assert!(matches!(&err, AppError::ApiError(e) if e.is_timeout()));
        assert_eq!(err.user_friendly_message(), "The upstream API timed out");
    }

    #[tokio::test]
    async fn test_slow_partner_api_counts_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"data": {"company": {"startup_partners": [{"company_name": "A"}]}}}));
        });
        let client = PartnerClient::new(&server.url("/graphql"), Duration::from_millis(100)).unwrap();

        assert!(matches!(
            client.try_count("Acme").await,
            Err(AppError::ApiError(e)) if e.is_timeout()
        ));
        assert_eq!(client.count_partners("Acme").await, 0);
    }
}
