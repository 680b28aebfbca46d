use crate::config::GatewayConfig;
use crate::domain::ports::{Filter, Gateway, Query, Table};
use crate::utils::error::{Result, RosterError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REST_PREFIX: &str = "rest/v1";

/// Error payload returned by the REST endpoint on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// PostgREST-style gateway over HTTP.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
}

impl RestGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let api_key = header_value("gateway.api_key", &config.api_key)?;
        let bearer = config.access_token.as_deref().unwrap_or(&config.api_key);
        headers.insert("apikey", api_key);
        headers.insert(
            AUTHORIZATION,
            header_value("gateway.access_token", &format!("Bearer {}", bearer))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RosterError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/{}/{}", self.base_url, REST_PREFIX, table.as_str())
    }

    fn apply_query(request: RequestBuilder, query: &Query) -> RequestBuilder {
        let mut params: Vec<(String, String)> = query
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::Eq { column, value } => (column.clone(), format!("eq.{}", value)),
                Filter::IsNull { column } => (column.clone(), "is.null".to_string()),
            })
            .collect();
        if let Some(order) = &query.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        request.query(&params)
    }

    async fn read_rows<R: DeserializeOwned>(response: Response) -> Result<Vec<R>> {
        let response = Self::check(response).await?;
        Ok(response.json::<Vec<R>>().await?)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("Gateway response status: {}", status);
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let mut message = body
            .message
            .unwrap_or_else(|| format!("{} {}", status, text).trim().to_string());
        if let Some(details) = body.details.filter(|d| !d.is_empty()) {
            message = format!("{} ({})", message, details);
        }
        if let Some(hint) = body.hint.filter(|h| !h.is_empty()) {
            tracing::debug!("Gateway hint: {}", hint);
        }

        if status == StatusCode::NOT_FOUND && body.code.is_none() {
            return Err(RosterError::NotFoundError { message });
        }
        if status == StatusCode::CONFLICT && body.code.is_none() {
            return Err(RosterError::ConstraintViolation {
                message,
                code: None,
            });
        }
        Err(RosterError::from_gateway(body.code, message))
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| RosterError::InvalidConfigValueError {
        field: field.to_string(),
        value: "<redacted>".to_string(),
        reason: "contains characters not allowed in an HTTP header".to_string(),
    })
}

#[async_trait]
impl Gateway for RestGateway {
    async fn select<R>(&self, table: Table, query: &Query) -> Result<Vec<R>>
    where
        R: DeserializeOwned + Send,
    {
        tracing::debug!("GET {} filters={:?}", table, query.filters);
        let request = Self::apply_query(self.client.get(self.table_url(table)), query);
        let response = request.send().await?;
        Self::read_rows(response).await
    }

    async fn insert_one<I, R>(&self, table: Table, row: &I) -> Result<R>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        tracing::debug!("POST {} (single row)", table);
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let mut rows: Vec<R> = Self::read_rows(response).await?;
        if rows.len() != 1 {
            return Err(RosterError::GatewayError {
                message: format!("expected exactly one row back from insert, got {}", rows.len()),
                code: Some("PGRST116".to_string()),
            });
        }
        Ok(rows.remove(0))
    }

    async fn insert_many<I, R>(&self, table: Table, rows: &[I]) -> Result<Vec<R>>
    where
        I: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        tracing::debug!("POST {} ({} rows)", table, rows.len());
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(rows)
            .send()
            .await?;
        Self::read_rows(response).await
    }

    async fn delete_by_id(&self, table: Table, id: &str) -> Result<()> {
        tracing::debug!("DELETE {} id={}", table, id);
        let response = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
