//! Usage: BigQuery REST client for the token table (`insertAll` + parameterized `jobs.query`).

use super::auth::WarehouseAuth;
use super::{BoxFuture, TokenStore};
use crate::domain::token_records::TokenRecord;
use crate::infra::settings::WarehouseSettings;
use crate::shared::error::AppResult;
use crate::shared::security::sanitize_body_snippet;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const BIGQUERY_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const QUERY_POLL_MAX_ATTEMPTS: u32 = 10;
const QUERY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertAllResponse {
    #[serde(default)]
    insert_errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    job_reference: Option<JobReference>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Deserialize)]
struct TableFieldSchema {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

pub struct BigQueryTokenStore {
    http: reqwest::Client,
    auth: WarehouseAuth,
    base_url: String,
    project_id: Option<String>,
    dataset: String,
    table: String,
}

impl BigQueryTokenStore {
    pub fn new(
        http: reqwest::Client,
        auth: WarehouseAuth,
        project_id: Option<String>,
        warehouse: &WarehouseSettings,
    ) -> Self {
        Self {
            http,
            auth,
            base_url: BIGQUERY_API_BASE.to_string(),
            project_id,
            dataset: warehouse.dataset.clone(),
            table: warehouse.table.clone(),
        }
    }

    /// Override the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn project(&self) -> AppResult<&str> {
        self.project_id.as_deref().ok_or_else(|| {
            "CONFIG_ERROR: warehouse project id is not configured"
                .to_string()
                .into()
        })
    }

    fn insert_all_url(&self, project: &str) -> String {
        format!(
            "{}/projects/{project}/datasets/{}/tables/{}/insertAll",
            self.base_url, self.dataset, self.table
        )
    }

    fn queries_url(&self, project: &str) -> String {
        format!("{}/projects/{project}/queries", self.base_url)
    }

    fn latest_token_sql(&self, project: &str) -> String {
        format!(
            "SELECT provider, access_token, refresh_token, expires_in, expires_at, scope, obtained_at, raw \
             FROM `{project}.{}.{}` \
             WHERE provider = @provider \
             ORDER BY obtained_at DESC \
             LIMIT 1",
            self.dataset, self.table
        )
    }

    async fn insert(&self, record: &TokenRecord) -> AppResult<()> {
        let project = self.project()?;
        let row = serde_json::to_value(record)
            .map_err(|e| format!("SYSTEM_ERROR: token row serialization failed: {e}"))?;
        let body = json!({ "rows": [{ "json": row }] });

        let token = self.auth.access_token().await?;
        let response = self
            .http
            .post(self.insert_all_url(project))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: insertAll request failed: {e}"))?;

        let parsed: InsertAllResponse = read_json(response, "insertAll").await?;
        if !parsed.insert_errors.is_empty() {
            let detail = Value::Array(parsed.insert_errors).to_string();
            return Err(format!(
                "WAREHOUSE_ERROR: insertAll rejected row: {}",
                sanitize_body_snippet(&detail)
            )
            .into());
        }

        tracing::info!(
            provider = %record.provider,
            table = %format!("{}.{}", self.dataset, self.table),
            "saved token row"
        );
        Ok(())
    }

    async fn query_latest(&self, provider: &str) -> AppResult<Option<TokenRecord>> {
        let project = self.project()?;
        let body = json!({
            "query": self.latest_token_sql(project),
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{
                "name": "provider",
                "parameterType": { "type": "STRING" },
                "parameterValue": { "value": provider }
            }],
            "timeoutMs": QUERY_TIMEOUT_MS,
            "formatOptions": { "useInt64Timestamp": true }
        });

        let token = self.auth.access_token().await?;
        let response = self
            .http
            .post(self.queries_url(project))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: query request failed: {e}"))?;
        let mut result: QueryResponse = read_json(response, "query").await?;

        let mut attempts = 0;
        while !result.job_complete {
            attempts += 1;
            if attempts > QUERY_POLL_MAX_ATTEMPTS {
                return Err("WAREHOUSE_ERROR: query did not complete in time"
                    .to_string()
                    .into());
            }
            let job = result.job_reference.clone().ok_or_else(|| {
                "WAREHOUSE_ERROR: incomplete query response without job reference".to_string()
            })?;
            result = self.poll_query_results(project, &job, &token).await?;
        }

        let fields = result.schema.map(|s| s.fields).unwrap_or_default();
        match result.rows.first() {
            Some(row) => decode_row(&fields, row).map(Some),
            None => Ok(None),
        }
    }

    async fn poll_query_results(
        &self,
        project: &str,
        job: &JobReference,
        token: &str,
    ) -> AppResult<QueryResponse> {
        let url = format!("{}/{}", self.queries_url(project), job.job_id);
        let timeout = QUERY_TIMEOUT_MS.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("timeoutMs", timeout.as_str()),
            ("formatOptions.useInt64Timestamp", "true"),
        ];
        if let Some(location) = job.location.as_deref() {
            params.push(("location", location));
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: getQueryResults request failed: {e}"))?;
        read_json(response, "getQueryResults").await
    }
}

impl TokenStore for BigQueryTokenStore {
    fn insert_token<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(self.insert(record))
    }

    fn latest_token<'a>(
        &'a self,
        provider: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<TokenRecord>>> {
        Box::pin(self.query_latest(provider))
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, label: &str) -> AppResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("WAREHOUSE_ERROR: {label} response read failed: {e}"))?;
    if !status.is_success() {
        return Err(format!(
            "WAREHOUSE_ERROR: {label} returned status={} body={}",
            status.as_u16(),
            sanitize_body_snippet(&body)
        )
        .into());
    }
    serde_json::from_str::<T>(&body)
        .map_err(|e| format!("WAREHOUSE_ERROR: {label} response json invalid: {e}").into())
}

fn cell<'a>(fields: &[TableFieldSchema], row: &'a TableRow, name: &str) -> Option<&'a Value> {
    let idx = fields.iter().position(|f| f.name == name)?;
    row.f.get(idx).map(|c| &c.v).filter(|v| !v.is_null())
}

fn cell_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

fn cell_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// TIMESTAMP cells come back as integer microseconds, or float seconds without `useInt64Timestamp`.
fn cell_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if let Ok(micros) = raw.parse::<i64>() {
        return DateTime::from_timestamp_micros(micros);
    }
    let secs = raw.parse::<f64>().ok()?;
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}

fn decode_row(fields: &[TableFieldSchema], row: &TableRow) -> AppResult<TokenRecord> {
    let provider = cell_string(cell(fields, row, "provider"))
        .ok_or_else(|| "WAREHOUSE_ERROR: token row missing provider".to_string())?;
    let obtained_at = cell_timestamp(cell(fields, row, "obtained_at"))
        .ok_or_else(|| "WAREHOUSE_ERROR: token row missing obtained_at".to_string())?;

    Ok(TokenRecord {
        provider,
        access_token: cell_string(cell(fields, row, "access_token")),
        refresh_token: cell_string(cell(fields, row, "refresh_token")),
        expires_in: cell_i64(cell(fields, row, "expires_in")),
        expires_at: cell_timestamp(cell(fields, row, "expires_at")),
        scope: cell_string(cell(fields, row, "scope")),
        obtained_at,
        raw: cell_string(cell(fields, row, "raw")).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests;
