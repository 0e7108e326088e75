use super::*;
use crate::infra::credentials::WarehouseCredentials;
use chrono::{TimeZone, TimeDelta};
use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "acme-data";
const QUERIES_PATH: &str = "/projects/acme-data/queries";
const INSERT_PATH: &str = "/projects/acme-data/datasets/etl_tokens/tables/oauth_tokens/insertAll";

async fn setup() -> (MockServer, BigQueryTokenStore) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metadata/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "ya29.test", "expires_in": 3600})),
        )
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let auth = WarehouseAuth::new(http.clone(), WarehouseCredentials::Ambient).with_endpoints(
        "http://unused.invalid",
        &format!("{}/metadata/token", server.uri()),
    );
    let store = BigQueryTokenStore::new(
        http,
        auth,
        Some(PROJECT.to_string()),
        &WarehouseSettings::default(),
    )
    .with_base_url(&server.uri());
    (server, store)
}

fn sample_record() -> TokenRecord {
    let obtained_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    TokenRecord {
        provider: "sage".to_string(),
        access_token: Some("T".to_string()),
        refresh_token: Some("R".to_string()),
        expires_in: Some(3600),
        expires_at: Some(obtained_at + TimeDelta::seconds(3600)),
        scope: Some("full_access".to_string()),
        obtained_at,
        raw: r#"{"access_token":"T","refresh_token":"R","expires_in":3600,"scope":"full_access"}"#
            .to_string(),
    }
}

fn schema() -> Value {
    json!({"fields": [
        {"name": "provider", "type": "STRING"},
        {"name": "access_token", "type": "STRING"},
        {"name": "refresh_token", "type": "STRING"},
        {"name": "expires_in", "type": "INTEGER"},
        {"name": "expires_at", "type": "TIMESTAMP"},
        {"name": "scope", "type": "STRING"},
        {"name": "obtained_at", "type": "TIMESTAMP"},
        {"name": "raw", "type": "STRING"}
    ]})
}

fn row_cells(record: &TokenRecord) -> Value {
    json!({"f": [
        {"v": record.provider},
        {"v": record.access_token},
        {"v": record.refresh_token},
        {"v": record.expires_in.map(|v| v.to_string())},
        {"v": record.expires_at.map(|v| v.timestamp_micros().to_string())},
        {"v": record.scope},
        {"v": record.obtained_at.timestamp_micros().to_string()},
        {"v": record.raw}
    ]})
}

#[tokio::test]
async fn insert_posts_single_json_row() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .and(bearer_token("ya29.test"))
        .and(body_partial_json(json!({"rows": [{"json": {
            "provider": "sage",
            "access_token": "T",
            "expires_in": 3600,
            "obtained_at": "2025-03-01T12:00:00Z",
            "expires_at": "2025-03-01T13:00:00Z"
        }}]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"kind": "bigquery#tableDataInsertAllResponse"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    store.insert_token(&sample_record()).await.expect("insert");
}

#[tokio::test]
async fn insert_errors_in_200_response_fail() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "insertErrors": [{
                "index": 0,
                "errors": [{"reason": "invalid", "message": "no such field: foo"}]
            }]
        })))
        .mount(&server)
        .await;

    let err = store.insert_token(&sample_record()).await.expect_err("rejected");
    assert_eq!(err.code(), "WAREHOUSE_ERROR");
    assert!(err.message().contains("no such field"));
}

#[tokio::test]
async fn insert_http_failure_propagates() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(INSERT_PATH))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error": {"message": "Access Denied"}})),
        )
        .mount(&server)
        .await;

    let err = store.insert_token(&sample_record()).await.expect_err("403");
    assert_eq!(err.code(), "WAREHOUSE_ERROR");
    assert!(err.message().contains("status=403"));
}

#[tokio::test]
async fn missing_project_is_config_error_without_network() {
    let (server, store) = setup().await;
    let store = BigQueryTokenStore {
        project_id: None,
        ..store
    };
    let err = store.latest_token("sage").await.expect_err("no project");
    assert_eq!(err.code(), "CONFIG_ERROR");
    assert!(server
        .received_requests()
        .await
        .unwrap_or_default()
        .is_empty());
}

#[tokio::test]
async fn latest_token_decodes_row() {
    let (server, store) = setup().await;
    let record = sample_record();
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .and(body_partial_json(json!({
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": [{"name": "provider", "parameterValue": {"value": "sage"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": schema(),
            "rows": [row_cells(&record)],
            "totalRows": "1"
        })))
        .mount(&server)
        .await;

    let latest = store.latest_token("sage").await.expect("query");
    assert_eq!(latest, Some(record));
}

#[tokio::test]
async fn latest_token_without_rows_is_none() {
    let (server, store) = setup().await;
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": schema(),
            "totalRows": "0"
        })))
        .mount(&server)
        .await;

    assert_eq!(store.latest_token("ebay").await.expect("query"), None);
}

#[tokio::test]
async fn incomplete_query_is_polled_until_complete() {
    let (server, store) = setup().await;
    let record = sample_record();
    Mock::given(method("POST"))
        .and(path(QUERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": false,
            "jobReference": {"projectId": PROJECT, "jobId": "job_123", "location": "EU"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/acme-data/queries/job_123"))
        .and(query_param("location", "EU"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": schema(),
            "rows": [row_cells(&record)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store.latest_token("sage").await.expect("query"), Some(record));
}

#[test]
fn float_second_timestamps_are_accepted() {
    let fields = vec![
        TableFieldSchema { name: "provider".to_string() },
        TableFieldSchema { name: "obtained_at".to_string() },
        TableFieldSchema { name: "expires_in".to_string() },
    ];
    let row: TableRow = serde_json::from_value(json!({"f": [
        {"v": "amazon"},
        {"v": "1.7408304E9"},
        {"v": null}
    ]}))
    .expect("row");
    let record = decode_row(&fields, &row).expect("decode");
    assert_eq!(record.obtained_at.timestamp(), 1_740_830_400);
    assert!(record.expires_in.is_none());
    assert!(record.raw.is_empty());
}

#[test]
fn row_without_obtained_at_is_rejected() {
    let fields = vec![TableFieldSchema { name: "provider".to_string() }];
    let row: TableRow = serde_json::from_value(json!({"f": [{"v": "sage"}]})).expect("row");
    let err = decode_row(&fields, &row).expect_err("missing obtained_at");
    assert!(err.message().contains("obtained_at"));
}
