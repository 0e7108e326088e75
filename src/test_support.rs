//! Usage: Public test helpers for unit and integration tests.

use crate::domain::token_records::TokenRecord;
use crate::gateway::routes::build_router;
use crate::gateway::server::{build_http_client, GatewayAppState};
use crate::infra::credentials;
use crate::infra::settings::{process_env, Settings};
use crate::infra::warehouse::{BoxFuture, TokenStore};
use crate::shared::error::AppResult;
use crate::shared::mutex_ext::MutexExt;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Append-only in-memory token table.
#[derive(Default)]
pub struct MemoryTokenStore {
    rows: Mutex<Vec<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row as if `payload` had been obtained at `obtained_at`.
    pub fn seed(&self, provider: &str, payload: Value, obtained_at: DateTime<Utc>) {
        let payload = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        let record = TokenRecord::from_payload(provider, &payload, obtained_at);
        self.rows.lock_or_recover().push(record);
    }

    pub fn len(&self) -> usize {
        self.rows.lock_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows in insertion order, serialized the way they are sent to the warehouse.
    pub fn rows_json(&self) -> Vec<Value> {
        self.rows
            .lock_or_recover()
            .iter()
            .map(|r| serde_json::to_value(r).unwrap_or(Value::Null))
            .collect()
    }
}

impl TokenStore for MemoryTokenStore {
    fn insert_token<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            self.rows.lock_or_recover().push(record.clone());
            Ok(())
        })
    }

    fn latest_token<'a>(
        &'a self,
        provider: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<TokenRecord>>> {
        Box::pin(async move {
            Ok(self
                .rows
                .lock_or_recover()
                .iter()
                .filter(|r| r.provider == provider)
                .max_by_key(|r| r.obtained_at)
                .cloned())
        })
    }
}

/// Store whose every call fails the way an unreachable warehouse does.
pub struct FailingTokenStore;

fn unreachable_warehouse<T>(call: &str) -> AppResult<T> {
    Err(format!("WAREHOUSE_ERROR: {call} request failed: connection refused").into())
}

impl TokenStore for FailingTokenStore {
    fn insert_token<'a>(&'a self, _record: &'a TokenRecord) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async { unreachable_warehouse::<()>("insertAll") })
    }

    fn latest_token<'a>(
        &'a self,
        _provider: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<TokenRecord>>> {
        Box::pin(async { unreachable_warehouse::<Option<TokenRecord>>("query") })
    }
}

fn settings_from_pairs(env: &[(&str, &str)]) -> Settings {
    let map: HashMap<String, String> = env
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect();
    Settings::from_lookup(&|key: &str| map.get(key).cloned())
}

/// Full router over `store`, configured from `env` pairs instead of the process environment.
pub fn router_from_env(
    env: &[(&str, &str)],
    store: Arc<dyn TokenStore>,
) -> AppResult<axum::Router> {
    let settings = settings_from_pairs(env);
    let client = build_http_client(&settings)?;
    let state = GatewayAppState::new(&settings, client, store);
    Ok(build_router(state, &settings.static_dir))
}

/// The settings fields operators most often get wrong, as loaded from the process environment.
pub fn settings_summary_from_process_env() -> Value {
    let settings = Settings::load();
    let redirect = |p: &crate::infra::settings::ProviderSettings| p.redirect_uri.clone();
    json!({
        "host": settings.host,
        "port": settings.port,
        "public_base_url": settings.public_base_url,
        "static_dir": settings.static_dir.display().to_string(),
        "http_timeout_secs": settings.http_timeout_secs,
        "project_id": settings.warehouse.project_id,
        "table": settings.warehouse.table_label(),
        "sage_auth_url": settings.providers.sage.auth_url,
        "sage_scope": settings.providers.sage.scope,
        "ebay_redirect_uri": redirect(&settings.providers.ebay),
        "amazon_client_id": settings.providers.amazon.client_id,
    })
}

/// Where warehouse credentials resolve from under the process environment, plus the project.
pub fn credential_resolution_from_process_env() -> Value {
    let explicit = process_env("GCP_PROJECT_ID");
    let resolved = credentials::resolve(&process_env, explicit.as_deref());
    json!({
        "source": resolved.source.to_string(),
        "ambient": matches!(resolved.credentials, credentials::WarehouseCredentials::Ambient),
        "project_id": resolved.project_id,
    })
}
