//! Usage: HTTP routes (OAuth start/callback, token status/refresh, health, static files).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::oauth::authorize::build_oauth_state;
use super::oauth::refresh::{ensure_fresh_token, RefreshOutcome};
use super::oauth::token_exchange::exchange_authorization_code;
use super::server::GatewayAppState;
use crate::domain::token_persistence::persist_token;
use crate::domain::token_records::TokenStatusView;
use crate::shared::time::{now_unix_seconds, now_utc};

const UNKNOWN_PROVIDER: &str = "Unknown provider";
const NO_TOKEN_FOUND: &str = "no token found for provider";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: "oauth-token-bridge",
        version: env!("CARGO_PKG_VERSION"),
        ts: now_unix_seconds(),
    })
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

async fn start_auth(
    State(state): State<GatewayAppState>,
    Path(provider): Path<String>,
) -> Response {
    let Some(adapter) = state.providers.get(&provider) else {
        tracing::debug!(provider = %provider, "authorize requested for unknown provider");
        return plain(StatusCode::BAD_REQUEST, UNKNOWN_PROVIDER);
    };

    let oauth_state = build_oauth_state(adapter.key());
    match adapter.authorize_url(&oauth_state) {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(err) => {
            tracing::error!(provider = %provider, "failed to build authorize url: {err}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to build authorization URL")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    state: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn oauth_callback(
    State(state): State<GatewayAppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = non_empty(query.error) {
        let detail = non_empty(query.error_description).unwrap_or(error);
        tracing::debug!(provider = %provider, "provider returned an authorization error");
        return plain(
            StatusCode::BAD_REQUEST,
            format!("Error from {provider}: {detail}"),
        );
    }
    let Some(code) = non_empty(query.code) else {
        return plain(StatusCode::BAD_REQUEST, "Missing ?code in callback");
    };
    let Some(adapter) = state.providers.get(&provider) else {
        return plain(StatusCode::BAD_REQUEST, UNKNOWN_PROVIDER);
    };
    if let Some(oauth_state) = query.state.as_deref() {
        tracing::debug!(provider = %provider, state = %oauth_state, "callback received");
    }

    let saved = async {
        let payload = exchange_authorization_code(&state.client, adapter, &code).await?;
        persist_token(state.store.as_ref(), adapter.key().as_str(), &payload).await
    }
    .await;

    match saved {
        Ok(_) => Html(confirmation_page(&provider, &state.table_label)).into_response(),
        Err(err) => {
            tracing::error!(provider = %provider, "callback failed: {err}");
            plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to exchange code or save tokens for {provider}."),
            )
        }
    }
}

fn confirmation_page(provider: &str, table_label: &str) -> String {
    format!(
        r#"<html>
  <head><title>{provider} Connected</title></head>
  <body style="font-family: system-ui, sans-serif;">
    <h1>{upper} connected ✅</h1>
    <p>Tokens have been saved into BigQuery table: <code>{table_label}</code>.</p>
    <p>You can close this tab now.</p>
    <a href="/">Back to home</a>
  </body>
</html>
"#,
        upper = provider.to_uppercase(),
    )
}

async fn token_status(
    State(state): State<GatewayAppState>,
    Path(provider): Path<String>,
) -> Response {
    match state.store.latest_token(&provider).await {
        Ok(Some(record)) => Json(TokenStatusView::from(&record)).into_response(),
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": NO_TOKEN_FOUND }))).into_response()
        }
        Err(err) => {
            tracing::error!(provider = %provider, "status query failed: {err}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to query BigQuery")
        }
    }
}

async fn refresh_token(
    State(state): State<GatewayAppState>,
    Path(provider): Path<String>,
) -> Response {
    let Some(adapter) = state.providers.get(&provider) else {
        return plain(StatusCode::BAD_REQUEST, UNKNOWN_PROVIDER);
    };

    match ensure_fresh_token(&state.client, adapter, state.store.as_ref(), now_utc()).await {
        Ok(RefreshOutcome::NoToken) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": NO_TOKEN_FOUND }))).into_response()
        }
        Ok(RefreshOutcome::NoRefreshToken) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "no refresh_token available" })),
        )
            .into_response(),
        Ok(RefreshOutcome::StillFresh(record)) => Json(json!({
            "refreshed": false,
            "token": TokenStatusView::from(&record),
        }))
        .into_response(),
        Ok(RefreshOutcome::Refreshed(record)) => Json(json!({
            "refreshed": true,
            "token": TokenStatusView::from(&record),
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(provider = %provider, "refresh failed: {err}");
            plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to refresh token for {provider}."),
            )
        }
    }
}

pub(crate) fn build_router(state: GatewayAppState, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/:provider", get(start_auth))
        .route("/oauth/callback/:provider", get(oauth_callback))
        .route("/status/:provider", get(token_status))
        .route("/refresh/:provider", post(refresh_token))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
