//! Usage: OAuth token endpoint helpers (authorization_code + refresh_token grants).
//!
//! Successful responses are returned verbatim: providers disagree on field names and
//! extras, and the full payload is persisted as `raw`.

use super::provider_trait::OAuthProvider;
use super::providers::ClientAuth;
use crate::domain::token_records::TokenPayload;
use crate::shared::error::{AppError, AppResult};
use crate::shared::security::sanitize_body_snippet;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

enum Grant<'a> {
    AuthorizationCode { code: &'a str, redirect_uri: &'a str },
    RefreshToken { refresh_token: &'a str },
}

impl Grant<'_> {
    fn label(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    provider: &dyn OAuthProvider,
    code: &str,
) -> AppResult<TokenPayload> {
    let grant = Grant::AuthorizationCode {
        code,
        redirect_uri: provider.endpoints().redirect_uri.as_str(),
    };
    post_token_request(client, provider, grant).await
}

pub(crate) async fn refresh_access_token(
    client: &reqwest::Client,
    provider: &dyn OAuthProvider,
    refresh_token: &str,
) -> AppResult<TokenPayload> {
    post_token_request(client, provider, Grant::RefreshToken { refresh_token }).await
}

/// `Basic base64(client_id:client_secret)`.
pub(crate) fn basic_authorization_value(client_id: &str, client_secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{client_id}:{client_secret}")))
}

fn token_form<'a>(
    provider: &'a dyn OAuthProvider,
    grant: &Grant<'a>,
) -> Vec<(&'static str, &'a str)> {
    let endpoints = provider.endpoints();
    let mut form: Vec<(&'static str, &'a str)> = vec![("grant_type", grant.label())];
    match grant {
        Grant::AuthorizationCode { code, .. } => form.push(("code", *code)),
        Grant::RefreshToken { refresh_token } => form.push(("refresh_token", *refresh_token)),
    }
    if provider.client_auth() == ClientAuth::Body {
        form.push(("client_id", endpoints.client_id.as_str()));
        form.push(("client_secret", endpoints.client_secret.as_str()));
    }
    if let Grant::AuthorizationCode { redirect_uri, .. } = grant {
        form.push(("redirect_uri", *redirect_uri));
    }
    form
}

async fn post_token_request(
    client: &reqwest::Client,
    provider: &dyn OAuthProvider,
    grant: Grant<'_>,
) -> AppResult<TokenPayload> {
    let endpoints = provider.endpoints();
    let form = token_form(provider, &grant);

    let mut request = client.post(endpoints.token_url.as_str()).form(&form);
    for (name, value) in provider.token_request_headers() {
        request = request.header(name, value);
    }
    if provider.client_auth() == ClientAuth::Basic {
        request = request.header(
            reqwest::header::AUTHORIZATION,
            basic_authorization_value(&endpoints.client_id, &endpoints.client_secret),
        );
    }

    let response = request.send().await.map_err(|e| {
        AppError::new(
            "OAUTH_EXCHANGE_FAILED",
            format!("{} {} request failed: {e}", provider.key(), grant.label()),
        )
        .with_source(e)
    })?;

    parse_token_response(response).await
}

async fn parse_token_response(response: reqwest::Response) -> AppResult<TokenPayload> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("OAUTH_EXCHANGE_FAILED: token response read failed: {e}"))?;

    if !status.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(&body);
        let mut msg = format!(
            "OAUTH_EXCHANGE_FAILED: token endpoint returned status={}",
            status.as_u16()
        );
        if let Some(code) = error_code {
            msg.push_str(" code=");
            msg.push_str(code.as_str());
        }
        if let Some(detail) = error_message {
            msg.push_str(" message=");
            msg.push_str(detail.chars().take(240).collect::<String>().as_str());
        }
        msg.push_str(" body=");
        msg.push_str(sanitize_body_snippet(&body).as_str());
        return Err(msg.into());
    }

    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(payload)) => Ok(payload),
        Ok(_) => Err("OAUTH_EXCHANGE_FAILED: token response is not a JSON object"
            .to_string()
            .into()),
        Err(e) => Err(format!("OAUTH_EXCHANGE_FAILED: token response json invalid: {e}").into()),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `(error, error_description)` from an RFC 6749 error body, or the nested
/// `{"error": {"code", "message"}}` shape some providers use.
fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = non_empty_str(value.get("code"));
    let mut message = non_empty_str(value.get("error_description"));

    match value.get("error") {
        Some(Value::String(err)) => {
            if code.is_none() {
                code = Some(err.trim().to_string()).filter(|v| !v.is_empty());
            }
        }
        Some(Value::Object(err_obj)) => {
            if code.is_none() {
                code = non_empty_str(err_obj.get("code"))
                    .or_else(|| non_empty_str(err_obj.get("type")));
            }
            if message.is_none() {
                message = non_empty_str(err_obj.get("message"));
            }
        }
        _ => {}
    }

    (code, message)
}
