//! Usage: Authorization redirect construction (query string + `state` value).

use super::providers::{OAuthEndpoints, ProviderKey};
use crate::shared::error::AppResult;

/// `state-{provider}-{unix_millis}`. Informational only; callbacks do not verify it.
pub(crate) fn build_oauth_state(key: ProviderKey) -> String {
    build_oauth_state_at(key, crate::shared::time::now_unix_millis())
}

fn build_oauth_state_at(key: ProviderKey, unix_millis: i64) -> String {
    format!("state-{}-{unix_millis}", key.as_str())
}

/// Base endpoint + form-encoded query. A base that already carries a query string is
/// extended with `&` rather than a second `?`.
pub(crate) fn build_authorize_url(endpoints: &OAuthEndpoints, state: &str) -> AppResult<String> {
    let pairs: [(&str, &str); 5] = [
        ("response_type", "code"),
        ("client_id", endpoints.client_id.as_str()),
        ("redirect_uri", endpoints.redirect_uri.as_str()),
        ("scope", endpoints.scope.as_str()),
        ("state", state),
    ];
    let query = serde_urlencoded::to_string(&pairs[..])
        .map_err(|e| format!("SYSTEM_ERROR: failed to encode authorize query: {e}"))?;

    let separator = if endpoints.auth_url.contains('?') {
        '&'
    } else {
        '?'
    };
    Ok(format!("{}{separator}{query}", endpoints.auth_url))
}
