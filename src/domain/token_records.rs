//! Usage: Token rows (normalization from provider payloads, status redaction, freshness).
//!
//! Provider responses are never schema-validated: the payload stays a loose JSON map, only the
//! fields we consult are lifted into `TokenRecord`, and the full payload is kept in `raw`.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw token endpoint response body.
pub type TokenPayload = Map<String, Value>;

pub const REDACTED_MARKER: &str = "REDACTED";
/// A stored token is considered usable only if it outlives `now` by this margin.
pub const FRESHNESS_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub provider: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
    pub raw: String,
}

/// Fractional lifetimes are truncated to whole seconds, and `expires_at` uses the same value.
fn whole_seconds(secs: f64) -> Option<i64> {
    secs.is_finite().then(|| secs.trunc() as i64)
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(whole_seconds)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_seconds))
        }
        _ => None,
    }
}

fn string_field(payload: &TokenPayload, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn lifetime_field(payload: &TokenPayload) -> Option<i64> {
    payload
        .get("expires_in")
        .filter(|v| !v.is_null())
        .or_else(|| payload.get("expires"))
        .and_then(parse_i64_lossy)
}

impl TokenRecord {
    /// Build the row for one token acquisition. `expires_at` is derived here, once.
    pub fn from_payload(
        provider: &str,
        payload: &TokenPayload,
        obtained_at: DateTime<Utc>,
    ) -> Self {
        let (expires_in, expires_at) = match lifetime_field(payload).and_then(|secs| {
            TimeDelta::try_seconds(secs)
                .and_then(|delta| obtained_at.checked_add_signed(delta))
                .map(|at| (secs, at))
        }) {
            Some((secs, at)) => (Some(secs), Some(at)),
            None => (None, None),
        };

        Self {
            provider: provider.to_string(),
            access_token: string_field(payload, "access_token"),
            refresh_token: string_field(payload, "refresh_token"),
            expires_in,
            expires_at,
            scope: string_field(payload, "scope"),
            obtained_at,
            raw: Value::Object(payload.clone()).to_string(),
        }
    }

    /// Parse `raw` back into the payload that produced this row.
    pub fn raw_payload(&self) -> Option<TokenPayload> {
        match serde_json::from_str::<Value>(&self.raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        expires_at - TimeDelta::seconds(FRESHNESS_MARGIN_SECS) > now
    }
}

/// Status endpoint shape: access token redacted, refresh token reduced to presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatusView {
    pub provider: String,
    pub access_token: Option<&'static str>,
    pub refresh_token: bool,
    pub expires_in: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Option<String>,
    pub obtained_at: DateTime<Utc>,
    pub raw: String,
}

impl From<&TokenRecord> for TokenStatusView {
    fn from(record: &TokenRecord) -> Self {
        Self {
            provider: record.provider.clone(),
            access_token: record
                .access_token
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|_| REDACTED_MARKER),
            refresh_token: record.has_refresh_token(),
            expires_in: record.expires_in,
            expires_at: record.expires_at,
            scope: record.scope.clone(),
            obtained_at: record.obtained_at,
            raw: record.raw.clone(),
        }
    }
}

/// Refresh responses may omit `refresh_token`; keep the previous one so the new row stays usable.
pub fn carry_refresh_token(payload: &mut TokenPayload, previous: Option<&str>) {
    if payload.contains_key("refresh_token") {
        return;
    }
    if let Some(previous) = previous.filter(|v| !v.is_empty()) {
        payload.insert(
            "refresh_token".to_string(),
            Value::String(previous.to_string()),
        );
    }
}
