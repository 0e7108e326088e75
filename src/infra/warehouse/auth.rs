//! Usage: Bearer tokens for warehouse API calls, derived from resolved credentials.
//!
//! - service account: RS256 JWT-bearer assertion exchanged at the key's `token_uri`
//! - authorized user: refresh-token grant
//! - ambient: platform metadata server
//!
//! Tokens are cached in-process until shortly before expiry.

use crate::blocking;
use crate::infra::credentials::{
    AuthorizedUserKey, CredentialKey, ServiceAccountKey, WarehouseCredentials,
};
use crate::shared::error::{AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;
use crate::shared::security::sanitize_body_snippet;
use crate::shared::time::now_unix_seconds;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub(crate) const WAREHOUSE_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
pub(crate) const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub(crate) const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const CACHE_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub(crate) iss: String,
    pub(crate) scope: String,
    pub(crate) aud: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
struct CachedAccessToken {
    token: String,
    expires_at: i64,
}

pub struct WarehouseAuth {
    http: reqwest::Client,
    credentials: WarehouseCredentials,
    token_url: String,
    metadata_url: String,
    cache: Mutex<Option<CachedAccessToken>>,
}

impl WarehouseAuth {
    pub fn new(http: reqwest::Client, credentials: WarehouseCredentials) -> Self {
        Self {
            http,
            credentials,
            token_url: GOOGLE_TOKEN_URL.to_string(),
            metadata_url: METADATA_TOKEN_URL.to_string(),
            cache: Mutex::new(None),
        }
    }

    /// Override the Google token and metadata endpoints (for testing with wiremock).
    #[cfg(test)]
    pub fn with_endpoints(mut self, token_url: &str, metadata_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.metadata_url = metadata_url.to_string();
        self
    }

    pub async fn access_token(&self) -> AppResult<String> {
        let now = now_unix_seconds();
        let cached = self.cache.lock_or_recover().clone();
        if let Some(cached) = cached {
            if cached.expires_at - CACHE_EXPIRY_MARGIN_SECS > now {
                return Ok(cached.token);
            }
        }

        let fetched = match &self.credentials {
            WarehouseCredentials::Key(CredentialKey::ServiceAccount(key)) => {
                self.fetch_service_account_token(key, now).await?
            }
            WarehouseCredentials::Key(CredentialKey::AuthorizedUser(key)) => {
                self.fetch_authorized_user_token(key).await?
            }
            WarehouseCredentials::Ambient => self.fetch_metadata_token().await?,
        };

        let lifetime = fetched
            .expires_in
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        *self.cache.lock_or_recover() = Some(CachedAccessToken {
            token: fetched.access_token.clone(),
            expires_at: now.saturating_add(lifetime),
        });
        tracing::debug!(lifetime_secs = lifetime, "warehouse access token refreshed");

        Ok(fetched.access_token)
    }

    async fn fetch_service_account_token(
        &self,
        key: &ServiceAccountKey,
        now: i64,
    ) -> AppResult<GoogleTokenResponse> {
        let audience = key
            .token_uri
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(self.token_url.as_str())
            .to_string();
        let key_for_signing = key.clone();
        let aud_for_signing = audience.clone();
        let assertion = blocking::run("warehouse_sign_assertion", move || {
            sign_assertion(&key_for_signing, &aud_for_signing, now)
        })
        .await?;

        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];
        let response = self
            .http
            .post(audience.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: service account token request failed: {e}"))?;
        parse_google_token_response(response).await
    }

    async fn fetch_authorized_user_token(
        &self,
        key: &AuthorizedUserKey,
    ) -> AppResult<GoogleTokenResponse> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", key.client_id.as_str()),
            ("client_secret", key.client_secret.as_str()),
            ("refresh_token", key.refresh_token.as_str()),
        ];
        let response = self
            .http
            .post(self.token_url.as_str())
            .form(&form)
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: user credential token request failed: {e}"))?;
        parse_google_token_response(response).await
    }

    async fn fetch_metadata_token(&self) -> AppResult<GoogleTokenResponse> {
        let response = self
            .http
            .get(self.metadata_url.as_str())
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| format!("WAREHOUSE_ERROR: metadata server token request failed: {e}"))?;
        parse_google_token_response(response).await
    }
}

pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    audience: &str,
    now: i64,
) -> AppResult<String> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: WAREHOUSE_SCOPE.to_string(),
        aud: audience.to_string(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        AppError::new("CONFIG_ERROR", format!("service account private key invalid: {e}"))
            .with_source(e)
    })?;
    jsonwebtoken::encode(&header, &claims, &encoding_key).map_err(|e| {
        AppError::new("CONFIG_ERROR", format!("service account assertion signing failed: {e}"))
            .with_source(e)
    })
}

async fn parse_google_token_response(
    response: reqwest::Response,
) -> AppResult<GoogleTokenResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("WAREHOUSE_ERROR: token response read failed: {e}"))?;
    if !status.is_success() {
        return Err(format!(
            "WAREHOUSE_ERROR: token endpoint returned status={} body={}",
            status.as_u16(),
            sanitize_body_snippet(&body)
        )
        .into());
    }
    serde_json::from_str::<GoogleTokenResponse>(&body)
        .map_err(|e| format!("WAREHOUSE_ERROR: token response json invalid: {e}").into())
}
