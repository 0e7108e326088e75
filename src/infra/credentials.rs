//! Usage: Resolve warehouse credentials from configuration sources.
//!
//! Precedence:
//! 1. `GCP_SERVICE_ACCOUNT_JSON` (inline JSON)
//! 2. `GOOGLE_APPLICATION_CREDENTIALS` (inline JSON, else a key file path)
//! 3. ambient platform credentials (metadata server)
//!
//! Resolution never fails: each unusable source is logged and skipped.

use crate::infra::settings::EnvLookup;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const PREFERRED_CREDENTIALS_ENV: &str = "GCP_SERVICE_ACCOUNT_JSON";
pub const LEGACY_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

impl fmt::Debug for AuthorizedUserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUserKey")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("quota_project_id", &self.quota_project_id)
            .finish()
    }
}

/// Credential JSON as written by the cloud console / gcloud, keyed by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialKey {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

impl CredentialKey {
    fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(key) => key.quota_project_id.as_deref(),
        }
        .map(str::trim)
        .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub enum WarehouseCredentials {
    Key(CredentialKey),
    Ambient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    PreferredInline,
    LegacyInline,
    LegacyKeyFile(PathBuf),
    Ambient,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreferredInline => write!(f, "{PREFERRED_CREDENTIALS_ENV} (inline json)"),
            Self::LegacyInline => write!(f, "{LEGACY_CREDENTIALS_ENV} (inline json)"),
            Self::LegacyKeyFile(path) => {
                write!(f, "{LEGACY_CREDENTIALS_ENV} (key file {})", path.display())
            }
            Self::Ambient => write!(f, "ambient platform credentials"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub source: CredentialSource,
    pub credentials: WarehouseCredentials,
    pub project_id: Option<String>,
}

fn parse_key(raw: &str) -> Result<CredentialKey, serde_json::Error> {
    serde_json::from_str::<CredentialKey>(raw)
}

fn read_key_file(path: &Path) -> Result<CredentialKey, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    parse_key(&raw).map_err(|e| format!("invalid credential json: {e}"))
}

fn resolve_source(lookup: EnvLookup) -> (CredentialSource, WarehouseCredentials) {
    if let Some(raw) = lookup(PREFERRED_CREDENTIALS_ENV) {
        match parse_key(&raw) {
            Ok(key) => {
                return (
                    CredentialSource::PreferredInline,
                    WarehouseCredentials::Key(key),
                )
            }
            Err(err) => {
                tracing::warn!(
                    source = PREFERRED_CREDENTIALS_ENV,
                    "inline credential json could not be parsed, trying next source: {err}"
                );
            }
        }
    }

    if let Some(raw) = lookup(LEGACY_CREDENTIALS_ENV) {
        if let Ok(key) = parse_key(&raw) {
            return (CredentialSource::LegacyInline, WarehouseCredentials::Key(key));
        }

        let path = PathBuf::from(raw);
        match read_key_file(&path) {
            Ok(key) => {
                return (
                    CredentialSource::LegacyKeyFile(path),
                    WarehouseCredentials::Key(key),
                )
            }
            Err(err) => {
                tracing::warn!(
                    source = LEGACY_CREDENTIALS_ENV,
                    path = %path.display(),
                    "credential key file unusable, falling back to ambient credentials: {err}"
                );
            }
        }
    }

    (CredentialSource::Ambient, WarehouseCredentials::Ambient)
}

/// Resolve credentials plus the target project. An explicit project id wins over the key's own.
pub fn resolve(lookup: EnvLookup, explicit_project_id: Option<&str>) -> ResolvedCredentials {
    let (source, credentials) = resolve_source(lookup);

    let project_id = explicit_project_id
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| match &credentials {
            WarehouseCredentials::Key(key) => key.project_id().map(str::to_string),
            WarehouseCredentials::Ambient => None,
        });

    if project_id.is_none() {
        tracing::warn!(
            source = %source,
            "no warehouse project id configured; inserts and status queries will fail"
        );
    }

    ResolvedCredentials {
        source,
        credentials,
        project_id,
    }
}
