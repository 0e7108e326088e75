//! Usage: Provider identifiers and the per-provider endpoint configuration resolved at startup.

use crate::infra::settings::ProviderSettings;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    Sage,
    Ebay,
    Amazon,
}

impl ProviderKey {
    pub const ALL: [ProviderKey; 3] = [Self::Sage, Self::Ebay, Self::Amazon];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sage => "sage",
            Self::Ebay => "ebay",
            Self::Amazon => "amazon",
        }
    }

    /// Exact, case-sensitive match on the path segment.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where client credentials travel on token requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    /// `client_id` / `client_secret` as form fields.
    Body,
    /// `Authorization: Basic base64(client_id:client_secret)`.
    Basic,
}

/// Endpoint configuration for one provider. Unset values stay empty strings; nothing is
/// validated at startup and the provider rejects malformed requests at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthEndpoints {
    pub fn from_settings(
        key: ProviderKey,
        settings: &ProviderSettings,
        public_base_url: &str,
    ) -> Self {
        let redirect_uri = settings
            .redirect_uri
            .clone()
            .unwrap_or_else(|| make_redirect_uri(public_base_url, key));
        Self {
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri,
            scope: settings.scope.clone(),
        }
    }
}

/// Callback URL served by this process for `key`.
pub(crate) fn make_redirect_uri(public_base_url: &str, key: ProviderKey) -> String {
    format!(
        "{}/oauth/callback/{}",
        public_base_url.trim_end_matches('/'),
        key.as_str()
    )
}
