//! Usage: OAuthProvider trait definition - the core abstraction for multi-provider OAuth.
//!
//! Each provider (Sage, eBay, Amazon) implements this trait to describe how its authorize URL
//! and token requests are framed. Handlers dispatch through `OAuthProviderRegistry`.

use super::authorize::build_authorize_url;
use super::providers::{ClientAuth, OAuthEndpoints, ProviderKey};
use crate::shared::error::AppResult;

/// The trait is object-safe to allow dynamic dispatch via `&dyn OAuthProvider`.
/// Adding a provider only requires implementing this trait + registering it in the registry.
pub(crate) trait OAuthProvider: Send + Sync {
    fn key(&self) -> ProviderKey;

    /// Endpoint configuration resolved from settings.
    fn endpoints(&self) -> &OAuthEndpoints;

    /// How client credentials are sent to the token endpoint.
    fn client_auth(&self) -> ClientAuth {
        ClientAuth::Body
    }

    /// Extra headers on token endpoint requests.
    fn token_request_headers(&self) -> Vec<(&'static str, &'static str)> {
        vec![]
    }

    fn authorize_url(&self, state: &str) -> AppResult<String> {
        build_authorize_url(self.endpoints(), state)
    }
}
