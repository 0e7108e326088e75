//! Usage: eBay OAuth adapter.
//!
//! Specializations:
//! - Client credentials via HTTP Basic on token requests
//! - `redirect_uri` is usually the RuName registered with eBay, not a URL

use crate::gateway::oauth::provider_trait::OAuthProvider;
use crate::gateway::oauth::providers::{ClientAuth, OAuthEndpoints, ProviderKey};

pub(crate) struct EbayOAuthProvider {
    endpoints: OAuthEndpoints,
}

impl EbayOAuthProvider {
    pub(crate) fn new(endpoints: OAuthEndpoints) -> Self {
        Self { endpoints }
    }
}

impl OAuthProvider for EbayOAuthProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Ebay
    }

    fn endpoints(&self) -> &OAuthEndpoints {
        &self.endpoints
    }

    fn client_auth(&self) -> ClientAuth {
        ClientAuth::Basic
    }
}
