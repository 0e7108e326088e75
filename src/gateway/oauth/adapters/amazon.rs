//! Usage: Amazon (Login with Amazon / SP-API) OAuth adapter.

use crate::gateway::oauth::provider_trait::OAuthProvider;
use crate::gateway::oauth::providers::{OAuthEndpoints, ProviderKey};

pub(crate) struct AmazonOAuthProvider {
    endpoints: OAuthEndpoints,
}

impl AmazonOAuthProvider {
    pub(crate) fn new(endpoints: OAuthEndpoints) -> Self {
        Self { endpoints }
    }
}

impl OAuthProvider for AmazonOAuthProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Amazon
    }

    fn endpoints(&self) -> &OAuthEndpoints {
        &self.endpoints
    }
}
