//! Usage: Sage Accounting OAuth adapter.
//!
//! Specializations:
//! - Client credentials in the form body
//! - Asks for a JSON token response explicitly
//! - Authorize/token URLs and scope default to the public Sage endpoints

use crate::gateway::oauth::provider_trait::OAuthProvider;
use crate::gateway::oauth::providers::{OAuthEndpoints, ProviderKey};

pub(crate) struct SageOAuthProvider {
    endpoints: OAuthEndpoints,
}

impl SageOAuthProvider {
    pub(crate) fn new(endpoints: OAuthEndpoints) -> Self {
        Self { endpoints }
    }
}

impl OAuthProvider for SageOAuthProvider {
    fn key(&self) -> ProviderKey {
        ProviderKey::Sage
    }

    fn endpoints(&self) -> &OAuthEndpoints {
        &self.endpoints
    }

    fn token_request_headers(&self) -> Vec<(&'static str, &'static str)> {
        vec![("Accept", "application/json")]
    }
}
