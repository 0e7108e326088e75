//! Usage: OAuthProviderRegistry - provider lookup via trait dispatch.
//!
//! Built once from `Settings` at startup and shared through application state.
//! Adding a new provider only requires registering a new adapter here.

use super::adapters::{
    amazon::AmazonOAuthProvider, ebay::EbayOAuthProvider, sage::SageOAuthProvider,
};
use super::provider_trait::OAuthProvider;
use super::providers::{OAuthEndpoints, ProviderKey};
use crate::infra::settings::Settings;
use std::collections::HashMap;

pub(crate) struct OAuthProviderRegistry {
    by_key: HashMap<ProviderKey, Box<dyn OAuthProvider>>,
}

impl OAuthProviderRegistry {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let base = settings.public_base_url.as_str();
        let cfg = &settings.providers;

        let providers: Vec<Box<dyn OAuthProvider>> = vec![
            Box::new(SageOAuthProvider::new(OAuthEndpoints::from_settings(
                ProviderKey::Sage,
                &cfg.sage,
                base,
            ))),
            Box::new(EbayOAuthProvider::new(OAuthEndpoints::from_settings(
                ProviderKey::Ebay,
                &cfg.ebay,
                base,
            ))),
            Box::new(AmazonOAuthProvider::new(OAuthEndpoints::from_settings(
                ProviderKey::Amazon,
                &cfg.amazon,
                base,
            ))),
        ];

        let by_key = providers
            .into_iter()
            .map(|provider| (provider.key(), provider))
            .collect();
        Self { by_key }
    }

    /// Look up a provider by its path segment (e.g., "sage"). Unknown names yield `None`.
    pub(crate) fn get(&self, provider: &str) -> Option<&dyn OAuthProvider> {
        let key = ProviderKey::parse(provider)?;
        self.by_key.get(&key).map(|p| p.as_ref())
    }

    pub(crate) fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = ProviderKey::ALL
            .into_iter()
            .filter(|key| self.by_key.contains_key(key))
            .map(ProviderKey::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::oauth::providers::ClientAuth;

    #[test]
    fn registry_has_three_providers() {
        let reg = OAuthProviderRegistry::from_settings(&Settings::default());
        assert_eq!(reg.keys(), vec!["amazon", "ebay", "sage"]);
        assert!(reg.get("sage").is_some());
        assert!(reg.get("unknown").is_none());
        assert!(reg.get("SAGE").is_none());
    }

    #[test]
    fn adapters_frame_client_credentials_differently() {
        let reg = OAuthProviderRegistry::from_settings(&Settings::default());
        let auth = |name: &str| reg.get(name).map(|p| p.client_auth());
        assert_eq!(auth("sage"), Some(ClientAuth::Body));
        assert_eq!(auth("ebay"), Some(ClientAuth::Basic));
        assert_eq!(auth("amazon"), Some(ClientAuth::Body));
    }

    #[test]
    fn endpoints_come_from_settings() {
        let mut settings = Settings::default();
        settings.public_base_url = "https://bridge.example.com".to_string();
        settings.providers.amazon.client_id = "amzn1.application-oa2-client.1".to_string();

        let reg = OAuthProviderRegistry::from_settings(&settings);
        let amazon = reg.get("amazon").expect("amazon");
        assert_eq!(amazon.key(), ProviderKey::Amazon);
        assert_eq!(
            amazon.endpoints().client_id,
            "amzn1.application-oa2-client.1"
        );
        assert_eq!(
            amazon.endpoints().redirect_uri,
            "https://bridge.example.com/oauth/callback/amazon"
        );
        let sage = reg.get("sage").expect("sage");
        assert_eq!(
            sage.endpoints().auth_url,
            "https://oauth.accounting.sage.com/authorize"
        );
    }
}
