//! Usage: OAuth authorization-code flow for the supported marketplaces and accounting systems.
//!
//! Uses the Adapter Design Pattern: each provider implements the `OAuthProvider` trait and is
//! registered in `OAuthProviderRegistry`, which handlers receive through application state.

pub(crate) mod adapters;
pub(crate) mod authorize;
pub(crate) mod provider_trait;
pub(crate) mod providers;
pub(crate) mod refresh;
pub(crate) mod registry;
pub(crate) mod token_exchange;
