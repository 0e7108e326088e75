//! Usage: Infrastructure adapters (settings, credentials, warehouse).

pub(crate) mod credentials;
pub(crate) mod settings;
pub(crate) mod warehouse;
