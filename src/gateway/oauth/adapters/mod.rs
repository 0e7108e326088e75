//! Usage: Concrete OAuthProvider implementations.

pub(crate) mod amazon;
pub(crate) mod ebay;
pub(crate) mod sage;
