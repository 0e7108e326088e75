//! Usage: HTTP surface (routes, OAuth flow, server lifecycle).

mod listen;
pub(crate) mod oauth;
pub(crate) mod routes;
pub(crate) mod server;
