//! Usage: Process-level wiring (logging).

pub(crate) mod logging;
