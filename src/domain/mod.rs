//! Usage: Domain modules (token rows and the use-cases that write them).

pub(crate) mod token_persistence;
pub(crate) mod token_records;
