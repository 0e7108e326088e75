//! Usage: Append-only token table (store trait + BigQuery implementation).
//!
//! The table is the only state shared between requests. Writes are blind appends and reads are
//! snapshot queries, so the store never needs locking or read-modify-write.

pub(crate) mod auth;
pub(crate) mod bigquery;

use crate::domain::token_records::TokenRecord;
use crate::shared::error::AppResult;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Warehouse operations the HTTP layer depends on.
///
/// Object-safe so handlers hold an `Arc<dyn TokenStore>` and tests can swap in an in-memory store.
pub trait TokenStore: Send + Sync {
    /// Append one row. No transaction, no retry, no idempotency key.
    fn insert_token<'a>(&'a self, record: &'a TokenRecord) -> BoxFuture<'a, AppResult<()>>;

    /// The row with the greatest `obtained_at` for `provider`, if any.
    fn latest_token<'a>(
        &'a self,
        provider: &'a str,
    ) -> BoxFuture<'a, AppResult<Option<TokenRecord>>>;
}
