//! Usage: Turn a provider token payload into a table row and append it.

use crate::domain::token_records::{TokenPayload, TokenRecord};
use crate::infra::warehouse::TokenStore;
use crate::shared::error::AppResult;

/// Append one row for `payload`, stamped with the current time. Every call appends; nothing
/// is deduplicated or updated in place.
pub(crate) async fn persist_token(
    store: &dyn TokenStore,
    provider: &str,
    payload: &TokenPayload,
) -> AppResult<TokenRecord> {
    let record = TokenRecord::from_payload(provider, payload, crate::shared::time::now_utc());
    store.insert_token(&record).await?;
    Ok(record)
}
