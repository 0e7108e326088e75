//! Usage: Refresh decision and execution for the latest stored token of a provider.

use super::provider_trait::OAuthProvider;
use super::token_exchange::refresh_access_token;
use crate::domain::token_persistence::persist_token;
use crate::domain::token_records::{carry_refresh_token, TokenRecord};
use crate::infra::warehouse::TokenStore;
use crate::shared::error::AppResult;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    /// No row for the provider yet.
    NoToken,
    /// Latest row is stale but carries nothing to refresh with.
    NoRefreshToken,
    /// Latest row is still valid past the freshness margin; nothing was written.
    StillFresh(TokenRecord),
    /// A refresh grant succeeded and its row was appended.
    Refreshed(TokenRecord),
}

pub(crate) async fn ensure_fresh_token(
    client: &reqwest::Client,
    provider: &dyn OAuthProvider,
    store: &dyn TokenStore,
    now: DateTime<Utc>,
) -> AppResult<RefreshOutcome> {
    let key = provider.key();
    let Some(latest) = store.latest_token(key.as_str()).await? else {
        return Ok(RefreshOutcome::NoToken);
    };
    if latest.is_fresh(now) {
        return Ok(RefreshOutcome::StillFresh(latest));
    }
    let Some(refresh_token) = latest.refresh_token.as_deref().filter(|v| !v.is_empty()) else {
        return Ok(RefreshOutcome::NoRefreshToken);
    };

    let mut payload = refresh_access_token(client, provider, refresh_token).await?;
    carry_refresh_token(&mut payload, Some(refresh_token));
    let record = persist_token(store, key.as_str(), &payload).await?;
    tracing::info!(provider = %key, "refreshed access token");
    Ok(RefreshOutcome::Refreshed(record))
}
