//! Usage: HTTP server lifecycle (shared handler state, outbound client, bind + serve).

use crate::infra::settings::Settings;
use crate::infra::warehouse::TokenStore;
use crate::shared::error::AppResult;
use std::sync::Arc;
use std::time::Duration;

use super::listen;
use super::oauth::registry::OAuthProviderRegistry;
use super::routes::build_router;

const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Everything a handler needs. Cheap to clone; built once in `run` (or by tests).
#[derive(Clone)]
pub(crate) struct GatewayAppState {
    pub(crate) client: reqwest::Client,
    pub(crate) providers: Arc<OAuthProviderRegistry>,
    pub(crate) store: Arc<dyn TokenStore>,
    /// `dataset.table`, shown on the confirmation page.
    pub(crate) table_label: Arc<str>,
}

impl GatewayAppState {
    pub(crate) fn new(
        settings: &Settings,
        client: reqwest::Client,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            client,
            providers: Arc::new(OAuthProviderRegistry::from_settings(settings)),
            store,
            table_label: Arc::from(settings.warehouse.table_label()),
        }
    }
}

/// Outbound client shared by provider token calls and warehouse calls.
pub(crate) fn build_http_client(settings: &Settings) -> AppResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("oauth-token-bridge/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS));
    if settings.http_timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(settings.http_timeout_secs));
    }
    builder
        .build()
        .map_err(|e| format!("SYSTEM_ERROR: http client init failed: {e}").into())
}

/// Bind and serve until Ctrl+C / SIGTERM. In-flight requests are drained before returning.
pub(crate) async fn serve(settings: &Settings, state: GatewayAppState) -> AppResult<()> {
    let bind_addr = listen::format_host_port(&settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("SYSTEM_ERROR: failed to bind {bind_addr}: {e}"))?;

    let providers = state.providers.keys();
    let app = build_router(state, &settings.static_dir);
    tracing::info!(
        bind_addr = %bind_addr,
        public_base_url = %settings.public_base_url,
        providers = ?providers,
        "server listening on {}",
        listen::local_base_url(&settings.host, settings.port)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("SYSTEM_ERROR: server error: {e}"))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("graceful shutdown initiated");
}
