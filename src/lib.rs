mod app;
mod domain;
mod gateway;
mod infra;
mod shared;
pub mod test_support;

pub(crate) use shared::blocking;

use gateway::server::{self, build_http_client, GatewayAppState};
use infra::credentials;
use infra::settings::{process_env, Settings};
use infra::warehouse::auth::WarehouseAuth;
use infra::warehouse::bigquery::BigQueryTokenStore;
use shared::error::AppResult;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Process entry point: logging, settings, warehouse wiring, then serve until shutdown.
pub fn run() -> ExitCode {
    let log_dir = process_env(app::logging::LOG_DIR_ENV).map(PathBuf::from);
    let _logging = app::logging::init(log_dir.as_deref());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("tokio runtime init failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(start()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("server exited with error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> AppResult<()> {
    let settings = Settings::load();
    let client = build_http_client(&settings)?;

    let resolved = credentials::resolve(&process_env, settings.warehouse.project_id.as_deref());
    tracing::info!(
        source = %resolved.source,
        project_id = ?resolved.project_id,
        table = %settings.warehouse.table_label(),
        "warehouse credentials resolved"
    );

    let auth = WarehouseAuth::new(client.clone(), resolved.credentials);
    let store = BigQueryTokenStore::new(
        client.clone(),
        auth,
        resolved.project_id,
        &settings.warehouse,
    );
    let state = GatewayAppState::new(&settings, client, Arc::new(store));
    server::serve(&settings, state).await
}
