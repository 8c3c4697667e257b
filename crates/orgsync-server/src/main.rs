//! OrgSync Server — application entry point.

use orgsync_db::{DbConfig, DbManager};
use orgsync_engine::EngineConfig;
use orgsync_server::{AppState, ServerConfig, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("orgsync=info".parse()?),
        )
        .json()
        .init();

    tracing::info!("Starting OrgSync server...");

    let server_config = ServerConfig::from_env();
    let db_config = DbConfig::from_env();

    let manager = DbManager::connect(&db_config).await?;
    orgsync_db::run_migrations(manager.client()).await?;

    let state = AppState::new(manager.client().clone(), EngineConfig::default());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    tracing::info!(addr = %server_config.bind_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
