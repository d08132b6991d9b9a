use formadv::{
    api,
    core::config::IngestConfig,
    storage::{FundStorage, SqliteConfig, SqliteStorage},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = IngestConfig::from_env()?;

    let storage = SqliteStorage::connect(SqliteConfig::new(&config.database_url)).await?;
    storage.init().await?;

    let app = api::router(Arc::new(storage));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    log::info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
