use std::sync::Arc;

use anyhow::Context;

use shopkeep_api::app::{build_app, build_services};
use shopkeep_api::config::{ApiConfig, load_catalog_seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shopkeep_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(build_services());

    if let Some(path) = &config.catalog_path {
        let products = load_catalog_seed(path)?;
        services
            .seed_catalog(products)
            .context("failed to seed catalog")?;
    }

    let app = build_app(services.clone());
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    services.shutdown();
    Ok(())
}
