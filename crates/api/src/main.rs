use anyhow::Context;

use flowgic_api::{ApiConfig, app::build_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    flowgic_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let app = build_app(&config).context("failed to start background workers")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
