use std::env;

use anyhow::Result;
use reviser_api::build_app;
use reviser_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("reviser_api");

    let bind = env::var("REVISER_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

    let app = build_app().await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "coursebook reviser api started");

    axum::serve(listener, app).await?;
    Ok(())
}
