//! OpenSASE Pricing - plugin adapter pipeline and pricing engine service

use std::sync::Arc;

use anyhow::Result;
use opensase_pricing::api::{router, AppState};
use opensase_pricing::{EngineConfig, Plugins};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = EngineConfig::from_env()?;
    let plugins = Arc::new(Plugins::bootstrap(&config));
    let app = router(AppState { plugins }).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("OpenSASE Pricing listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
