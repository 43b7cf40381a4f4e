use anyhow::Result;
use medallion_core::Template;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;

use config::Config;
use http::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("medalliond starting");

    let config = Config::from_env();

    // Template is required; the daemon is useless without it.
    let template = Template::load(&config.template_path)?;
    tracing::info!(
        path = %config.template_path.display(),
        width = template.width(),
        height = template.height(),
        placement = ?template.placement(),
        "template loaded"
    );

    // The detector is auxiliary: without a model the daemon still
    // renders, and /detect answers 503.
    let detector = if config.detector_enabled {
        match engine::spawn_detector(&config.detector_model) {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(error = %err, "face detector unavailable; /detect disabled");
                None
            }
        }
    } else {
        tracing::info!("face detector disabled via MEDALLION_DETECTOR_ENABLED=0");
        None
    };

    let state = Arc::new(AppState { template, detector });
    let app = http::create_router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "medalliond ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("medalliond shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
