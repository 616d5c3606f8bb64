use anyhow::{Context, Result};
use aws_sdk_s3::Client as S3Client;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_relay::api::{self, AppContext};
use audio_relay::fetch::ToolFetcher;
use audio_relay::records::RestRecorder;
use audio_relay::storage::S3Store;
use audio_relay::{Config, Pipeline};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config.validate().context("invalid configuration")?;

    let fetcher = ToolFetcher::new(&config);

    // Non-fatal: tools may still be installed at request time
    for warning in fetcher.check_tools().await {
        tracing::warn!("Dependency check: {}", warning);
    }

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(config.region())
        .load()
        .await;
    let store = S3Store::new(
        S3Client::new(&aws_config),
        config.storage_bucket.clone(),
        config.aws_region.clone(),
        config.public_base_url.clone(),
    );

    let recorder = RestRecorder::new(
        config.database_api_url.clone(),
        config.database_api_key.clone(),
        config.audio_table.clone(),
    );

    let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(store), Arc::new(recorder))
        .context("failed to create processing pipeline")?;
    tracing::debug!("Scratch directory: {}", pipeline.scratch_dir().display());

    let app = api::router(AppContext {
        pipeline: Arc::new(pipeline),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Running on {}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
