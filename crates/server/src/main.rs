use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uploader_core::{
    campaign::RowSchema,
    load_config,
    media::{MediaResolver, ReqwestFetcher},
    report::{Notifier, SqliteResultSink, TracingNotifier, TwilioNotifier},
    thumbnail::ThumbnailExtractor,
    validate_config, BatchUploader, GraphApiClient, NotifierConfig, RetryExecutor, SagaRunner,
    TaskPlanner,
};

use uploader_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("UPLOADER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        hash = &config_hash[..16],
        platforms = config.platforms.len(),
        "Configuration loaded"
    );
    info!("Database path: {:?}", config.database.path);

    // Media and thumbnails
    let fetcher = ReqwestFetcher::new(&config.media.user_agent)
        .context("Failed to create media fetcher")?;
    let resolver = MediaResolver::new(
        Arc::new(fetcher),
        RetryExecutor::new(config.retry.clone()),
        config.media.clone(),
    );
    let thumbnails = ThumbnailExtractor::new(config.thumbnail.clone());

    // Saga runner with one Graph API client per platform key
    let mut runner = SagaRunner::new(
        RetryExecutor::new(config.retry.clone()),
        Arc::new(resolver),
        Arc::new(thumbnails),
        config.defaults.clone(),
        config.targeting.clone(),
    );
    for (key, platform) in &config.platforms {
        let client = GraphApiClient::new(platform.graph_config())
            .with_context(|| format!("Failed to create Graph API client for '{}'", key))?;
        info!(platform = %key, account = %platform.ad_account_id, "Registered platform");
        runner = runner.with_platform(key, Arc::new(client));
    }

    let planner = TaskPlanner::new(
        RowSchema::default(),
        config.planner.clone(),
        config.platform_targets(),
    );

    // Result history
    let results = Arc::new(
        SqliteResultSink::new(&config.database.path).context("Failed to create result store")?,
    );
    info!("Result store initialized");

    let notifier: Arc<dyn Notifier> = match &config.notifier {
        Some(NotifierConfig::Twilio(twilio)) => {
            info!("Batch summaries go to SMS");
            Arc::new(TwilioNotifier::new(twilio.clone()).context("Failed to create notifier")?)
        }
        Some(NotifierConfig::Log) | None => Arc::new(TracingNotifier),
    };

    let uploader = BatchUploader::new(planner, Arc::new(runner))
        .with_sink(results.clone())
        .with_notifier(notifier)
        .with_pool_size(config.scheduler.pool_size);
    info!(pool_size = uploader.pool_size(), "Uploader ready");

    let state = Arc::new(AppState::new(config.clone(), Arc::new(uploader), results));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
