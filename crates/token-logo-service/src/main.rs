use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sandboxed_object_store::SandboxedStore;
use token_logo_service::{
    config::Config,
    providers::build_providers,
    registry::HttpTokenRegistry,
    storage::{FileImageStore, ImageStore},
    sync::SyncService,
    utils::build_client,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "token-logo-service")]
#[command(version)]
#[command(about = "Fetches, stores and serves blockchain token logos")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("token_logo_service={},tower_http=trace", cli.log_level)
    } else {
        format!("token_logo_service={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config)?;
    config.apply_env_overrides();
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    info!(
        "Starting token-logo-service v{} (config: {})",
        env!("CARGO_PKG_VERSION"),
        cli.config
    );

    let provider_http = build_client(config.sync.download_timeout)?;
    let registry_http = build_client(config.registry.timeout)?;

    let object_store = SandboxedStore::builder()
        .base_directory(&config.storage.object_store_path)
        .build()
        .await
        .with_context(|| {
            format!(
                "Failed to open image store at {}",
                config.storage.object_store_path
            )
        })?;
    let image_store: Arc<dyn ImageStore> = Arc::new(FileImageStore::new(object_store));
    info!("Image store: {}", config.storage.object_store_path);

    let providers = build_providers(
        &config.providers,
        &config.storage.local_images_path,
        provider_http.clone(),
    )?;

    let registry = Arc::new(HttpTokenRegistry::new(
        registry_http,
        config.registry.base_url.clone(),
    ));
    info!("Token registry: {}", config.registry.base_url);

    let sync_service = SyncService::new(
        registry,
        image_store.clone(),
        providers.local,
        providers.chain.clone(),
        provider_http,
        &config.sync,
    );

    let state = AppState::new(sync_service, image_store, providers.chain, config.web.clone());
    WebServer::new(state)?.serve().await
}
