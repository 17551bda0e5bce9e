use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use poem::listener::TcpListener;
use tracing::Level;
use welcome_card_engine::core::composer::CardComposer;
use welcome_card_engine::core::fetch::{ImageResolver, ReqwestFetcher};
use welcome_card_engine::core::renderer::RenderingEngine;
use welcome_card_engine::core::store::MemorySettingsStore;
use welcome_card_engine::settings::get_config;
use welcome_card_engine::{AppState, init_openapi_route};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config().context("invalid configuration")?;

    let log_level = Level::from_str(&config.log_level).unwrap_or(Level::INFO);
    // Logging to File
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(log_level)
        .init();

    tracing::info!("Initializing Welcome Card Service...");
    tracing::info!("using {} as environment variables", config.env_source());
    tracing::info!("run with config: {:?}", config);

    let store = match &config.settings_file {
        Some(path) => MemorySettingsStore::from_file(path)?,
        None => MemorySettingsStore::new(),
    };
    tracing::info!("loaded stored defaults for {} guilds", store.len());

    let fetcher = ReqwestFetcher::new(config.fetch_timeout(), config.max_image_bytes)
        .context("failed to build http client")?;
    let resolver = ImageResolver::new(Arc::new(fetcher), &config.asset_dir, config.max_image_bytes);

    let engine = match &config.fonts_dir {
        Some(dir) => RenderingEngine::with_fonts_dir(dir),
        None => RenderingEngine::new(),
    };

    let mut composer = CardComposer::new(Arc::new(store), resolver, engine, config.settings_timeout());
    if let Some(watermark) = &config.watermark {
        composer = composer.with_watermark(watermark.clone());
    }

    // Init App State
    let app_state = Arc::new(AppState {
        composer: Arc::new(composer),
    });

    tracing::info!("Card composer initialized successfully");

    let app = init_openapi_route(app_state.clone(), &config);
    tracing::info!("run server on {}:{}", config.host, config.port);
    poem::Server::new(TcpListener::bind(format!(
        "{}:{}",
        config.host, config.port
    )))
    .run(app)
    .await?;

    Ok(())
}
