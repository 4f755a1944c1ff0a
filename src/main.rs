use anyhow::Context;
use background_service::BackgroundService;
use cleaner_core::{AppConfig, BannerSeverity, ErrorSink, Message, MessageBus, TracingErrorSink};
use comment_classifier::GeminiClient;
use comment_extractor::PageDocument;
use comment_pipeline::{ChangeWatcher, CommentPipeline, StartOutcome};
use database::state::{load_settings, seed_api_key};
use database::{Database, StateStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let (filter, filter_handle) = reload::Layer::new(EnvFilter::new(&config.logging.default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    tracing::info!("Starting Comment Cleaner");

    let mut database = Database::new(config.database_url.clone());
    database.connect().await?;
    database.run_migrations().await?;
    let database = Arc::new(database);
    let store: Arc<dyn StateStore> = database.clone();

    let bus = MessageBus::new();
    let sink: Arc<dyn ErrorSink> = Arc::new(TracingErrorSink::new());

    let background = BackgroundService::new(
        config.background.sweep_interval_hours,
        store.clone(),
        bus.clone(),
        sink.clone(),
    );
    let installed = background.install().await?;
    if !installed.is_empty() {
        tracing::info!(keys = installed.len(), "Installed default settings");
    }
    if let Some(api_key) = &config.api_key {
        if seed_api_key(store.as_ref(), api_key).await? {
            tracing::info!("API key seeded from environment");
        }
    }

    let settings = load_settings(store.as_ref()).await?;
    set_verbose(&filter_handle, &config, settings.verbose_logging);

    let host_messages = tokio::spawn(handle_host_messages(
        bus.subscribe(),
        filter_handle,
        config.clone(),
    ));
    background.start().await?;

    let document = match &config.pipeline.snapshot_path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read page snapshot {path}"))?;
            PageDocument::parse(config.pipeline.page_url.clone(), &source)
        }
        None => PageDocument::empty(config.pipeline.page_url.clone()),
    };

    let backend = Arc::new(GeminiClient::from_config(&config.gemini));
    let pipeline = CommentPipeline::new(document, store.clone(), backend, bus.clone(), sink);

    match pipeline.start().await {
        StartOutcome::Ready => {
            let watcher =
                ChangeWatcher::attach(&pipeline, bus.subscribe(), config.pipeline.debounce());
            watcher.run(shutdown_signal()).await;
        }
        StartOutcome::MissingApiKey => {
            tracing::warn!("Set an API key to start cleaning comments");
            shutdown_signal().await;
        }
    }

    tracing::info!(
        suppressed = pipeline.suppressed_count(),
        hidden = pipeline.document().hidden_count(),
        "Shutting down"
    );

    background.stop().await?;
    host_messages.abort();
    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

fn set_verbose(handle: &FilterHandle, config: &AppConfig, verbose: bool) {
    let directives = if verbose {
        &config.logging.verbose_filter
    } else {
        &config.logging.default_filter
    };
    if let Err(e) = handle.reload(EnvFilter::new(directives)) {
        tracing::warn!("Failed to update log filter: {}", e);
    }
}

/// Renders banners as log lines and applies log verbosity changes.
async fn handle_host_messages(
    mut messages: broadcast::Receiver<Message>,
    filter_handle: FilterHandle,
    config: AppConfig,
) {
    loop {
        match messages.recv().await {
            Ok(Message::ShowBanner { message, severity }) => match severity {
                BannerSeverity::Error => tracing::error!(banner = %message),
                BannerSeverity::Warning => tracing::warn!(banner = %message),
                BannerSeverity::Info | BannerSeverity::Success => {
                    tracing::info!(banner = %message)
                }
            },
            Ok(Message::VerboseLoggingChanged { verbose }) => {
                set_verbose(&filter_handle, &config, verbose);
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Host message listener lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
