use anyhow::Context;
use notion_client::NotionClient;
use reddit_client::{GalleryScraper, RedditClient};
use record_store::RecordStore;
use std::sync::Arc;
use sync_core::{AppConfig, CoreError, ErrorReporter};
use sync_engine::{SyncEngine, SyncReport};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "saved_sync=info,sync_engine=info,reddit_client=info,notion_client=info,record_store=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    tracing::info!("Starting saved-sync");

    match sync().await {
        Ok(report) => {
            tracing::info!(
                "Run {} finished: {} saved items, {} new, {} projected",
                report.run_id,
                report.fetched,
                report.new_records,
                report.projected
            );
            if !report.rejected.is_empty() {
                tracing::warn!(
                    "Notion refused {} record(s), kept for later runs unless given up: {}",
                    report.rejected.len(),
                    report.rejected.join(", ")
                );
            }
            Ok(())
        }
        Err(e) => {
            if let Some(error) = e.downcast_ref::<CoreError>() {
                ErrorReporter::new().report_error(error);
            }
            Err(e)
        }
    }
}

async fn sync() -> anyhow::Result<SyncReport> {
    let config = AppConfig::load()
        .map_err(CoreError::from)
        .context("Failed to load configuration")?;
    config
        .validate()
        .map_err(CoreError::from)
        .context("Configuration is incomplete")?;
    tracing::debug!("Configuration: {:?}", config);

    let reddit_credentials = config.reddit_credentials().map_err(CoreError::from)?;
    let notion_credentials = config.notion_credentials().map_err(CoreError::from)?;

    let source = RedditClient::new(reddit_credentials).context("Failed to build Reddit client")?;
    let resolver = GalleryScraper::new().context("Failed to build gallery scraper")?;
    let database =
        NotionClient::new(&notion_credentials).context("Failed to build Notion client")?;

    let mut engine = SyncEngine::new(
        Arc::new(source),
        Arc::new(resolver),
        Arc::new(database),
        RecordStore::new(&config.store.path),
    );

    let report = engine.run().await?;
    Ok(report)
}
