/// Bartargasht Tour Bot
///
/// A Telegram bot that sells tours from a static catalog.
///
/// The bot:
/// - Greets users with a menu of the cheapest and best-rated tours
/// - Searches the catalog by destination or category keyword
/// - Falls back to a language model for questions the catalog can't answer
/// - Logs every message with its sender's handle as a sales lead

use anyhow::Result;
use std::sync::Arc;
use tour_sales_bot::{
    bot,
    catalog::Catalog,
    completion::{CompletionClient, OpenAICompletion},
    config,
    handlers::TourAssistant,
    http_server::{self, AppState},
    leads::{LeadStore, SqliteLeadStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    pretty_env_logger::init();

    log::info!("Starting Bartargasht Tour Bot...");

    // Load configuration from environment
    let cfg = config::Config::from_env()?;
    cfg.validate()?;

    let catalog = Arc::new(Catalog::load(&cfg.tours_file, cfg.catalog_load_policy)?);

    let lead_store = SqliteLeadStore::connect(&cfg.database_url).await?;
    lead_store.initialize().await?;
    let leads: Arc<dyn LeadStore> = Arc::new(lead_store);

    let completion = OpenAICompletion::from_config(&cfg)?
        .map(|client| Arc::new(client) as Arc<dyn CompletionClient>);

    let assistant = Arc::new(TourAssistant::new(catalog, leads, completion));

    if let Some(port) = cfg.health_port {
        let state = AppState {
            assistant: assistant.clone(),
        };
        tokio::spawn(async move {
            if let Err(e) = http_server::start_server(state, port).await {
                log::error!("HTTP server stopped: {:?}", e);
            }
        });
    }

    // Run the bot
    bot::run_bot(cfg, assistant).await?;

    Ok(())
}
