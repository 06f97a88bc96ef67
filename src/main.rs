use std::env;
use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dog_breed_bot::bot;
use dog_breed_bot::classifier::OnnxClassifier;
use dog_breed_bot::config::{BotConfig, MonitoringConfig};
use dog_breed_bot::context::AppContext;
use dog_breed_bot::monitoring::{Level, Monitor, RollbarMonitor};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(monitor: Arc<dyn Monitor>) -> Result<()> {
    let config = BotConfig::from_env()?;
    let bot_token = config.validate()?.to_string();

    info!(data_path = %config.data_path.display(), "Loading breed classifier");
    let classifier = OnnxClassifier::load(&config.classifier)?;

    let ctx = Arc::new(AppContext::new(config, Arc::new(classifier), monitor)?);

    let bot = Bot::new(bot_token);

    info!("Bot initialized, starting dispatcher");

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting Dog Breed Telegram Bot");

    let monitor: Arc<dyn Monitor> = Arc::new(RollbarMonitor::new(&MonitoringConfig::from_env()));
    monitor.report_message("Starting up", Level::Info);

    let result = run(Arc::clone(&monitor)).await;
    if let Err(e) = &result {
        monitor.report_error(e, "startup");
    }

    monitor.flush().await;
    result
}
