//! mailrelay - polls mailboxes over Microsoft Graph and relays unread mail
//! to Discord channels.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod notify;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailrelay_core::{DeliveryPipeline, GraphMailboxProvider, Scheduler, Store};

use config::Config;
use notify::DiscordNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailrelay=info,mailrelay_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = Store::open(&config.database_path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    let http = reqwest::Client::new();
    let provider = GraphMailboxProvider::new();
    let notifier = DiscordNotifier::new(http, &config.discord_bot_token, &config.discord_api_base);

    let pipeline = DeliveryPipeline::new(store.clone(), provider, notifier);
    let scheduler = Scheduler::new(store, pipeline, config.poll_interval);

    info!(
        database = %config.database_path,
        interval_secs = config.poll_interval.as_secs(),
        "Starting mailrelay"
    );

    scheduler.run().await;

    Ok(())
}
