//! Environment-driven runtime configuration.

use std::env;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_DATABASE_PATH: &str = "mailrelay.db";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the `SQLite` database file.
    pub database_path: String,
    /// Cadence of the polling scheduler.
    pub poll_interval: Duration,
    /// Bot token used to post channel messages.
    pub discord_bot_token: String,
    /// Discord REST API root, overridable for testing.
    pub discord_api_base: String,
}

impl Config {
    /// Reads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Fails when `DISCORD_BOT_TOKEN` is unset or `POLL_INTERVAL_SECS` is
    /// not a positive integer.
    pub fn from_env() -> anyhow::Result<Self> {
        let discord_bot_token = env::var("DISCORD_BOT_TOKEN")
            .context("DISCORD_BOT_TOKEN must be set")?;

        let poll_interval_secs = match env::var("POLL_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw
                    .parse()
                    .context("POLL_INTERVAL_SECS must be a positive integer")?;
                if secs == 0 {
                    anyhow::bail!("POLL_INTERVAL_SECS must be a positive integer");
                }
                secs
            }
            Err(_) => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
            poll_interval: Duration::from_secs(poll_interval_secs),
            discord_bot_token,
            discord_api_base: env::var("DISCORD_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DISCORD_API_BASE.to_string()),
        })
    }
}
