//! Live Trello data source.
//!
//! Drives the async [`TrelloClient`] from synchronous callers by owning a
//! tokio runtime and blocking on each fetch.

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::info;

use boardpulse_adapters::trello::{HttpTransport, TrelloClient};
use boardpulse_types::Snapshot;

use super::DataSource;
use crate::config::Settings;

/// A data source that fetches the board from the Trello API on every load.
#[derive(Debug)]
pub struct TrelloSource {
    client: TrelloClient<HttpTransport>,
    runtime: Runtime,
    description: String,
}

impl TrelloSource {
    /// Build a source from settings. Missing credentials are reported here,
    /// before any request is sent.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let credentials = settings.credentials()?;

        let client = TrelloClient::builder()
            .base_url(&settings.trello.base_url)
            .credentials(credentials.api_key, credentials.token)
            .board_id(credentials.board_id)
            .timeout(settings.timeout())
            .concurrency(settings.trello.concurrency)
            .include_closed(settings.trello.include_closed)
            .build()?;

        Self::new(client)
    }

    pub fn new(client: TrelloClient<HttpTransport>) -> Result<Self> {
        let runtime = Runtime::new().context("Failed to start async runtime")?;
        let description = format!("trello: board {}", client.board_id());
        Ok(Self {
            client,
            runtime,
            description,
        })
    }

    /// Fetch board info only and describe the board reached.
    pub fn test_connection(&self) -> Result<String> {
        Ok(self.runtime.block_on(self.client.test_connection())?)
    }
}

impl DataSource for TrelloSource {
    fn load(&mut self) -> Result<Snapshot> {
        info!(board_id = self.client.board_id(), "fetching board from Trello");
        let snapshot = self.runtime.block_on(self.client.fetch_snapshot())?;
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
