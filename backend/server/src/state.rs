use std::sync::Arc;

use anyhow::{Result, bail};
use chain::{Aggregator, ContractReader, HttpTransport, transport::chain_id};
use reqwest::Client;
use tracing::info;

use super::config::Config;

pub type Reader = ContractReader<HttpTransport>;

pub struct AppState {
    pub config: Config,
    pub aggregator: Aggregator<Reader>,
    pub client: Client,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>> {
        let state = Self::from_config(Config::load()?);

        let transport = state.aggregator.reader().transport();
        info!("Checking network at {}", transport.url());
        let actual = chain_id(transport).await?;
        if actual != state.config.chain_id {
            bail!(
                "RPC endpoint is on chain {actual}, expected chain {}",
                state.config.chain_id
            );
        }

        Ok(state)
    }

    /// Wires the clients up without touching the network.
    pub fn from_config(config: Config) -> Arc<Self> {
        let client = Client::new();
        let transport = HttpTransport::with_client(client.clone(), &config.rpc_url, config.rpc_timeout);

        let reader = ContractReader::new(transport, config.contracts);
        let aggregator = Aggregator::new(Arc::new(reader), config.fetch_concurrency);

        Arc::new(Self {
            config,
            aggregator,
            client,
        })
    }
}
