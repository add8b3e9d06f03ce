use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use alloy_primitives::Address;
use anyhow::{Result, anyhow};
use chain::{
    Contracts,
    aggregate::DEFAULT_CONCURRENCY,
    constants::{
        BNB_TESTNET_CHAIN_ID, BNB_TESTNET_RPC_URL, MEME_NFT_ADDRESS, MEME_STAKING_ADDRESS,
        PINATA_GATEWAY, TWITTER_ENGAGEMENT_ADDRESS,
    },
    transport::DEFAULT_RPC_TIMEOUT,
};
use tracing::{info, warn};

pub const PINATA_PIN_FILE_ENDPOINT: &str = "https://api.pinata.cloud/pinning/pinFileToIPFS";

pub struct Config {
    pub port: u16,
    pub rpc_url: String,
    pub chain_id: u64,
    pub contracts: Contracts,
    pub fetch_concurrency: usize,
    pub rpc_timeout: Duration,
    /// Uploads answer 500 while this is missing, everything else keeps working.
    pub pinata_jwt: Option<String>,
    pub pinata_endpoint: String,
    pub ipfs_gateway: String,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            rpc_url: try_load("RPC_URL", BNB_TESTNET_RPC_URL)?,
            chain_id: try_load("CHAIN_ID", &BNB_TESTNET_CHAIN_ID.to_string())?,
            contracts: Contracts {
                staking: try_load::<Address>(
                    "MEME_STAKING_CONTRACT",
                    &MEME_STAKING_ADDRESS.to_string(),
                )?,
                nft: try_load::<Address>("MEME_NFT_CONTRACT", &MEME_NFT_ADDRESS.to_string())?,
                engagement: try_load::<Address>(
                    "TWITTER_ENGAGEMENT_CONTRACT",
                    &TWITTER_ENGAGEMENT_ADDRESS.to_string(),
                )?,
            },
            fetch_concurrency: try_load("FETCH_CONCURRENCY", &DEFAULT_CONCURRENCY.to_string())?,
            rpc_timeout: Duration::from_millis(try_load(
                "RPC_TIMEOUT_MS",
                &DEFAULT_RPC_TIMEOUT.as_millis().to_string(),
            )?),
            pinata_jwt: read_secret("PINATA_JWT"),
            pinata_endpoint: try_load("PINATA_ENDPOINT", PINATA_PIN_FILE_ENDPOINT)?,
            ipfs_gateway: try_load("IPFS_GATEWAY", PINATA_GATEWAY)?,
            cors_origin: var("CORS_ORIGIN").ok(),
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("Environment misconfigured: invalid {key} ({e})")
        })
}

/// Docker secret first, plain environment variable second.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()),
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}");

            env::var(secret_name)
                .ok()
                .map(|secret| secret.trim().to_string())
                .filter(|secret| !secret.is_empty())
        }
    }
}
