use std::{sync::Arc, time::Duration};

use alloy_primitives::Address;
use anyhow::{Result, anyhow};
use chain::{
    Contracts, HttpTransport,
    constants::{
        BNB_TESTNET_CHAIN_ID, BNB_TESTNET_RPC_URL, MEME_NFT_ADDRESS, MEME_STAKING_ADDRESS,
        TWITTER_ENGAGEMENT_ADDRESS,
    },
    writer::PrivateKeySigner,
};
use clap::Parser;
use process::{
    models::{BATCH_SIZE, ChainTarget, MAX_RETRIES, RefreshOptions, UPDATE_INTERVAL},
    utils::read_secret,
};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON-RPC endpoint. Without PRIVATE_KEY it must hold the sending account unlocked
    #[arg(long, env = "RPC_URL", default_value = BNB_TESTNET_RPC_URL)]
    rpc_url: String,

    #[arg(long, env = "CHAIN_ID", default_value_t = BNB_TESTNET_CHAIN_ID)]
    chain_id: u64,

    /// Unlocked sending account, defaults to the first one. Ignored with PRIVATE_KEY
    #[arg(long)]
    from: Option<Address>,

    #[arg(long, default_value_t = MEME_STAKING_ADDRESS)]
    staking: Address,

    #[arg(long, default_value_t = MEME_NFT_ADDRESS)]
    nft: Address,

    #[arg(long, default_value_t = TWITTER_ENGAGEMENT_ADDRESS)]
    engagement: Address,

    #[arg(long, default_value_t = BATCH_SIZE)]
    batch_size: u64,

    #[arg(long, default_value_t = MAX_RETRIES)]
    max_retries: u32,

    /// Seconds before a scored meme is refreshed again
    #[arg(long, default_value_t = UPDATE_INTERVAL)]
    update_interval: u64,

    /// Seconds between attempts for the same meme
    #[arg(long, default_value_t = 5)]
    retry_delay: u64,

    /// Seconds between memes
    #[arg(long, default_value_t = 2)]
    pause: u64,

    #[arg(long, default_value_t = 10_000)]
    rpc_timeout_ms: u64,

    /// Print the selection without sending anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    // Secret file or environment, never a flag
    let signer = read_secret("PRIVATE_KEY")
        .map(|key| {
            key.parse::<PrivateKeySigner>()
                .map_err(|_| anyhow!("PRIVATE_KEY is not a valid secp256k1 key"))
        })
        .transpose()?;

    let target = ChainTarget {
        chain_id: args.chain_id,
        contracts: Contracts {
            staking: args.staking,
            nft: args.nft,
            engagement: args.engagement,
        },
        signer,
        from: args.from,
    };

    let transport = Arc::new(HttpTransport::new(
        &args.rpc_url,
        Duration::from_millis(args.rpc_timeout_ms),
    ));

    let options = RefreshOptions {
        batch_size: args.batch_size,
        max_retries: args.max_retries,
        update_interval: args.update_interval,
        retry_delay: Duration::from_secs(args.retry_delay),
        pause: Duration::from_secs(args.pause),
        dry_run: args.dry_run,
    };

    println!("Starting engagement refresh...");
    process::refresh_engagement(transport, target, options).await?;
    println!("\nEngagement refresh completed!");

    Ok(())
}
