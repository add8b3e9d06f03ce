use alloy_primitives::{Address, address};

pub const BNB_TESTNET_CHAIN_ID: u64 = 97;
pub const BNB_TESTNET_RPC_URL: &str = "https://data-seed-prebsc-1-s1.binance.org:8545/";

pub const MEME_STAKING_ADDRESS: Address = address!("79593ac71642f42bdbde4eb5d1e8260c0019e4f7");
pub const MEME_NFT_ADDRESS: Address = address!("1486cF91b47D3055512E58D40f414F445EFB134E");
pub const TWITTER_ENGAGEMENT_ADDRESS: Address =
    address!("6A94bE0044A41B59dD072Ef232e9efC5747E331D");

/// Native currency precision, BNB uses the same 18 decimals as ether.
pub const NATIVE_DECIMALS: usize = 18;

// Deployment settings, mirrored from the contract constructor arguments
pub const MEME_STAKE_DELAY: u64 = 30;
pub const CONTEST_DURATION: u64 = 86_400;
pub const CONTEST_END_GRACE_PERIOD: u64 = 3_600;
pub const MIN_STAKE_AMOUNT: &str = "0.001";

pub const PINATA_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";
