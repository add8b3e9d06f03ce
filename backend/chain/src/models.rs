use alloy_primitives::{Address, U256};

use crate::constants::{MEME_NFT_ADDRESS, MEME_STAKING_ADDRESS, TWITTER_ENGAGEMENT_ADDRESS};

/// Deployed contract addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contracts {
    pub staking: Address,
    pub nft: Address,
    pub engagement: Address,
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            staking: MEME_STAKING_ADDRESS,
            nft: MEME_NFT_ADDRESS,
            engagement: TWITTER_ENGAGEMENT_ADDRESS,
        }
    }
}

/// A meme the contract reports as existing. Absent ids never become a `Meme`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meme {
    pub id: u64,
    pub creator: Address,
    pub total_staked: U256,
    pub timestamp: u64,
    pub content_hash: String,
    pub reward_distributed: bool,
    pub engagement_score: U256,
    pub external_post_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contest {
    pub contest_id: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub ended: bool,
    pub meme_ids: Vec<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinnerNft {
    pub token_id: U256,
    pub winner: Address,
    pub total_staked: U256,
    pub contest_id: u64,
    pub meme_id: u64,
    pub timestamp: u64,
    pub original_content_hash: String,
}
