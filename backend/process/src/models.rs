use std::time::Duration;

use alloy_primitives::Address;
use chain::{Contracts, writer::PrivateKeySigner};

pub const BATCH_SIZE: u64 = 10;
pub const MAX_RETRIES: u32 = 3;
/// Two hours between refreshes of the same meme.
pub const UPDATE_INTERVAL: u64 = 2 * 60 * 60;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const PAUSE_BETWEEN_MEMES: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct RefreshOptions {
    pub batch_size: u64,
    pub max_retries: u32,
    pub update_interval: u64,
    pub retry_delay: Duration,
    pub pause: Duration,
    pub dry_run: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            max_retries: MAX_RETRIES,
            update_interval: UPDATE_INTERVAL,
            retry_delay: RETRY_DELAY,
            pause: PAUSE_BETWEEN_MEMES,
            dry_run: false,
        }
    }
}

/// A meme picked for a metrics request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub meme_id: u64,
    pub external_post_id: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub total_memes: u64,
    pub skipped: usize,
    pub unreadable: usize,
    pub selected: usize,
    pub requested: usize,
    pub failed: usize,
}

/// Which chain the job talks to and who it sends as.
#[derive(Clone)]
pub struct ChainTarget {
    pub chain_id: u64,
    pub contracts: Contracts,
    /// Signs locally when set, `from` is ignored then.
    pub signer: Option<PrivateKeySigner>,
    /// Unlocked account on the endpoint, the first one when unset.
    pub from: Option<Address>,
}
