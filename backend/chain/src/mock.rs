//! Test doubles: a scripted JSON-RPC transport and an in-memory contract.
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use alloy_primitives::{Address, U256, hex};
use alloy_sol_types::SolValue;
use serde_json::{Value, json};

use crate::{
    constants::{CONTEST_DURATION, MEME_STAKE_DELAY},
    error::{ChainError, Fetch},
    models::{Contest, Meme, WinnerNft},
    reader::{NftReader, StakingReader},
    transport::Transport,
    units::parse_amount,
};

/// Answers requests in order from a fixed script and records the methods it saw.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Value, ChainError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Result<Value, ChainError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn params(&self, index: usize) -> Value {
        self.calls.lock().unwrap()[index].1.clone()
    }
}

impl Transport for ScriptedTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChainError::Connection(format!("no scripted reply for {method}"))))
    }
}

/// `eth_call` reply carrying `value` ABI-encoded.
pub fn call_output(value: impl SolValue) -> Result<Value, ChainError> {
    Ok(json!(hex::encode_prefixed(value.abi_encode())))
}

/// `eth_call` reply to `memes(id)` for an existing meme.
pub fn meme_record(meme: &Meme) -> Result<Value, ChainError> {
    let record = (
        U256::from(meme.id),
        meme.creator,
        meme.total_staked,
        U256::from(meme.timestamp),
        meme.content_hash.clone(),
        true,
        meme.reward_distributed,
        meme.engagement_score,
        meme.external_post_id.clone(),
    );

    Ok(json!(hex::encode_prefixed(record.abi_encode_params())))
}

pub fn wei(amount: &str) -> U256 {
    parse_amount(amount).unwrap()
}

pub fn user(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn meme(id: u64, creator: Address, staked: &str) -> Meme {
    Meme {
        id,
        creator,
        total_staked: wei(staked),
        timestamp: 1_700_000_000 + id,
        content_hash: format!("QmMeme{id}"),
        reward_distributed: false,
        engagement_score: U256::ZERO,
        external_post_id: format!("tweet-{id}"),
    }
}

/// In-memory stand-in for the three contracts.
#[derive(Default)]
pub struct MemoryChain {
    pub next_meme_id: u64,
    pub memes: HashMap<u64, Meme>,
    pub failing: HashSet<u64>,
    pub stakes: HashMap<(u64, Address), U256>,
    pub staked_memes: HashMap<Address, Vec<u64>>,
    pub stakers: HashMap<u64, Vec<Address>>,
    pub stakeable_flags: HashMap<u64, bool>,
    pub contest: Option<Contest>,
    pub winners: HashMap<u64, u64>,
    pub submitted: HashSet<Address>,
    pub nfts: HashMap<U256, WinnerNft>,
    pub owned: HashMap<Address, Vec<U256>>,
    pub contest_tokens: HashMap<u64, U256>,
    pub failing_tokens: HashSet<U256>,
    /// Overrides the balance derived from `owned`.
    pub reported_balance: Option<u64>,
    pub failing_winner: bool,
    pub failing_submitted: bool,
}

impl MemoryChain {
    /// Memes occupy ids in order, `next_meme_id` follows the highest one.
    pub fn with_memes(memes: impl IntoIterator<Item = Meme>) -> Self {
        let mut chain = Self {
            next_meme_id: 1,
            ..Self::default()
        };

        for meme in memes {
            chain.next_meme_id = chain.next_meme_id.max(meme.id + 1);
            chain.memes.insert(meme.id, meme);
        }

        chain
    }

    pub fn stake(&mut self, meme_id: u64, staker: Address, amount: &str) {
        let amount = wei(amount);

        *self.stakes.entry((meme_id, staker)).or_default() += amount;
        self.staked_memes.entry(staker).or_default().push(meme_id);
        self.stakers.entry(meme_id).or_default().push(staker);

        if let Some(meme) = self.memes.get_mut(&meme_id) {
            meme.total_staked += amount;
        }
    }

    pub fn mint(&mut self, nft: WinnerNft) {
        self.owned.entry(nft.winner).or_default().push(nft.token_id);
        self.contest_tokens.insert(nft.contest_id, nft.token_id);
        self.nfts.insert(nft.token_id, nft);
    }
}

impl StakingReader for MemoryChain {
    async fn next_meme_id(&self) -> Result<u64, ChainError> {
        Ok(self.next_meme_id)
    }

    async fn meme(&self, id: u64) -> Fetch<Meme> {
        if self.failing.contains(&id) {
            return Fetch::Failed(ChainError::Connection(format!("meme {id} unreachable")));
        }

        match self.memes.get(&id) {
            Some(meme) if id > 0 && id < self.next_meme_id => Fetch::Found(meme.clone()),
            _ => Fetch::NotFound,
        }
    }

    async fn user_stake(&self, meme_id: u64, user: Address) -> Result<U256, ChainError> {
        Ok(self
            .stakes
            .get(&(meme_id, user))
            .copied()
            .unwrap_or_default())
    }

    async fn user_staked_memes(&self, user: Address) -> Result<Vec<u64>, ChainError> {
        Ok(self.staked_memes.get(&user).cloned().unwrap_or_default())
    }

    async fn user_memes(&self, user: Address) -> Result<Vec<u64>, ChainError> {
        let mut ids: Vec<u64> = self
            .memes
            .values()
            .filter(|meme| meme.creator == user)
            .map(|meme| meme.id)
            .collect();
        ids.sort_unstable();

        Ok(ids)
    }

    async fn meme_stakers(&self, meme_id: u64) -> Result<Vec<Address>, ChainError> {
        Ok(self.stakers.get(&meme_id).cloned().unwrap_or_default())
    }

    async fn current_contest(&self) -> Fetch<Contest> {
        match &self.contest {
            Some(contest) => Fetch::Found(contest.clone()),
            None => Fetch::NotFound,
        }
    }

    async fn contest_winner(&self, contest_id: u64) -> Result<Option<u64>, ChainError> {
        if self.failing_winner {
            return Err(ChainError::Connection("winner unreachable".into()));
        }

        Ok(self.winners.get(&contest_id).copied())
    }

    async fn is_meme_stakeable(&self, meme_id: u64) -> Result<bool, ChainError> {
        Ok(self.stakeable_flags.get(&meme_id).copied().unwrap_or(true))
    }

    async fn meme_stakeable_time(&self, meme_id: u64) -> Result<u64, ChainError> {
        Ok(self
            .memes
            .get(&meme_id)
            .map(|meme| meme.timestamp + MEME_STAKE_DELAY)
            .unwrap_or_default())
    }

    async fn min_stake_amount(&self) -> Result<U256, ChainError> {
        Ok(wei("0.001"))
    }

    async fn contest_duration(&self) -> Result<u64, ChainError> {
        Ok(CONTEST_DURATION)
    }

    async fn current_contest_id(&self) -> Result<u64, ChainError> {
        Ok(self
            .contest
            .as_ref()
            .map(|contest| contest.contest_id)
            .unwrap_or_default())
    }

    async fn has_user_submitted_in_current_contest(
        &self,
        user: Address,
    ) -> Result<bool, ChainError> {
        if self.failing_submitted {
            return Err(ChainError::Connection("submission status unreachable".into()));
        }

        Ok(self.submitted.contains(&user))
    }

    async fn has_user_submitted_in_contest(
        &self,
        _contest_id: u64,
        user: Address,
    ) -> Result<bool, ChainError> {
        Ok(self.submitted.contains(&user))
    }
}

impl NftReader for MemoryChain {
    async fn nft_balance(&self, owner: Address) -> Result<u64, ChainError> {
        if let Some(balance) = self.reported_balance {
            return Ok(balance);
        }

        Ok(self.owned.get(&owner).map_or(0, |tokens| tokens.len() as u64))
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: u64) -> Result<U256, ChainError> {
        self.owned
            .get(&owner)
            .and_then(|tokens| tokens.get(index as usize))
            .copied()
            .ok_or_else(|| ChainError::Reverted("owner index out of bounds".into()))
    }

    async fn winner_info(&self, token_id: U256) -> Fetch<WinnerNft> {
        if self.failing_tokens.contains(&token_id) {
            return Fetch::Failed(ChainError::Connection(format!("token {token_id} unreachable")));
        }

        match self.nfts.get(&token_id) {
            Some(nft) => Fetch::Found(nft.clone()),
            None => Fetch::NotFound,
        }
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, ChainError> {
        Ok(format!("ipfs://QmMetadata{token_id}"))
    }

    async fn nft_total_supply(&self) -> Result<u64, ChainError> {
        Ok(self.nfts.len() as u64)
    }

    async fn meme_has_nft(&self, meme_id: u64) -> Result<bool, ChainError> {
        Ok(self.nfts.values().any(|nft| nft.meme_id == meme_id))
    }

    async fn token_for_contest(&self, contest_id: u64) -> Result<Option<U256>, ChainError> {
        Ok(self.contest_tokens.get(&contest_id).copied())
    }
}
