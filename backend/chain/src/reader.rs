//! # Chain Reader
//!
//! Read-only accessors, one `eth_call` each.
//!
//! Record lookups return [`Fetch`] so callers can tell "the contract says there is no such meme"
//! apart from "the node never answered". Scalar reads return `Result` and never default silently.
use std::future::Future;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    abi::{IMemeNFT, IMemeStaking, ITwitterEngagement},
    error::{ChainError, Fetch},
    models::{Contest, Contracts, Meme, WinnerNft},
    transport::{Transport, eth_call},
};

pub trait StakingReader: Send + Sync {
    fn next_meme_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn meme(&self, id: u64) -> impl Future<Output = Fetch<Meme>> + Send;

    fn user_stake(
        &self,
        meme_id: u64,
        user: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn user_staked_memes(
        &self,
        user: Address,
    ) -> impl Future<Output = Result<Vec<u64>, ChainError>> + Send;

    fn user_memes(&self, user: Address)
    -> impl Future<Output = Result<Vec<u64>, ChainError>> + Send;

    fn meme_stakers(
        &self,
        meme_id: u64,
    ) -> impl Future<Output = Result<Vec<Address>, ChainError>> + Send;

    fn current_contest(&self) -> impl Future<Output = Fetch<Contest>> + Send;

    /// `None` until the contest has a winner.
    fn contest_winner(
        &self,
        contest_id: u64,
    ) -> impl Future<Output = Result<Option<u64>, ChainError>> + Send;

    fn is_meme_stakeable(&self, meme_id: u64)
    -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn meme_stakeable_time(
        &self,
        meme_id: u64,
    ) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn min_stake_amount(&self) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn contest_duration(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn current_contest_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn has_user_submitted_in_current_contest(
        &self,
        user: Address,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn has_user_submitted_in_contest(
        &self,
        contest_id: u64,
        user: Address,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;
}

pub trait NftReader: Send + Sync {
    fn nft_balance(&self, owner: Address) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn token_of_owner_by_index(
        &self,
        owner: Address,
        index: u64,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    fn winner_info(&self, token_id: U256) -> impl Future<Output = Fetch<WinnerNft>> + Send;

    fn token_uri(&self, token_id: U256)
    -> impl Future<Output = Result<String, ChainError>> + Send;

    fn nft_total_supply(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn meme_has_nft(&self, meme_id: u64) -> impl Future<Output = Result<bool, ChainError>> + Send;

    /// `None` when no NFT was minted for the contest.
    fn token_for_contest(
        &self,
        contest_id: u64,
    ) -> impl Future<Output = Result<Option<U256>, ChainError>> + Send;
}

pub struct ContractReader<T> {
    transport: T,
    contracts: Contracts,
}

impl<T: Transport> ContractReader<T> {
    pub fn new(transport: T, contracts: Contracts) -> Self {
        Self {
            transport,
            contracts,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call<C>(&self, to: Address, call: C) -> Result<C::Return, ChainError>
    where
        C: SolCall + Send,
    {
        let output = eth_call(&self.transport, to, &call.abi_encode()).await?;

        Ok(C::abi_decode_returns(&output, true)?)
    }

    async fn load_meme(&self, id: u64) -> Result<Option<Meme>, ChainError> {
        if id == 0 {
            return Ok(None);
        }

        let raw = self
            .call(
                self.contracts.staking,
                IMemeStaking::memesCall {
                    memeId: U256::from(id),
                },
            )
            .await?;

        // Unknown ids come back zeroed rather than reverting
        if !raw.exists || raw.id.is_zero() {
            return Ok(None);
        }

        Ok(Some(Meme {
            id,
            creator: raw.creator,
            total_staked: raw.totalStaked,
            timestamp: to_u64(raw.timestamp, "timestamp")?,
            content_hash: raw.ipfsHash,
            reward_distributed: raw.rewardDistributed,
            engagement_score: raw.engagementScore,
            external_post_id: raw.tweetId,
        }))
    }

    async fn load_contest(&self) -> Result<Option<Contest>, ChainError> {
        let raw = self
            .call(
                self.contracts.staking,
                IMemeStaking::getCurrentContestCall {},
            )
            .await?
            .contest;

        if raw.id.is_zero() {
            return Ok(None);
        }

        Ok(Some(Contest {
            contest_id: to_u64(raw.id, "contest id")?,
            start_time: to_u64(raw.startTime, "start time")?,
            end_time: to_u64(raw.endTime, "end time")?,
            ended: raw.ended,
            meme_ids: to_ids(raw.memeIds)?,
        }))
    }

    async fn load_winner_info(&self, token_id: U256) -> Result<Option<WinnerNft>, ChainError> {
        let info = self
            .call(
                self.contracts.nft,
                IMemeNFT::getWinnerInfoCall { tokenId: token_id },
            )
            .await?
            .info;

        if info.winner == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(WinnerNft {
            token_id,
            winner: info.winner,
            total_staked: U256::from(info.totalStaked.to::<u128>()),
            contest_id: info.contestId,
            meme_id: info.memeId,
            timestamp: info.timestamp,
            original_content_hash: info.originalMemeHash,
        }))
    }

    pub async fn latest_request_id(&self) -> Result<B256, ChainError> {
        Ok(self
            .call(
                self.contracts.engagement,
                ITwitterEngagement::latestRequestIdCall {},
            )
            .await?
            ._0)
    }

    pub async fn request_meme_id(&self, request_id: B256) -> Result<Option<u64>, ChainError> {
        let meme_id = self
            .call(
                self.contracts.engagement,
                ITwitterEngagement::requestIdToMemeIdCall {
                    requestId: request_id,
                },
            )
            .await?
            ._0;

        Ok(Some(to_u64(meme_id, "meme id")?).filter(|id| *id != 0))
    }
}

impl<T: Transport> StakingReader for ContractReader<T> {
    async fn next_meme_id(&self) -> Result<u64, ChainError> {
        let next = self
            .call(self.contracts.staking, IMemeStaking::nextMemeIdCall {})
            .await?
            ._0;

        to_u64(next, "next meme id")
    }

    async fn meme(&self, id: u64) -> Fetch<Meme> {
        self.load_meme(id).await.into()
    }

    async fn user_stake(&self, meme_id: u64, user: Address) -> Result<U256, ChainError> {
        Ok(self
            .call(
                self.contracts.staking,
                IMemeStaking::getUserStakeCall {
                    memeId: U256::from(meme_id),
                    user,
                },
            )
            .await?
            ._0)
    }

    async fn user_staked_memes(&self, user: Address) -> Result<Vec<u64>, ChainError> {
        let ids = self
            .call(
                self.contracts.staking,
                IMemeStaking::getUserStakedMemesCall { user },
            )
            .await?
            ._0;

        to_ids(ids)
    }

    async fn user_memes(&self, user: Address) -> Result<Vec<u64>, ChainError> {
        let ids = self
            .call(self.contracts.staking, IMemeStaking::getUserMemesCall { user })
            .await?
            ._0;

        to_ids(ids)
    }

    async fn meme_stakers(&self, meme_id: u64) -> Result<Vec<Address>, ChainError> {
        Ok(self
            .call(
                self.contracts.staking,
                IMemeStaking::getMemeStakersCall {
                    memeId: U256::from(meme_id),
                },
            )
            .await?
            ._0)
    }

    async fn current_contest(&self) -> Fetch<Contest> {
        self.load_contest().await.into()
    }

    async fn contest_winner(&self, contest_id: u64) -> Result<Option<u64>, ChainError> {
        let winner = self
            .call(
                self.contracts.staking,
                IMemeStaking::getContestWinnerCall {
                    contestId: U256::from(contest_id),
                },
            )
            .await?
            ._0;

        Ok(Some(to_u64(winner, "winning meme id")?).filter(|id| *id != 0))
    }

    async fn is_meme_stakeable(&self, meme_id: u64) -> Result<bool, ChainError> {
        Ok(self
            .call(
                self.contracts.staking,
                IMemeStaking::isMemeStakeableCall {
                    memeId: U256::from(meme_id),
                },
            )
            .await?
            ._0)
    }

    async fn meme_stakeable_time(&self, meme_id: u64) -> Result<u64, ChainError> {
        let time = self
            .call(
                self.contracts.staking,
                IMemeStaking::getMemeStakeableTimeCall {
                    memeId: U256::from(meme_id),
                },
            )
            .await?
            ._0;

        to_u64(time, "stakeable time")
    }

    async fn min_stake_amount(&self) -> Result<U256, ChainError> {
        Ok(self
            .call(self.contracts.staking, IMemeStaking::minStakeAmountCall {})
            .await?
            ._0)
    }

    async fn contest_duration(&self) -> Result<u64, ChainError> {
        let duration = self
            .call(self.contracts.staking, IMemeStaking::contestDurationCall {})
            .await?
            ._0;

        to_u64(duration, "contest duration")
    }

    async fn current_contest_id(&self) -> Result<u64, ChainError> {
        let id = self
            .call(self.contracts.staking, IMemeStaking::currentContestIdCall {})
            .await?
            ._0;

        to_u64(id, "contest id")
    }

    async fn has_user_submitted_in_current_contest(
        &self,
        user: Address,
    ) -> Result<bool, ChainError> {
        Ok(self
            .call(
                self.contracts.staking,
                IMemeStaking::hasUserSubmittedInCurrentContestCall { user },
            )
            .await?
            ._0)
    }

    async fn has_user_submitted_in_contest(
        &self,
        contest_id: u64,
        user: Address,
    ) -> Result<bool, ChainError> {
        Ok(self
            .call(
                self.contracts.staking,
                IMemeStaking::hasUserSubmittedInContestCall {
                    contestId: U256::from(contest_id),
                    user,
                },
            )
            .await?
            ._0)
    }
}

impl<T: Transport> NftReader for ContractReader<T> {
    async fn nft_balance(&self, owner: Address) -> Result<u64, ChainError> {
        let balance = self
            .call(self.contracts.nft, IMemeNFT::balanceOfCall { owner })
            .await?
            ._0;

        to_u64(balance, "balance")
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: u64) -> Result<U256, ChainError> {
        Ok(self
            .call(
                self.contracts.nft,
                IMemeNFT::tokenOfOwnerByIndexCall {
                    owner,
                    index: U256::from(index),
                },
            )
            .await?
            ._0)
    }

    async fn winner_info(&self, token_id: U256) -> Fetch<WinnerNft> {
        self.load_winner_info(token_id).await.into()
    }

    async fn token_uri(&self, token_id: U256) -> Result<String, ChainError> {
        Ok(self
            .call(self.contracts.nft, IMemeNFT::tokenURICall { tokenId: token_id })
            .await?
            ._0)
    }

    async fn nft_total_supply(&self) -> Result<u64, ChainError> {
        let supply = self
            .call(self.contracts.nft, IMemeNFT::totalSupplyCall {})
            .await?
            ._0;

        to_u64(supply, "total supply")
    }

    async fn meme_has_nft(&self, meme_id: u64) -> Result<bool, ChainError> {
        Ok(self
            .call(self.contracts.nft, IMemeNFT::hasNFTCall { memeId: meme_id })
            .await?
            ._0)
    }

    async fn token_for_contest(&self, contest_id: u64) -> Result<Option<U256>, ChainError> {
        let token_id = self
            .call(
                self.contracts.nft,
                IMemeNFT::getTokenForContestCall {
                    contestId: contest_id,
                },
            )
            .await?
            ._0;

        Ok(Some(token_id).filter(|id| !id.is_zero()))
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::Decode(format!("{field} {value} does not fit in u64")))
}

fn to_ids(values: Vec<U256>) -> Result<Vec<u64>, ChainError> {
    values.into_iter().map(|id| to_u64(id, "id")).collect()
}
