//! # Aggregator
//!
//! Fans single-record reads out into the collections the views need.
//!
//! Every item is fetched in its own task, at most `concurrency` at once, then put back in
//! input order. A failed item never sinks the whole collection, it is logged and counted.
use std::{collections::HashSet, future::Future, sync::Arc};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, warn};

use crate::{
    constants::CONTEST_END_GRACE_PERIOD,
    error::{ChainError, Fetch},
    models::{Contest, Meme, WinnerNft},
    reader::{NftReader, StakingReader},
    units::sum,
    view::{Countdown, Stakeability},
};

pub const DEFAULT_CONCURRENCY: usize = 16;

/// Upper bound on tokens enumerated for one owner, whatever `balanceOf` claims.
pub const MAX_OWNED_NFTS: u64 = 1_000;

/// Whatever could be loaded, plus how much was asked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub requested: usize,
    pub failed: usize,
}

impl<T> Listing<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            requested: 0,
            failed: 0,
        }
    }

    fn from_fetches(fetches: Vec<Fetch<T>>, what: &str) -> Self {
        let requested = fetches.len();
        let mut items = Vec::with_capacity(requested);
        let mut failed = 0;

        for fetch in fetches {
            match fetch {
                Fetch::Found(item) => items.push(item),
                Fetch::NotFound => {}
                Fetch::Failed(e) => {
                    warn!("Failed to load {what}: {e}");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!("Loaded {} {what}s, {failed} of {requested} failed", items.len());
        }

        Self {
            items,
            requested,
            failed,
        }
    }

    pub fn loaded(&self) -> usize {
        self.items.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            requested: self.requested,
            failed: self.failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    #[default]
    Stake,
    Engagement,
}

impl RankBy {
    fn key(self, meme: &Meme) -> U256 {
        match self {
            RankBy::Stake => meme.total_staked,
            RankBy::Engagement => meme.engagement_score,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ranked {
    pub rank: usize,
    pub is_winner: bool,
    pub meme: Meme,
}

/// Stable descending sort, ties keep their incoming order.
pub fn rank(mut memes: Vec<Meme>, by: RankBy) -> Vec<Ranked> {
    memes.sort_by(|a, b| by.key(b).cmp(&by.key(a)));

    memes
        .into_iter()
        .enumerate()
        .map(|(index, meme)| Ranked {
            rank: index + 1,
            is_winner: index == 0,
            meme,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakePosition {
    pub meme: Meme,
    /// Never above the meme's total.
    pub amount: U256,
}

#[derive(Clone, Debug)]
pub struct Dashboard {
    pub user: Address,
    pub my_memes: Vec<Meme>,
    pub stakes: Vec<StakePosition>,
    pub total_staked: U256,
    pub submitted_in_current_contest: bool,
    pub requested: usize,
    pub failed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestPhase {
    Active,
    /// Past the end time, still inside the grace period for `endContest`.
    Ending,
    /// Past the grace period without anyone ending it.
    Overdue,
    Ended,
}

impl ContestPhase {
    pub fn at(contest: &Contest, now: u64) -> Self {
        if contest.ended {
            ContestPhase::Ended
        } else if now < contest.end_time {
            ContestPhase::Active
        } else if now < contest.end_time.saturating_add(CONTEST_END_GRACE_PERIOD) {
            ContestPhase::Ending
        } else {
            ContestPhase::Overdue
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContestOverview {
    pub contest: Contest,
    pub phase: ContestPhase,
    pub countdown: Countdown,
    pub memes: Listing<Ranked>,
    /// Only read once the contest has ended.
    pub winner: Option<u64>,
    pub total_staked: U256,
    /// Meme reads that failed, plus the winner read if it failed.
    pub failed: usize,
}

#[derive(Clone, Debug)]
pub struct MemeDetail {
    pub meme: Meme,
    pub stakers: Vec<Address>,
    pub stakeability: Stakeability,
    pub has_nft: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub count: usize,
    /// Distinct contests among the tokens.
    pub contests_won: usize,
    pub total_staked: U256,
    /// Zero for an empty collection.
    pub average_stake: U256,
    pub highest_stake: U256,
    pub first_win: Option<u64>,
    pub latest_win: Option<u64>,
}

impl CollectionStats {
    pub fn of(nfts: &[WinnerNft]) -> Self {
        let total_staked = sum(nfts.iter().map(|nft| nft.total_staked));
        let contests: HashSet<u64> = nfts.iter().map(|nft| nft.contest_id).collect();

        Self {
            count: nfts.len(),
            contests_won: contests.len(),
            total_staked,
            average_stake: total_staked
                .checked_div(U256::from(nfts.len()))
                .unwrap_or_default(),
            highest_stake: nfts
                .iter()
                .map(|nft| nft.total_staked)
                .max()
                .unwrap_or_default(),
            first_win: nfts.iter().map(|nft| nft.timestamp).min(),
            latest_win: nfts.iter().map(|nft| nft.timestamp).max(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformStats {
    pub total_memes: usize,
    pub total_staked: U256,
    pub unique_creators: usize,
    pub min_stake: U256,
    pub contest_duration: u64,
    pub current_contest_id: u64,
    pub failed: usize,
}

pub struct Aggregator<R> {
    reader: Arc<R>,
    concurrency: usize,
}

impl<R> Clone for Aggregator<R> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<R: StakingReader + 'static> Aggregator<R> {
    pub fn new(reader: Arc<R>, concurrency: usize) -> Self {
        Self {
            reader,
            concurrency: concurrency.max(1),
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Runs `fetch` for every input, at most `concurrency` at once, output in input order.
    async fn fan_out<I, T, F, Fut>(&self, inputs: Vec<I>, fetch: F) -> Vec<Fetch<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(Arc<R>, I) -> Fut,
        Fut: Future<Output = Fetch<T>> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let total = inputs.len();

        for (index, input) in inputs.into_iter().enumerate() {
            let permits = permits.clone();
            let task = fetch(self.reader.clone(), input);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, task.await)
            });
        }

        let mut slots: Vec<Option<Fetch<T>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, fetch)) => slots[index] = Some(fetch),
                Err(e) => warn!("Read task aborted: {e}"),
            }
        }

        slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Fetch::Failed(ChainError::Connection("read task aborted".into())))
            })
            .collect()
    }

    pub async fn memes(&self, ids: Vec<u64>) -> Listing<Meme> {
        let fetches = self
            .fan_out(ids, |reader, id| async move { reader.meme(id).await })
            .await;

        Listing::from_fetches(fetches, "meme")
    }

    /// Every meme in `[1, next_meme_id - 1]` that exists.
    pub async fn list_memes(&self) -> Result<Listing<Meme>, ChainError> {
        let next = self.reader.next_meme_id().await?;
        if next <= 1 {
            return Ok(Listing::empty());
        }

        debug!("Listing memes 1..{next}");
        Ok(self.memes((1..next).collect()).await)
    }

    pub async fn leaderboard(
        &self,
        by: RankBy,
        limit: Option<usize>,
    ) -> Result<Listing<Ranked>, ChainError> {
        let listing = self.list_memes().await?;

        let mut ranked = Listing {
            items: rank(listing.items, by),
            requested: listing.requested,
            failed: listing.failed,
        };
        if let Some(limit) = limit {
            ranked.items.truncate(limit);
        }

        Ok(ranked)
    }

    /// The user's stake on one meme, clamped to the meme's total.
    pub async fn stake_of(&self, meme_id: u64, user: Address) -> Result<Option<StakePosition>, ChainError> {
        let (meme, amount) = tokio::join!(
            self.reader.meme(meme_id),
            self.reader.user_stake(meme_id, user)
        );

        let Some(meme) = meme.into_result()? else {
            return Ok(None);
        };
        let amount = amount?.min(meme.total_staked);

        Ok(Some(StakePosition { meme, amount }))
    }

    pub async fn user_dashboard(&self, user: Address) -> Result<Dashboard, ChainError> {
        let (listing, staked_ids, submitted) = tokio::join!(
            self.list_memes(),
            self.reader.user_staked_memes(user),
            self.reader.has_user_submitted_in_current_contest(user)
        );
        let listing = listing?;

        let (submitted, submitted_failed) = match submitted {
            Ok(submitted) => (submitted, 0),
            Err(e) => {
                warn!("Failed to read submission status of {user}: {e}");
                (false, 1)
            }
        };

        let mut seen = HashSet::new();
        let staked_ids: Vec<u64> = staked_ids?
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();

        let positions = self
            .fan_out(staked_ids, move |reader, id| async move {
                let (meme, amount) = tokio::join!(reader.meme(id), reader.user_stake(id, user));

                match (meme, amount) {
                    (Fetch::Found(meme), Ok(amount)) => {
                        let amount = amount.min(meme.total_staked);
                        Fetch::Found(StakePosition { meme, amount })
                    }
                    (Fetch::Failed(e), _) | (_, Err(e)) => Fetch::Failed(e),
                    (Fetch::NotFound, _) => Fetch::NotFound,
                }
            })
            .await;
        let positions = Listing::from_fetches(positions, "stake");

        let stakes: Vec<StakePosition> = positions
            .items
            .into_iter()
            .filter(|position| !position.amount.is_zero())
            .collect();

        Ok(Dashboard {
            user,
            my_memes: listing
                .items
                .into_iter()
                .filter(|meme| meme.creator == user)
                .collect(),
            total_staked: sum(stakes.iter().map(|position| position.amount)),
            stakes,
            submitted_in_current_contest: submitted,
            requested: listing.requested + positions.requested,
            failed: listing.failed + positions.failed + submitted_failed,
        })
    }

    /// `None` when no contest is running yet.
    pub async fn contest_overview(&self, now: u64) -> Result<Option<ContestOverview>, ChainError> {
        let Some(contest) = self.reader.current_contest().await.into_result()? else {
            return Ok(None);
        };

        let (memes, winner) = tokio::join!(self.memes(contest.meme_ids.clone()), async {
            if contest.ended {
                self.reader.contest_winner(contest.contest_id).await
            } else {
                Ok(None)
            }
        });

        let (winner, winner_failed) = match winner {
            Ok(winner) => (winner, 0),
            Err(e) => {
                warn!("Failed to read winner of contest {}: {e}", contest.contest_id);
                (None, 1)
            }
        };
        let total_staked = sum(memes.items.iter().map(|meme| meme.total_staked));

        Ok(Some(ContestOverview {
            phase: ContestPhase::at(&contest, now),
            countdown: Countdown::until(contest.end_time, now),
            failed: memes.failed + winner_failed,
            memes: Listing {
                items: rank(memes.items, RankBy::Stake),
                requested: memes.requested,
                failed: memes.failed,
            },
            winner,
            total_staked,
            contest,
        }))
    }

    pub async fn stakeability(&self, meme_id: u64, now: u64) -> Result<Stakeability, ChainError> {
        let (flag, stakeable_at) = tokio::join!(
            self.reader.is_meme_stakeable(meme_id),
            self.reader.meme_stakeable_time(meme_id)
        );

        Ok(Stakeability::evaluate(flag?, stakeable_at?, now))
    }

    pub async fn platform_stats(&self) -> Result<PlatformStats, ChainError> {
        let (listing, min_stake, contest_duration, current_contest_id) = tokio::join!(
            self.list_memes(),
            self.reader.min_stake_amount(),
            self.reader.contest_duration(),
            self.reader.current_contest_id()
        );
        let listing = listing?;

        let creators: HashSet<Address> = listing.items.iter().map(|meme| meme.creator).collect();

        Ok(PlatformStats {
            total_memes: listing.loaded(),
            total_staked: sum(listing.items.iter().map(|meme| meme.total_staked)),
            unique_creators: creators.len(),
            min_stake: min_stake?,
            contest_duration: contest_duration?,
            current_contest_id: current_contest_id?,
            failed: listing.failed,
        })
    }
}

impl<R: StakingReader + NftReader + 'static> Aggregator<R> {
    pub async fn meme_detail(&self, meme_id: u64, now: u64) -> Result<Option<MemeDetail>, ChainError> {
        let Some(meme) = self.reader.meme(meme_id).await.into_result()? else {
            return Ok(None);
        };

        let (stakers, stakeability, has_nft) = tokio::join!(
            self.reader.meme_stakers(meme_id),
            self.stakeability(meme_id, now),
            self.reader.meme_has_nft(meme_id)
        );

        Ok(Some(MemeDetail {
            meme,
            stakers: stakers?,
            stakeability: stakeability?,
            has_nft: has_nft?,
        }))
    }

    /// Winner NFTs held by `owner`, enumerated by index. Unreadable tokens are skipped.
    ///
    /// At most [`MAX_OWNED_NFTS`] indexes are read.
    pub async fn user_nfts(&self, owner: Address) -> Result<(Listing<WinnerNft>, CollectionStats), ChainError> {
        let balance = self.reader.nft_balance(owner).await?;
        if balance > MAX_OWNED_NFTS {
            warn!("{owner} reports {balance} NFTs, reading the first {MAX_OWNED_NFTS}");
        }

        let fetches = self
            .fan_out((0..balance.min(MAX_OWNED_NFTS)).collect(), move |reader, index| async move {
                match reader.token_of_owner_by_index(owner, index).await {
                    Ok(token_id) => reader.winner_info(token_id).await,
                    Err(e) => Fetch::Failed(e),
                }
            })
            .await;

        let listing = Listing::from_fetches(fetches, "winner NFT");
        let stats = CollectionStats::of(&listing.items);

        Ok((listing, stats))
    }

    pub async fn contest_nft(&self, contest_id: u64) -> Result<Option<WinnerNft>, ChainError> {
        match self.reader.token_for_contest(contest_id).await? {
            Some(token_id) => self.reader.winner_info(token_id).await.into_result(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryChain, meme, user, wei};

    fn aggregator(chain: MemoryChain) -> Aggregator<MemoryChain> {
        Aggregator::new(Arc::new(chain), DEFAULT_CONCURRENCY)
    }

    fn ids(memes: &[Meme]) -> Vec<u64> {
        memes.iter().map(|meme| meme.id).collect()
    }

    fn nft(token_id: u64, winner: Address, staked: &str, timestamp: u64) -> WinnerNft {
        WinnerNft {
            token_id: U256::from(token_id),
            winner,
            total_staked: wei(staked),
            contest_id: token_id,
            meme_id: token_id * 10,
            timestamp,
            original_content_hash: format!("QmWinner{token_id}"),
        }
    }

    #[tokio::test]
    async fn test_list_skips_missing_ids() {
        let mut chain = MemoryChain::with_memes([
            meme(1, user(1), "1"),
            meme(3, user(2), "2"),
        ]);
        chain.next_meme_id = 4;

        let listing = aggregator(chain).list_memes().await.unwrap();
        assert_eq!(ids(&listing.items), vec![1, 3]);
        assert_eq!(listing.requested, 3);
        assert!(listing.is_complete());
    }

    #[tokio::test]
    async fn test_list_empty() {
        let listing = aggregator(MemoryChain::with_memes([]))
            .list_memes()
            .await
            .unwrap();

        assert!(listing.items.is_empty());
        assert_eq!(listing.requested, 0);
    }

    #[tokio::test]
    async fn test_list_counts_failures() {
        let mut chain = MemoryChain::with_memes((1..=5).map(|id| meme(id, user(1), "1")));
        chain.failing.insert(2);
        chain.failing.insert(4);

        let listing = aggregator(chain).list_memes().await.unwrap();
        assert_eq!(ids(&listing.items), vec![1, 3, 5]);
        assert_eq!(listing.failed, 2);
        assert_eq!(listing.requested, 5);
        assert!(!listing.is_complete());
    }

    #[tokio::test]
    async fn test_out_of_range_ids_absent() {
        let chain = MemoryChain::with_memes([meme(1, user(1), "1")]);
        let listing = aggregator(chain).memes(vec![0, 1, 2, 99]).await;

        assert_eq!(ids(&listing.items), vec![1]);
        assert_eq!(listing.failed, 0);
    }

    #[tokio::test]
    async fn test_order_with_single_permit() {
        let chain = MemoryChain::with_memes((1..=20).map(|id| meme(id, user(1), "1")));
        let listing = Aggregator::new(Arc::new(chain), 1)
            .list_memes()
            .await
            .unwrap();

        assert_eq!(ids(&listing.items), (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_rank_is_stable() {
        let memes = vec![
            meme(1, user(1), "1"),
            meme(2, user(1), "3"),
            meme(3, user(1), "1"),
            meme(4, user(1), "3"),
        ];

        let ranked = rank(memes, RankBy::Stake);
        let order: Vec<u64> = ranked.iter().map(|row| row.meme.id).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
        assert_eq!(ranked[0].rank, 1);
        assert!(ranked[0].is_winner);
        assert!(!ranked[1].is_winner);
        assert_eq!(ranked[3].rank, 4);
    }

    #[tokio::test]
    async fn test_leaderboard_by_engagement() {
        let mut memes: Vec<Meme> = (1..=3).map(|id| meme(id, user(1), "1")).collect();
        memes[0].engagement_score = U256::from(5);
        memes[2].engagement_score = U256::from(50);

        let leaderboard = aggregator(MemoryChain::with_memes(memes))
            .leaderboard(RankBy::Engagement, Some(2))
            .await
            .unwrap();

        let order: Vec<u64> = leaderboard.items.iter().map(|row| row.meme.id).collect();
        assert_eq!(order, vec![3, 1]);
        assert_eq!(leaderboard.requested, 3);
    }

    #[tokio::test]
    async fn test_dashboard_separates_users() {
        let mut chain = MemoryChain::with_memes([meme(1, user(9), "0"), meme(2, user(1), "0")]);
        chain.stake(1, user(1), "0.5");
        chain.stake(1, user(2), "1.2");
        chain.submitted.insert(user(1));

        let aggregator = aggregator(chain);

        let first = aggregator.user_dashboard(user(1)).await.unwrap();
        assert_eq!(first.stakes.len(), 1);
        assert_eq!(first.stakes[0].amount, wei("0.5"));
        assert_eq!(first.stakes[0].meme.total_staked, wei("1.7"));
        assert_eq!(ids(&first.my_memes), vec![2]);
        assert!(first.submitted_in_current_contest);

        let second = aggregator.user_dashboard(user(2)).await.unwrap();
        assert_eq!(second.stakes[0].amount, wei("1.2"));
        assert_eq!(second.total_staked, wei("1.2"));
        assert!(second.my_memes.is_empty());
        assert!(!second.submitted_in_current_contest);
    }

    #[tokio::test]
    async fn test_dashboard_drops_zero_and_missing() {
        let mut chain = MemoryChain::with_memes([meme(1, user(9), "1"), meme(2, user(9), "1")]);
        chain.stake(1, user(1), "0.5");
        // Withdrawn: the id is still listed, the stake is zero
        chain.staked_memes.entry(user(1)).or_default().push(2);
        chain.staked_memes.entry(user(1)).or_default().push(7);
        // Duplicate entries only count once
        chain.staked_memes.entry(user(1)).or_default().push(1);

        let dashboard = aggregator(chain).user_dashboard(user(1)).await.unwrap();
        assert_eq!(dashboard.stakes.len(), 1);
        assert_eq!(dashboard.stakes[0].meme.id, 1);
        assert_eq!(dashboard.total_staked, wei("0.5"));
    }

    #[tokio::test]
    async fn test_stake_clamped_to_total() {
        let mut chain = MemoryChain::with_memes([meme(1, user(9), "0.2")]);
        chain.stakes.insert((1, user(1)), wei("5"));

        let position = aggregator(chain)
            .stake_of(1, user(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.amount, wei("0.2"));
    }

    #[tokio::test]
    async fn test_contest_overview() {
        let mut chain = MemoryChain::with_memes([
            meme(1, user(1), "0.1"),
            meme(2, user(2), "0.9"),
            meme(3, user(3), "0.4"),
        ]);
        chain.contest = Some(Contest {
            contest_id: 1,
            start_time: 1_000,
            end_time: 1_000 + 518_400,
            ended: false,
            meme_ids: vec![1, 2, 3],
        });

        let overview = aggregator(chain)
            .contest_overview(1_000)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(overview.phase, ContestPhase::Active);
        assert_eq!(overview.countdown, Countdown::from_seconds(518_400));
        assert_eq!(overview.countdown.days, 6);
        assert_eq!(overview.memes.items[0].meme.id, 2);
        assert_eq!(overview.total_staked, wei("1.4"));
        assert_eq!(overview.winner, None);
        assert_eq!(overview.failed, 0);
    }

    #[tokio::test]
    async fn test_ended_contest_reads_winner() {
        let mut chain = MemoryChain::with_memes([meme(1, user(1), "0.1"), meme(2, user(2), "0.9")]);
        chain.contest = Some(Contest {
            contest_id: 1,
            start_time: 0,
            end_time: 100,
            ended: true,
            meme_ids: vec![1, 2],
        });
        chain.winners.insert(1, 2);

        let overview = aggregator(chain)
            .contest_overview(500)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(overview.phase, ContestPhase::Ended);
        assert_eq!(overview.winner, Some(2));
    }

    #[tokio::test]
    async fn test_failed_winner_read_keeps_overview() {
        let mut chain = MemoryChain::with_memes([meme(1, user(1), "0.1")]);
        chain.contest = Some(Contest {
            contest_id: 1,
            start_time: 0,
            end_time: 100,
            ended: true,
            meme_ids: vec![1],
        });
        chain.failing_winner = true;

        let overview = aggregator(chain)
            .contest_overview(500)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(overview.winner, None);
        assert_eq!(overview.failed, 1);
        assert_eq!(overview.memes.items.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_read_keeps_dashboard() {
        let mut chain = MemoryChain::with_memes([meme(1, user(9), "0")]);
        chain.stake(1, user(1), "0.5");
        chain.submitted.insert(user(1));
        chain.failing_submitted = true;

        let dashboard = aggregator(chain).user_dashboard(user(1)).await.unwrap();

        assert!(!dashboard.submitted_in_current_contest);
        assert_eq!(dashboard.failed, 1);
        assert_eq!(dashboard.total_staked, wei("0.5"));
    }

    #[test]
    fn test_contest_phase() {
        let mut contest = Contest {
            contest_id: 1,
            start_time: 0,
            end_time: 100,
            ended: false,
            meme_ids: Vec::new(),
        };

        assert_eq!(ContestPhase::at(&contest, 99), ContestPhase::Active);
        assert_eq!(ContestPhase::at(&contest, 100), ContestPhase::Ending);
        assert_eq!(
            ContestPhase::at(&contest, 100 + CONTEST_END_GRACE_PERIOD),
            ContestPhase::Overdue
        );

        contest.ended = true;
        assert_eq!(ContestPhase::at(&contest, 0), ContestPhase::Ended);
    }

    #[tokio::test]
    async fn test_no_contest() {
        let overview = aggregator(MemoryChain::with_memes([]))
            .contest_overview(0)
            .await
            .unwrap();

        assert!(overview.is_none());
    }

    #[tokio::test]
    async fn test_stakeability_and_detail() {
        let mut chain = MemoryChain::with_memes([meme(1, user(1), "1")]);
        chain.stake(1, user(2), "0.3");
        let submitted = 1_700_000_001;

        let aggregator = aggregator(chain);

        let locked = aggregator.stakeability(1, submitted + 10).await.unwrap();
        assert!(!locked.stakeable);
        assert_eq!(locked.remaining, 20);

        let detail = aggregator
            .meme_detail(1, submitted + 30)
            .await
            .unwrap()
            .unwrap();
        assert!(detail.stakeability.stakeable);
        assert_eq!(detail.stakers, vec![user(2)]);
        assert!(!detail.has_nft);

        assert!(aggregator.meme_detail(5, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_nfts() {
        let mut chain = MemoryChain::with_memes([]);
        chain.mint(nft(1, user(1), "2", 300));
        chain.mint(nft(2, user(1), "0.5", 100));
        chain.mint(nft(3, user(1), "7", 200));
        chain.mint(nft(4, user(2), "9", 50));
        // Second token from contest 1
        let mut repeat = nft(5, user(1), "0.5", 400);
        repeat.contest_id = 1;
        chain.mint(repeat);
        chain.failing_tokens.insert(U256::from(3));

        let (listing, stats) = aggregator(chain).user_nfts(user(1)).await.unwrap();

        assert_eq!(listing.requested, 4);
        assert_eq!(listing.failed, 1);
        assert_eq!(
            stats,
            CollectionStats {
                count: 3,
                contests_won: 2,
                total_staked: wei("3"),
                average_stake: wei("1"),
                highest_stake: wei("2"),
                first_win: Some(100),
                latest_win: Some(400),
            }
        );
    }

    #[test]
    fn test_empty_collection_stats() {
        let stats = CollectionStats::of(&[]);

        assert_eq!(stats.count, 0);
        assert_eq!(stats.contests_won, 0);
        assert_eq!(stats.average_stake, U256::ZERO);
        assert_eq!(stats.first_win, None);
    }

    #[tokio::test]
    async fn test_user_nfts_balance_capped() {
        let mut chain = MemoryChain::with_memes([]);
        chain.mint(nft(1, user(1), "2", 300));
        chain.reported_balance = Some(u64::MAX);

        let (listing, stats) = aggregator(chain).user_nfts(user(1)).await.unwrap();

        assert_eq!(listing.requested, MAX_OWNED_NFTS as usize);
        assert_eq!(listing.failed, MAX_OWNED_NFTS as usize - 1);
        assert_eq!(stats.count, 1);
    }

    #[tokio::test]
    async fn test_contest_nft() {
        let mut chain = MemoryChain::with_memes([]);
        chain.mint(nft(1, user(1), "2", 300));
        let aggregator = aggregator(chain);

        assert_eq!(
            aggregator.contest_nft(1).await.unwrap().map(|nft| nft.meme_id),
            Some(10)
        );
        assert!(aggregator.contest_nft(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_platform_stats() {
        let chain = MemoryChain::with_memes([
            meme(1, user(1), "1"),
            meme(2, user(1), "0.5"),
            meme(3, user(2), "0.25"),
        ]);

        let stats = aggregator(chain).platform_stats().await.unwrap();
        assert_eq!(stats.total_memes, 3);
        assert_eq!(stats.unique_creators, 2);
        assert_eq!(stats.total_staked, wei("1.75"));
        assert_eq!(stats.min_stake, wei("0.001"));
        assert_eq!(stats.contest_duration, 86_400);
    }
}
