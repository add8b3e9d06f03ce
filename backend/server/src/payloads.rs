//! JSON bodies returned by the read routes. Amounts are always sent three ways: raw wei,
//! the exact decimal and the truncated display value.
use alloy_primitives::{Address, U256};
use chain::{
    Listing, RankBy,
    aggregate::{
        CollectionStats, ContestOverview, ContestPhase, Dashboard, MemeDetail, PlatformStats,
        StakePosition,
    },
    metadata::NftMetadata,
    units::{display_amount, format_amount},
    view::{ContestView, Countdown, LeaderboardRow, MemeView, NftView, Stakeability, format_date},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub wei: String,
    pub value: String,
    pub display: String,
}

impl From<U256> for Amount {
    fn from(wei: U256) -> Self {
        Self {
            wei: wei.to_string(),
            value: format_amount(wei),
            display: display_amount(wei),
        }
    }
}

/// A collection plus the "N of M loaded" counters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Loaded<T> {
    pub items: Vec<T>,
    pub requested: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl<T> Loaded<T> {
    pub fn from_listing<U>(listing: Listing<U>, view: impl FnMut(U) -> T) -> Self {
        let listing = listing.map(view);

        Self {
            loaded: listing.loaded(),
            requested: listing.requested,
            failed: listing.failed,
            items: listing.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub by: RankBy,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeDetailResponse {
    pub meme: MemeView,
    pub stakers: Vec<String>,
    pub staker_count: usize,
    pub stakeability: Stakeability,
    pub countdown: Countdown,
    pub has_nft: bool,
}

impl MemeDetailResponse {
    pub fn new(detail: MemeDetail, gateway: &str) -> Self {
        Self {
            meme: MemeView::new(&detail.meme, gateway),
            staker_count: detail.stakers.len(),
            stakers: detail.stakers.iter().map(Address::to_string).collect(),
            countdown: Countdown::from_seconds(detail.stakeability.remaining),
            stakeability: detail.stakeability,
            has_nft: detail.has_nft,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeResponse {
    pub meme_id: u64,
    pub user: String,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub meme: MemeView,
    pub amount: Amount,
}

impl PositionView {
    pub fn new(position: &StakePosition, gateway: &str) -> Self {
        Self {
            meme: MemeView::new(&position.meme, gateway),
            amount: position.amount.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: String,
    pub my_memes: Vec<MemeView>,
    pub stakes: Vec<PositionView>,
    pub total_staked: Amount,
    pub submitted_in_current_contest: bool,
    pub requested: usize,
    pub failed: usize,
}

impl DashboardResponse {
    pub fn new(dashboard: Dashboard, gateway: &str) -> Self {
        Self {
            user: dashboard.user.to_string(),
            my_memes: dashboard
                .my_memes
                .iter()
                .map(|meme| MemeView::new(meme, gateway))
                .collect(),
            stakes: dashboard
                .stakes
                .iter()
                .map(|position| PositionView::new(position, gateway))
                .collect(),
            total_staked: dashboard.total_staked.into(),
            submitted_in_current_contest: dashboard.submitted_in_current_contest,
            requested: dashboard.requested,
            failed: dashboard.failed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestResponse {
    pub contest: ContestView,
    pub phase: ContestPhase,
    pub countdown: Countdown,
    pub memes: Loaded<LeaderboardRow>,
    pub winner: Option<u64>,
    pub total_staked: Amount,
    pub failed: usize,
}

impl ContestResponse {
    pub fn new(overview: ContestOverview, gateway: &str) -> Self {
        Self {
            contest: ContestView::new(&overview.contest),
            phase: overview.phase,
            countdown: overview.countdown,
            memes: Loaded::from_listing(overview.memes, |ranked| {
                LeaderboardRow::new(&ranked, gateway)
            }),
            winner: overview.winner,
            total_staked: overview.total_staked.into(),
            failed: overview.failed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub count: usize,
    pub contests_won: usize,
    pub total_staked: Amount,
    pub average_stake: Amount,
    pub highest_stake: Amount,
    pub first_win: Option<String>,
    pub latest_win: Option<String>,
}

impl From<CollectionStats> for CollectionView {
    fn from(stats: CollectionStats) -> Self {
        Self {
            count: stats.count,
            contests_won: stats.contests_won,
            total_staked: stats.total_staked.into(),
            average_stake: stats.average_stake.into(),
            highest_stake: stats.highest_stake.into(),
            first_win: stats.first_win.map(format_date),
            latest_win: stats.latest_win.map(format_date),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftsResponse {
    pub owner: String,
    pub nfts: Loaded<NftView>,
    pub stats: CollectionView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub token_id: String,
    pub token_uri: String,
    /// `None` when the URI does not resolve to a document.
    pub metadata: Option<NftMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_memes: usize,
    pub total_staked: Amount,
    pub unique_creators: usize,
    pub min_stake: Amount,
    pub contest_duration: u64,
    pub current_contest_id: u64,
    pub failed: usize,
}

impl From<PlatformStats> for StatsResponse {
    fn from(stats: PlatformStats) -> Self {
        Self {
            total_memes: stats.total_memes,
            total_staked: stats.total_staked.into(),
            unique_creators: stats.unique_creators,
            min_stake: stats.min_stake.into(),
            contest_duration: stats.contest_duration,
            current_contest_id: stats.current_contest_id,
            failed: stats.failed,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub chain_id: u64,
}
