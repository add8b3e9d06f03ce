//! # View Models
//!
//! Pure transforms from raw records to what the frontend renders. Nothing here touches the network.
use alloy_primitives::Address;
use chrono::DateTime;
use serde::Serialize;

use crate::{
    aggregate::Ranked,
    models::{Contest, Meme, WinnerNft},
    units::{display_amount, format_amount},
};

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// `0x1234...abcd`
pub fn truncate_address(address: &Address) -> String {
    let full = address.to_string();

    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

pub fn format_date(timestamp: u64) -> String {
    format_timestamp(timestamp, "%Y-%m-%d")
}

pub fn format_datetime(timestamp: u64) -> String {
    format_timestamp(timestamp, "%Y-%m-%d %H:%M:%S UTC")
}

fn format_timestamp(timestamp: u64, pattern: &str) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .map(|date| date.format(pattern).to_string())
        .unwrap_or_default()
}

pub fn gateway_url(gateway: &str, content_hash: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), content_hash)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Countdown {
    pub fn from_seconds(remaining: u64) -> Self {
        Self {
            days: remaining / DAY,
            hours: (remaining % DAY) / HOUR,
            minutes: (remaining % HOUR) / MINUTE,
            seconds: remaining % MINUTE,
        }
    }

    pub fn until(deadline: u64, now: u64) -> Self {
        Self::from_seconds(deadline.saturating_sub(now))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::from_seconds(0)
    }
}

/// Time-lock rule: staking opens `delay` seconds after submission, boundary included.
pub fn is_stakeable_at(submitted: u64, delay: u64, now: u64) -> bool {
    now >= submitted.saturating_add(delay)
}

/// Both the contract flag and the computed delay must agree before a meme is stakeable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeability {
    pub flag: bool,
    pub stakeable_at: u64,
    pub remaining: u64,
    pub stakeable: bool,
}

impl Stakeability {
    pub fn evaluate(flag: bool, stakeable_at: u64, now: u64) -> Self {
        let remaining = stakeable_at.saturating_sub(now);

        Self {
            flag,
            stakeable_at,
            remaining,
            stakeable: flag && remaining == 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeView {
    pub id: u64,
    pub creator: String,
    pub creator_short: String,
    pub total_staked_wei: String,
    pub total_staked: String,
    pub total_staked_display: String,
    pub uploaded_at: u64,
    pub uploaded: String,
    pub content_hash: String,
    pub image_url: String,
    pub engagement_score: String,
    pub external_post_id: String,
    pub reward_distributed: bool,
}

impl MemeView {
    pub fn new(meme: &Meme, gateway: &str) -> Self {
        Self {
            id: meme.id,
            creator: meme.creator.to_string(),
            creator_short: truncate_address(&meme.creator),
            total_staked_wei: meme.total_staked.to_string(),
            total_staked: format_amount(meme.total_staked),
            total_staked_display: display_amount(meme.total_staked),
            uploaded_at: meme.timestamp,
            uploaded: format_date(meme.timestamp),
            content_hash: meme.content_hash.clone(),
            image_url: gateway_url(gateway, &meme.content_hash),
            engagement_score: meme.engagement_score.to_string(),
            external_post_id: meme.external_post_id.clone(),
            reward_distributed: meme.reward_distributed,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub rank: usize,
    pub is_winner: bool,
    #[serde(flatten)]
    pub meme: MemeView,
}

impl LeaderboardRow {
    pub fn new(ranked: &Ranked, gateway: &str) -> Self {
        Self {
            rank: ranked.rank,
            is_winner: ranked.is_winner,
            meme: MemeView::new(&ranked.meme, gateway),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestView {
    pub contest_id: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub starts: String,
    pub ends: String,
    pub ended: bool,
    pub meme_count: usize,
}

impl ContestView {
    pub fn new(contest: &Contest) -> Self {
        Self {
            contest_id: contest.contest_id,
            start_time: contest.start_time,
            end_time: contest.end_time,
            starts: format_datetime(contest.start_time),
            ends: format_datetime(contest.end_time),
            ended: contest.ended,
            meme_count: contest.meme_ids.len(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftView {
    pub token_id: String,
    pub winner: String,
    pub winner_short: String,
    pub total_staked: String,
    pub total_staked_display: String,
    pub contest_id: u64,
    pub meme_id: u64,
    pub minted_at: u64,
    pub minted: String,
    pub original_content_hash: String,
    pub image_url: String,
}

impl NftView {
    pub fn new(nft: &WinnerNft, gateway: &str) -> Self {
        Self {
            token_id: nft.token_id.to_string(),
            winner: nft.winner.to_string(),
            winner_short: truncate_address(&nft.winner),
            total_staked: format_amount(nft.total_staked),
            total_staked_display: display_amount(nft.total_staked),
            contest_id: nft.contest_id,
            meme_id: nft.meme_id,
            minted_at: nft.timestamp,
            minted: format_date(nft.timestamp),
            original_content_hash: nft.original_content_hash.clone(),
            image_url: gateway_url(gateway, &nft.original_content_hash),
        }
    }
}
