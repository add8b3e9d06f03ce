use std::{env, fs::read_to_string, ops::RangeInclusive};

use chain::{ChainError, Meme};
use chrono::Utc;
use tracing::debug;

use crate::models::Candidate;

/// Memes with a post id that were never scored, or were submitted at least `interval` seconds ago.
pub fn needs_refresh(meme: &Meme, now: u64, interval: u64) -> Option<Candidate> {
    let post_id = meme.external_post_id.trim();
    if post_id.is_empty() {
        return None;
    }

    if meme.engagement_score.is_zero() || now.saturating_sub(meme.timestamp) >= interval {
        return Some(Candidate {
            meme_id: meme.id,
            external_post_id: post_id.to_string(),
        });
    }

    None
}

/// Inclusive id ranges covering `[1, total]`, `size` ids each.
pub fn batches(total: u64, size: u64) -> Vec<RangeInclusive<u64>> {
    let size = size.max(1);

    (1..=total)
        .step_by(usize::try_from(size).unwrap_or(usize::MAX))
        .map(|start| start..=start.saturating_add(size - 1).min(total))
        .collect()
}

/// Setup problems that another attempt cannot fix.
pub fn is_fatal(e: &ChainError) -> bool {
    matches!(
        e,
        ChainError::NotConnected | ChainError::WrongNetwork { .. } | ChainError::Validation(_)
    )
}

/// Docker secret first, plain environment variable second.
pub fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()),
        Err(e) => {
            debug!("No {secret_name} file: {e}");

            env::var(secret_name)
                .ok()
                .map(|secret| secret.trim().to_string())
                .filter(|secret| !secret.is_empty())
        }
    }
}

pub fn now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};

    use super::*;

    fn meme(score: u64, timestamp: u64, post_id: &str) -> Meme {
        Meme {
            id: 1,
            creator: Address::repeat_byte(1),
            total_staked: U256::ZERO,
            timestamp,
            content_hash: "QmMeme".to_string(),
            reward_distributed: false,
            engagement_score: U256::from(score),
            external_post_id: post_id.to_string(),
        }
    }

    #[test]
    fn test_needs_refresh() {
        let now = 1_700_010_000;

        // Never scored
        assert!(needs_refresh(&meme(0, now, "1790"), now, 7_200).is_some());
        // Scored, still fresh
        assert!(needs_refresh(&meme(12, now - 7_199, "1790"), now, 7_200).is_none());
        // Scored, stale
        assert_eq!(
            needs_refresh(&meme(12, now - 7_200, " 1790 "), now, 7_200),
            Some(Candidate {
                meme_id: 1,
                external_post_id: "1790".to_string()
            })
        );
        // No post to score
        assert!(needs_refresh(&meme(0, now, "  "), now, 7_200).is_none());
    }

    #[test]
    fn test_batches() {
        assert_eq!(batches(25, 10), vec![1..=10, 11..=20, 21..=25]);
        assert_eq!(batches(10, 10), vec![1..=10]);
        assert_eq!(batches(3, 0), vec![1..=1, 2..=2, 3..=3]);
        assert!(batches(0, 10).is_empty());
    }

    #[test]
    fn test_batches_huge_size() {
        assert_eq!(batches(5, u64::MAX), vec![1..=5]);
        assert_eq!(batches(5, u64::MAX - 1), vec![1..=5]);
    }

    #[test]
    fn test_missing_secret() {
        assert!(read_secret("MEMEFI_TEST_UNSET_KEY").is_none());
    }

    #[test]
    fn test_is_fatal() {
        assert!(is_fatal(&ChainError::NotConnected));
        assert!(!is_fatal(&ChainError::Connection("reset".into())));
        assert!(!is_fatal(&ChainError::Reverted("busy".into())));
    }
}
