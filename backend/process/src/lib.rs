//! # Engagement Refresh
//!
//! Periodic job asking the TwitterEngagement oracle to refresh scores for memes.
//!
//! ## Selection
//! - Walk `[1, nextMemeId - 1]` in batches, reading each batch concurrently
//! - Skip memes that do not exist or have no tweet id
//! - Pick memes never scored, or submitted at least the update interval ago
//!
//! ## Requests
//! - One `requestEngagementMetrics` transaction per picked meme
//! - Signed locally with `PRIVATE_KEY` when it is set, otherwise sent from an account the RPC
//!   endpoint holds unlocked
//! - Failed requests are retried after a delay, up to the retry limit
//! - Setup errors (wrong network, no account) stop the whole job
//! - A pause between memes keeps the oracle's rate limit happy
//!
//! ## Notes
//! - `--dry-run` only prints the selection, no account is needed
//! - Scores land later, when the oracle calls back into MemeStaking
use std::sync::Arc;

use anyhow::{Result, bail};
use chain::{
    Aggregator, ChainWriter, ContractReader, Session, StakingReader, Transport,
    transport::chain_id,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{info, warn};

pub mod models;
pub mod utils;

use models::{Candidate, ChainTarget, RefreshOptions, RefreshReport};
use utils::{batches, is_fatal, needs_refresh, now};

pub async fn refresh_engagement<T: Transport + 'static>(
    transport: Arc<T>,
    target: ChainTarget,
    options: RefreshOptions,
) -> Result<RefreshReport> {
    let writer = if options.dry_run {
        let actual = chain_id(&transport).await?;
        if actual != target.chain_id {
            bail!("RPC endpoint is on chain {actual}, expected chain {}", target.chain_id);
        }

        None
    } else {
        let session = Session::new(target.chain_id);

        let writer = match target.signer {
            Some(signer) => {
                let account = session.connect_local(&transport, signer.address()).await?;
                println!("Signing locally as {account}");

                ChainWriter::new(transport.clone(), session, target.contracts).with_local_signer(signer)
            }
            None => {
                let account = session.connect(&transport, target.from).await?;
                println!("Sending as {account} through the RPC endpoint");

                ChainWriter::new(transport.clone(), session, target.contracts)
            }
        };

        Some(writer)
    };

    let reader = ContractReader::new(transport, target.contracts);
    let aggregator = Aggregator::new(Arc::new(reader), options.batch_size as usize);

    let total_memes = aggregator.reader().next_meme_id().await?.saturating_sub(1);
    println!("Total memes found: {total_memes}\n");

    let mut report = RefreshReport {
        total_memes,
        ..RefreshReport::default()
    };

    let pb = ProgressBar::new(total_memes);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    for batch in batches(total_memes, options.batch_size) {
        pb.set_message(format!("Memes {} to {}", batch.start(), batch.end()));

        let listing = aggregator.memes(batch.clone().collect()).await;
        report.unreadable += listing.failed;

        let candidates: Vec<Candidate> = listing
            .items
            .iter()
            .filter_map(|meme| needs_refresh(meme, now(), options.update_interval))
            .collect();

        report.skipped += listing.requested - listing.failed - candidates.len();
        report.selected += candidates.len();
        pb.inc(batch.count() as u64);

        let Some(writer) = &writer else {
            for candidate in &candidates {
                pb.println(format!(
                    "Would refresh Meme #{} (Tweet ID: {})",
                    candidate.meme_id, candidate.external_post_id
                ));
            }

            continue;
        };

        for candidate in &candidates {
            if request_with_retries(writer, candidate, &options).await? {
                report.requested += 1;
            } else {
                report.failed += 1;
                pb.println(format!(
                    "Failed to update Meme #{} after {} attempts",
                    candidate.meme_id, options.max_retries
                ));
            }

            sleep(options.pause).await;
        }
    }

    pb.finish_with_message("Done");

    println!("\nSelected: {}", report.selected);
    println!("Requested: {}", report.requested);
    println!("Failed: {}", report.failed);
    println!("Skipped: {}", report.skipped);
    println!("Unreadable: {}", report.unreadable);

    Ok(report)
}

/// `Ok(false)` once every attempt failed, `Err` only for errors a retry cannot fix.
async fn request_with_retries<T: Transport>(
    writer: &ChainWriter<Arc<T>>,
    candidate: &Candidate,
    options: &RefreshOptions,
) -> Result<bool> {
    let attempts = options.max_retries.max(1);

    for attempt in 1..=attempts {
        #[cfg(feature = "verbose")]
        println!(
            "Updating engagement for Meme #{} (Tweet ID: {}), attempt {attempt} of {attempts}",
            candidate.meme_id, candidate.external_post_id
        );

        match writer
            .request_engagement_metrics(candidate.meme_id, &candidate.external_post_id)
            .await
        {
            Ok(request) => {
                info!(
                    "Requested metrics for meme {} in {} (request {:?})",
                    candidate.meme_id, request.tx_hash, request.request_id
                );
                return Ok(true);
            }
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                warn!(
                    "Attempt {attempt} of {attempts} failed for meme {}: {e}",
                    candidate.meme_id
                );

                if attempt < attempts {
                    sleep(options.retry_delay).await;
                }
            }
        }
    }

    Ok(false)
}
