//! # Chain
//!
//! Everything the backend knows about the MEMEFI contracts.
//!
//!
//!
//! ## Contracts
//! - MemeStaking: memes, contests, stakes and the stake time-lock
//! - MemeNFT: winner NFTs minted once a contest ends
//! - TwitterEngagement: oracle that refreshes engagement scores from tweets
//!
//! The contracts themselves live elsewhere, we only talk to them over JSON-RPC.
//!
//!
//!
//! ## Layers
//! - [`transport`]: JSON-RPC envelopes over HTTP, per-call timeout
//! - [`reader`]: read-only calls, every lookup returns a [`Fetch`]
//! - [`writer`]: state-changing calls through a connected [`Session`], blocks until the receipt lands
//! - [`aggregate`]: fans reads out into lists, leaderboards and dashboards
//! - [`view`] + [`units`]: pure display transforms (wei, dates, addresses, countdowns)
//!
//!
//!
//! ## Notes
//!
//! ### Enumeration
//! The only way to list memes is the dense id range `[1, nextMemeId - 1]`. Deleted ids still
//! come back as zeroed records with `exists = false`, so they are filtered, never shown.
//!
//! ### Partial failures
//! A single failed read never aborts a listing. The item is dropped and counted so the
//! frontend can show "N of M loaded" instead of a blank page.
pub mod abi;
pub mod aggregate;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod models;
pub mod reader;
pub mod session;
pub mod transport;
pub mod units;
pub mod view;
pub mod writer;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use aggregate::{Aggregator, Listing, RankBy};
pub use error::{ChainError, Fetch, ValidationError};
pub use models::{Contest, Contracts, Meme, WinnerNft};
pub use reader::{ContractReader, NftReader, StakingReader};
pub use session::{Session, SessionState};
pub use transport::{HttpTransport, Transport};
pub use writer::ChainWriter;
