//! # Chain Writer
//!
//! State-changing calls. Each one:
//! 1. Validates its inputs locally
//! 2. Requires a connected [`Session`]
//! 3. Sends the transaction from the session account
//! 4. Polls for the receipt until it lands or the confirmation timeout runs out
//!
//! Without a local key the endpoint signs, through `eth_sendTransaction` from an account it
//! holds unlocked. With [`ChainWriter::with_local_signer`] the transaction is built here
//! (nonce, gas price and estimate from the node), signed as an EIP-155 legacy transaction
//! and sent raw.
//!
//! No deduplication of in-flight writes. Resubmitting creates a new transaction.
use std::time::Duration;

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, B256, Bytes, TxKind, U256, hex};
use alloy_signer::SignerSync;
pub use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolCall, SolEvent};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::{
    abi::{IMemeNFT, IMemeStaking, ITwitterEngagement},
    constants::MIN_STAKE_AMOUNT,
    error::{ChainError, ValidationError},
    models::Contracts,
    reader::StakingReader,
    session::Session,
    transport::{Transport, parse_quantity},
    units::{format_amount, parse_amount},
};

#[derive(Clone, Copy, Debug)]
pub struct ConfirmPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: B256,
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl Receipt {
    /// First indexed argument of the first log emitted as `signature`.
    fn indexed_arg(&self, signature: B256) -> Option<B256> {
        self.logs
            .iter()
            .find(|log| log.topics.first() == Some(&signature))
            .and_then(|log| log.topics.get(1))
            .copied()
    }
}

#[derive(Debug)]
pub struct Submitted {
    pub tx_hash: B256,
    /// Missing when the receipt carried no `MemeSubmitted` log.
    pub meme_id: Option<u64>,
}

#[derive(Debug)]
pub struct Minted {
    pub tx_hash: B256,
    pub token_id: U256,
}

#[derive(Debug)]
pub struct EngagementRequest {
    pub tx_hash: B256,
    pub request_id: Option<B256>,
}

/// Arguments shared by the regular and emergency mint.
#[derive(Clone, Debug)]
pub struct MintRequest {
    pub winner: Address,
    pub contest_id: u64,
    pub meme_id: u64,
    pub original_content_hash: String,
    pub total_staked: String,
}

pub struct ChainWriter<T> {
    transport: T,
    session: Session,
    contracts: Contracts,
    confirm: ConfirmPolicy,
    min_stake: U256,
    signer: Option<PrivateKeySigner>,
}

impl<T: Transport> ChainWriter<T> {
    pub fn new(transport: T, session: Session, contracts: Contracts) -> Self {
        Self {
            transport,
            session,
            contracts,
            confirm: ConfirmPolicy::default(),
            min_stake: parse_amount(MIN_STAKE_AMOUNT).unwrap_or(U256::ZERO),
            signer: None,
        }
    }

    /// Signs locally instead of asking the endpoint to.
    ///
    /// The session must be connected as the signer's address, see [`Session::connect_local`].
    pub fn with_local_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn with_confirm_policy(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_min_stake(mut self, min_stake: U256) -> Self {
        self.min_stake = min_stake;
        self
    }

    /// Replaces the built-in minimum with the one the contract currently enforces.
    pub async fn load_min_stake<R: StakingReader>(&mut self, reader: &R) -> Result<U256, ChainError> {
        self.min_stake = reader.min_stake_amount().await?;
        debug!("Minimum stake is {}", format_amount(self.min_stake));

        Ok(self.min_stake)
    }

    pub async fn submit_meme(
        &self,
        content_hash: &str,
        external_post_id: &str,
    ) -> Result<Submitted, ChainError> {
        require(content_hash, "content hash")?;

        let call = IMemeStaking::submitMemeCall {
            ipfsHash: content_hash.to_string(),
            tweetId: external_post_id.to_string(),
        };
        let receipt = self.send(self.contracts.staking, &call, U256::ZERO).await?;

        let meme_id = receipt
            .indexed_arg(IMemeStaking::MemeSubmitted::SIGNATURE_HASH)
            .and_then(|topic| u64::try_from(U256::from_be_bytes(topic.0)).ok());

        Ok(Submitted {
            tx_hash: receipt.transaction_hash,
            meme_id,
        })
    }

    /// `amount` is a decimal BNB string, sent as the transaction value.
    pub async fn stake_on_meme(&self, meme_id: u64, amount: &str) -> Result<B256, ChainError> {
        let value = parse_amount(amount)?;

        if value.is_zero() {
            return Err(ValidationError::InvalidAmount(amount.to_string()).into());
        }

        if value < self.min_stake {
            return Err(ValidationError::BelowMinimum {
                amount: amount.to_string(),
                minimum: format_amount(self.min_stake),
            }
            .into());
        }

        let call = IMemeStaking::stakeMemeCall {
            memeId: U256::from(meme_id),
        };

        self.confirmed_hash(self.contracts.staking, &call, value).await
    }

    pub async fn withdraw_stake(&self, meme_id: u64) -> Result<B256, ChainError> {
        let call = IMemeStaking::withdrawStakeCall {
            memeId: U256::from(meme_id),
        };

        self.confirmed_hash(self.contracts.staking, &call, U256::ZERO)
            .await
    }

    pub async fn end_contest(&self) -> Result<B256, ChainError> {
        self.confirmed_hash(
            self.contracts.staking,
            &IMemeStaking::endContestCall {},
            U256::ZERO,
        )
        .await
    }

    pub async fn distribute_rewards_batch(&self, meme_id: u64) -> Result<B256, ChainError> {
        let call = IMemeStaking::distributeRewardsBatchCall {
            memeId: U256::from(meme_id),
        };

        self.confirmed_hash(self.contracts.staking, &call, U256::ZERO)
            .await
    }

    pub async fn update_engagement_score(
        &self,
        meme_id: u64,
        score: u64,
    ) -> Result<B256, ChainError> {
        let call = IMemeStaking::updateEngagementScoreCall {
            memeId: U256::from(meme_id),
            score: U256::from(score),
        };

        self.confirmed_hash(self.contracts.staking, &call, U256::ZERO)
            .await
    }

    pub async fn set_min_stake_amount(&self, amount: &str) -> Result<B256, ChainError> {
        let call = IMemeStaking::setMinStakeAmountCall {
            amount: parse_amount(amount)?,
        };

        self.confirmed_hash(self.contracts.staking, &call, U256::ZERO)
            .await
    }

    pub async fn set_contest_duration(&self, seconds: u64) -> Result<B256, ChainError> {
        let call = IMemeStaking::setContestDurationCall {
            duration: U256::from(seconds),
        };

        self.confirmed_hash(self.contracts.staking, &call, U256::ZERO)
            .await
    }

    pub async fn mint_winner_nft(&self, request: &MintRequest) -> Result<Minted, ChainError> {
        require(&request.original_content_hash, "original content hash")?;

        let call = IMemeNFT::mintWinnerNFTCall {
            winner: request.winner,
            contestId: request.contest_id,
            memeId: request.meme_id,
            originalMemeHash: request.original_content_hash.clone(),
            totalStaked: parse_amount(&request.total_staked)?,
        };
        let receipt = self.send(self.contracts.nft, &call, U256::ZERO).await?;

        minted(&receipt, IMemeNFT::WinnerNFTMinted::SIGNATURE_HASH)
    }

    pub async fn emergency_mint_nft(
        &self,
        request: &MintRequest,
        reason: &str,
    ) -> Result<Minted, ChainError> {
        require(&request.original_content_hash, "original content hash")?;
        require(reason, "reason")?;

        let call = IMemeNFT::emergencyMintCall {
            winner: request.winner,
            contestId: request.contest_id,
            memeId: request.meme_id,
            originalMemeHash: request.original_content_hash.clone(),
            totalStaked: parse_amount(&request.total_staked)?,
            reason: reason.to_string(),
        };
        let receipt = self.send(self.contracts.nft, &call, U256::ZERO).await?;

        minted(&receipt, IMemeNFT::EmergencyMint::SIGNATURE_HASH)
    }

    pub async fn request_engagement_metrics(
        &self,
        meme_id: u64,
        external_post_id: &str,
    ) -> Result<EngagementRequest, ChainError> {
        require(external_post_id, "external post id")?;

        let call = ITwitterEngagement::requestEngagementMetricsCall {
            memeId: U256::from(meme_id),
            tweetId: external_post_id.to_string(),
        };
        let receipt = self.send(self.contracts.engagement, &call, U256::ZERO).await?;

        Ok(EngagementRequest {
            tx_hash: receipt.transaction_hash,
            request_id: receipt
                .indexed_arg(ITwitterEngagement::EngagementRequestSent::SIGNATURE_HASH),
        })
    }

    async fn confirmed_hash<C: SolCall>(
        &self,
        to: Address,
        call: &C,
        value: U256,
    ) -> Result<B256, ChainError> {
        Ok(self.send(to, call, value).await?.transaction_hash)
    }

    async fn send<C: SolCall>(
        &self,
        to: Address,
        call: &C,
        value: U256,
    ) -> Result<Receipt, ChainError> {
        let from = self.session.account()?;
        let data = call.abi_encode();

        let transaction = json!({
            "from": from.to_string(),
            "to": to.to_string(),
            "data": hex::encode_prefixed(&data),
            "value": format!("0x{value:x}"),
        });

        let hash = match &self.signer {
            Some(signer) => {
                let raw = self.sign(signer, transaction, to, data, value).await?;
                self.transport
                    .request("eth_sendRawTransaction", json!([hex::encode_prefixed(raw)]))
                    .await?
            }
            None => {
                self.transport
                    .request("eth_sendTransaction", json!([transaction]))
                    .await?
            }
        };
        let hash: B256 = serde_json::from_value(hash)?;
        info!("Sent {} as {hash}", C::SIGNATURE);

        self.wait_for_receipt(hash).await
    }

    async fn sign(
        &self,
        signer: &PrivateKeySigner,
        transaction: serde_json::Value,
        to: Address,
        data: Vec<u8>,
        value: U256,
    ) -> Result<Vec<u8>, ChainError> {
        let from = signer.address();
        if self.session.account()? != from {
            return Err(ChainError::NotConnected);
        }

        let nonce = self
            .quantity("eth_getTransactionCount", json!([from.to_string(), "pending"]))
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
        let estimate = self.quantity("eth_estimateGas", json!([transaction])).await?;

        let tx = TxLegacy {
            chain_id: Some(self.session.chain_id()?),
            nonce,
            gas_price: u128::from(gas_price),
            // 20% headroom over the estimate
            gas_limit: estimate.saturating_add(estimate / 5),
            to: TxKind::Call(to),
            value,
            input: Bytes::from(data),
        };

        let signature = signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| ChainError::Rejected(format!("signing failed: {e}")))?;
        debug!("Signed transaction {nonce} from {from}");

        Ok(TxEnvelope::Legacy(tx.into_signed(signature)).encoded_2718())
    }

    async fn quantity(&self, method: &str, params: serde_json::Value) -> Result<u64, ChainError> {
        parse_quantity(&self.transport.request(method, params).await?)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<Receipt, ChainError> {
        let deadline = Instant::now() + self.confirm.timeout;

        loop {
            let value = self
                .transport
                .request("eth_getTransactionReceipt", json!([hash]))
                .await?;

            if !value.is_null() {
                let receipt: Receipt = serde_json::from_value(value)?;

                if receipt.status.as_deref() == Some("0x0") {
                    return Err(ChainError::Reverted(format!("transaction {hash} reverted")));
                }

                info!("Confirmed {hash}");
                return Ok(receipt);
            }

            if Instant::now() >= deadline {
                return Err(ChainError::Timeout(self.confirm.timeout));
            }

            debug!("Waiting for receipt of {hash}");
            sleep(self.confirm.poll_interval).await;
        }
    }
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }

    Ok(())
}

fn minted(receipt: &Receipt, signature: B256) -> Result<Minted, ChainError> {
    let token_id = receipt
        .indexed_arg(signature)
        .map(|topic| U256::from_be_bytes(topic.0))
        .ok_or_else(|| {
            ChainError::Decode(format!(
                "no token id in receipt of {}",
                receipt.transaction_hash
            ))
        })?;

    Ok(Minted {
        tx_hash: receipt.transaction_hash,
        token_id,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::mock::{ScriptedTransport, user, wei};

    const TX_HASH: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    fn topic(value: u64) -> String {
        hex::encode_prefixed(U256::from(value).to_be_bytes::<32>())
    }

    fn receipt(status: &str, logs: Value) -> Result<Value, ChainError> {
        Ok(json!({
            "transactionHash": TX_HASH,
            "status": status,
            "logs": logs,
        }))
    }

    async fn connected(responses: Vec<Result<Value, ChainError>>) -> ChainWriter<ScriptedTransport> {
        let mut script = vec![Ok(json!("0x61")), Ok(json!([user(9).to_string()]))];
        script.extend(responses);

        let transport = ScriptedTransport::new(script);
        let session = Session::new(97);
        session.connect(&transport, None).await.unwrap();

        ChainWriter::new(transport, session, Contracts::default()).with_confirm_policy(
            ConfirmPolicy {
                timeout: Duration::from_secs(5),
                poll_interval: Duration::ZERO,
            },
        )
    }

    // Well-known development key, never funded anywhere real
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn test_requires_connection() {
        let writer = ChainWriter::new(
            ScriptedTransport::new([]),
            Session::new(97),
            Contracts::default(),
        );

        assert!(matches!(
            writer.withdraw_stake(1).await,
            Err(ChainError::NotConnected)
        ));
        assert!(matches!(
            writer.end_contest().await,
            Err(ChainError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_stake_validation_stays_local() {
        let writer = connected(vec![]).await;

        assert!(matches!(
            writer.stake_on_meme(1, "0.0001").await,
            Err(ChainError::Validation(ValidationError::BelowMinimum { .. }))
        ));
        assert!(matches!(
            writer.stake_on_meme(1, "lots").await,
            Err(ChainError::Validation(ValidationError::InvalidAmount(_)))
        ));
        assert!(matches!(
            writer.stake_on_meme(1, "0").await,
            Err(ChainError::Validation(ValidationError::InvalidAmount(_)))
        ));
        assert!(matches!(
            writer.submit_meme("  ", "1790").await,
            Err(ChainError::Validation(ValidationError::MissingField(_)))
        ));
        assert_eq!(writer.transport.methods(), vec!["eth_chainId", "eth_requestAccounts"]);
    }

    #[tokio::test]
    async fn test_configured_minimum() {
        let writer = connected(vec![]).await.with_min_stake(wei("0.5"));

        assert!(matches!(
            writer.stake_on_meme(1, "0.25").await,
            Err(ChainError::Validation(ValidationError::BelowMinimum { minimum, .. })) if minimum == "0.5"
        ));
    }

    #[tokio::test]
    async fn test_min_stake_loaded_from_contract() {
        use alloy_sol_types::SolValue;

        use crate::reader::ContractReader;

        let reader = ContractReader::new(
            ScriptedTransport::new([Ok(json!(hex::encode_prefixed(
                wei("0.05").abi_encode()
            )))]),
            Contracts::default(),
        );
        let mut writer = connected(vec![]).await;

        assert_eq!(writer.load_min_stake(&reader).await.unwrap(), wei("0.05"));
        assert!(matches!(
            writer.stake_on_meme(1, "0.01").await,
            Err(ChainError::Validation(ValidationError::BelowMinimum { minimum, .. })) if minimum == "0.05"
        ));
    }

    #[tokio::test]
    async fn test_local_signer_sends_raw_transaction() {
        use alloy_eips::eip2718::Decodable2718;

        let signer: PrivateKeySigner = DEV_KEY.parse().unwrap();
        let account = signer.address();

        let transport = ScriptedTransport::new([
            Ok(json!("0x61")),
            Ok(json!("0x7")),
            Ok(json!("0x3b9aca00")),
            Ok(json!("0x5208")),
            Ok(json!(TX_HASH)),
            receipt("0x1", json!([])),
        ]);
        let session = Session::new(97);
        session.connect_local(&transport, account).await.unwrap();

        let writer = ChainWriter::new(transport, session, Contracts::default())
            .with_local_signer(signer)
            .with_confirm_policy(ConfirmPolicy {
                timeout: Duration::from_secs(5),
                poll_interval: Duration::ZERO,
            });

        let hash = writer.stake_on_meme(3, "0.01").await.unwrap();
        assert_eq!(hash, TX_HASH.parse::<B256>().unwrap());
        assert_eq!(
            writer.transport.methods(),
            vec![
                "eth_chainId",
                "eth_getTransactionCount",
                "eth_gasPrice",
                "eth_estimateGas",
                "eth_sendRawTransaction",
                "eth_getTransactionReceipt"
            ]
        );
        assert_eq!(writer.transport.params(1), json!([account.to_string(), "pending"]));

        let raw = writer.transport.params(4)[0].as_str().unwrap().to_string();
        let raw = hex::decode(raw).unwrap();
        let TxEnvelope::Legacy(signed) = TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap() else {
            panic!("expected a legacy transaction");
        };

        assert_eq!(signed.recover_signer().unwrap(), account);
        assert_eq!(signed.tx().chain_id, Some(97));
        assert_eq!(signed.tx().nonce, 7);
        assert_eq!(signed.tx().gas_price, 1_000_000_000);
        assert_eq!(signed.tx().gas_limit, 25_200);
        assert_eq!(signed.tx().value, wei("0.01"));
        assert_eq!(signed.tx().to, TxKind::Call(Contracts::default().staking));
    }

    #[tokio::test]
    async fn test_local_signer_must_match_session() {
        let signer: PrivateKeySigner = DEV_KEY.parse().unwrap();
        let writer = connected(vec![]).await.with_local_signer(signer);

        assert!(matches!(
            writer.withdraw_stake(1).await,
            Err(ChainError::NotConnected)
        ));
        assert_eq!(writer.transport.methods(), vec!["eth_chainId", "eth_requestAccounts"]);
    }

    #[tokio::test]
    async fn test_stake_sends_value_in_wei() {
        let writer = connected(vec![Ok(json!(TX_HASH)), receipt("0x1", json!([]))]).await;

        let hash = writer.stake_on_meme(3, "0.01").await.unwrap();
        assert_eq!(hash, TX_HASH.parse::<B256>().unwrap());

        let sent = writer.transport.params(2);
        assert_eq!(sent[0]["value"], json!(format!("0x{:x}", wei("0.01"))));
        assert_eq!(sent[0]["from"], json!(user(9).to_string()));
    }

    #[tokio::test]
    async fn test_submit_meme_waits_and_reads_id() {
        let log = json!([{
            "address": Contracts::default().staking.to_string(),
            "topics": [
                hex::encode_prefixed(IMemeStaking::MemeSubmitted::SIGNATURE_HASH),
                topic(5),
                hex::encode_prefixed(user(9).into_word()),
            ],
            "data": "0x",
        }]);
        let writer = connected(vec![
            Ok(json!(TX_HASH)),
            Ok(Value::Null),
            receipt("0x1", log),
        ])
        .await;

        let submitted = writer.submit_meme("QmMeme", "1790").await.unwrap();
        assert_eq!(submitted.meme_id, Some(5));
        assert_eq!(
            writer.transport.methods()[2..],
            [
                "eth_sendTransaction",
                "eth_getTransactionReceipt",
                "eth_getTransactionReceipt"
            ]
        );
    }

    #[tokio::test]
    async fn test_reverted_receipt() {
        let writer = connected(vec![Ok(json!(TX_HASH)), receipt("0x0", json!([]))]).await;

        assert!(matches!(
            writer.withdraw_stake(1).await,
            Err(ChainError::Reverted(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_by_wallet() {
        let writer = connected(vec![Err(ChainError::Rejected(
            "User denied transaction signature".into(),
        ))])
        .await;

        assert!(matches!(
            writer.end_contest().await,
            Err(ChainError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_confirmation_timeout() {
        let writer = connected(vec![Ok(json!(TX_HASH)), Ok(Value::Null)])
            .await
            .with_confirm_policy(ConfirmPolicy {
                timeout: Duration::ZERO,
                poll_interval: Duration::ZERO,
            });

        assert!(matches!(
            writer.withdraw_stake(1).await,
            Err(ChainError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_mint_reads_token_id() {
        let log = json!([{
            "address": Contracts::default().nft.to_string(),
            "topics": [hex::encode_prefixed(IMemeNFT::WinnerNFTMinted::SIGNATURE_HASH), topic(12)],
            "data": "0x",
        }]);
        let writer = connected(vec![Ok(json!(TX_HASH)), receipt("0x1", log)]).await;

        let request = MintRequest {
            winner: user(2),
            contest_id: 1,
            meme_id: 3,
            original_content_hash: "QmMeme3".into(),
            total_staked: "1.7".into(),
        };

        let minted = writer.mint_winner_nft(&request).await.unwrap();
        assert_eq!(minted.token_id, U256::from(12));
    }

    #[tokio::test]
    async fn test_emergency_mint_without_event_is_decode_error() {
        let writer = connected(vec![Ok(json!(TX_HASH)), receipt("0x1", json!([]))]).await;

        let request = MintRequest {
            winner: user(2),
            contest_id: 1,
            meme_id: 3,
            original_content_hash: "QmMeme3".into(),
            total_staked: "1.7".into(),
        };

        assert!(matches!(
            writer.emergency_mint_nft(&request, "oracle outage").await,
            Err(ChainError::Decode(_))
        ));
    }
}
