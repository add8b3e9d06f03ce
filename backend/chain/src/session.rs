//! # Session
//!
//! Explicit wallet connection context, handed to whatever needs the connected account.
//!
//! ## Lifecycle
//! - `Disconnected` → `Connecting` → `Connected { account, chain_id }`
//! - Network change drops back to `Disconnected`, the caller reconnects against the right chain
//! - Account change swaps the account in place, an empty account list disconnects
//! - A locally held key skips the account request, [`Session::connect_local`] only checks the network
//!
//! Clones share state. Observers can [`Session::subscribe`] to follow transitions.
use std::sync::Arc;

use alloy_primitives::Address;
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    error::ChainError,
    transport::{METHOD_NOT_FOUND, Transport, chain_id},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected { account: Address, chain_id: u64 },
}

#[derive(Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
    expected_chain_id: u64,
}

impl Session {
    pub fn new(expected_chain_id: u64) -> Self {
        Self {
            state: Arc::new(watch::Sender::new(SessionState::Disconnected)),
            expected_chain_id,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Connected { .. })
    }

    /// Connected account, the precondition for every write.
    pub fn account(&self) -> Result<Address, ChainError> {
        match *self.state.borrow() {
            SessionState::Connected { account, .. } => Ok(account),
            _ => Err(ChainError::NotConnected),
        }
    }

    /// Chain of the live connection.
    pub fn chain_id(&self) -> Result<u64, ChainError> {
        match *self.state.borrow() {
            SessionState::Connected { chain_id, .. } => Ok(chain_id),
            _ => Err(ChainError::NotConnected),
        }
    }

    /// Checks the network, then asks the wallet for its accounts.
    ///
    /// With `preferred` set, that account must be among the ones the wallet unlocks.
    pub async fn connect<T: Transport>(
        &self,
        transport: &T,
        preferred: Option<Address>,
    ) -> Result<Address, ChainError> {
        self.state.send_replace(SessionState::Connecting);

        let established = async {
            let chain_id = self.check_network(transport).await?;
            let accounts = request_accounts(transport).await?;
            let account = match preferred {
                Some(wanted) => accounts.into_iter().find(|account| *account == wanted),
                None => accounts.into_iter().next(),
            }
            .ok_or(ChainError::NotConnected)?;

            Ok::<_, ChainError>((account, chain_id))
        };

        self.settle(established.await)
    }

    /// Connects as `account` whose key the caller signs with, no wallet involved.
    pub async fn connect_local<T: Transport>(
        &self,
        transport: &T,
        account: Address,
    ) -> Result<Address, ChainError> {
        self.state.send_replace(SessionState::Connecting);

        let chain_id = self.check_network(transport).await;
        self.settle(chain_id.map(|chain_id| (account, chain_id)))
    }

    fn settle(&self, established: Result<(Address, u64), ChainError>) -> Result<Address, ChainError> {
        match established {
            Ok((account, chain_id)) => {
                info!("Wallet connected as {account} on chain {chain_id}");
                self.state
                    .send_replace(SessionState::Connected { account, chain_id });

                Ok(account)
            }
            Err(e) => {
                warn!("Wallet connection failed: {e}");
                self.state.send_replace(SessionState::Disconnected);

                Err(e)
            }
        }
    }

    async fn check_network<T: Transport>(&self, transport: &T) -> Result<u64, ChainError> {
        let actual = chain_id(transport).await?;
        if actual != self.expected_chain_id {
            return Err(ChainError::WrongNetwork {
                expected: self.expected_chain_id,
                actual,
            });
        }

        Ok(actual)
    }

    pub fn disconnect(&self) {
        self.state.send_replace(SessionState::Disconnected);
    }

    pub fn accounts_changed(&self, accounts: &[Address]) {
        let Some(&first) = accounts.first() else {
            info!("Wallet reported no accounts, disconnecting");
            self.disconnect();
            return;
        };

        self.state.send_modify(|state| {
            if let SessionState::Connected { account, .. } = state {
                if *account != first {
                    info!("Wallet account changed to {first}");
                    *account = first;
                }
            }
        });
    }

    pub fn chain_changed(&self, chain_id: u64) {
        let connected_to = match *self.state.borrow() {
            SessionState::Connected {
                chain_id: current, ..
            } => Some(current),
            _ => None,
        };

        if connected_to.is_some_and(|current| current != chain_id) {
            warn!("Network changed to chain {chain_id}, session reset");
            self.disconnect();
        }
    }
}

async fn request_accounts<T: Transport>(transport: &T) -> Result<Vec<Address>, ChainError> {
    // Plain nodes only know eth_accounts
    let accounts = match transport.request("eth_requestAccounts", json!([])).await {
        Err(ChainError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => {
            transport.request("eth_accounts", json!([])).await?
        }
        other => other?,
    };

    parse_accounts(accounts)
}

fn parse_accounts(value: Value) -> Result<Vec<Address>, ChainError> {
    Ok(serde_json::from_value(value)?)
}
