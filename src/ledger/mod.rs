//! The blockchain ledger.
//!
//! Votes, voting rights, and tallies live in a per-election smart contract
//! whose ABI is fixed. The contract itself is a black box; this module only
//! knows how to resolve wallet accounts to addresses and to invoke contract
//! methods through a signing gateway. [`contract::ElectionContract`] is the
//! typed accessor over the raw [`Ledger`] trait.

mod contract;
mod gateway;
#[cfg(test)]
mod mock;

pub use contract::{CandidateTally, ElectionContract, VoterStatus, DEPLOY_GAS_LIMIT};
pub use gateway::GatewayLedger;
#[cfg(test)]
pub use mock::MockLedger;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::model::user::AccountIndex;

/// A ledger address, for accounts and contracts alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receipt for a state-changing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
}

/// Result of a contract-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: Address,
    pub transaction_hash: String,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The contract rejected the transaction, with its reason string.
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("ledger transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger protocol violation: {0}")]
    Protocol(String),
}

/// A connection to the ledger, via a gateway holding the platform wallet.
///
/// One instance is owned by the process and shared by all requests. Every
/// method is a blocking round-trip: a transaction that has been submitted
/// cannot be withdrawn, and the core never retries a rejection.
#[rocket::async_trait]
pub trait Ledger: Send + Sync {
    /// Resolve a wallet account index to its ledger address.
    async fn resolve_address(&self, account: AccountIndex) -> Result<Address, LedgerError>;

    /// Invoke a read-only contract method. Costs no gas.
    async fn call(
        &self,
        contract: &Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LedgerError>;

    /// Submit a state-changing contract transaction signed by `from`.
    async fn send(
        &self,
        contract: &Address,
        method: &str,
        args: Vec<Value>,
        from: &Address,
    ) -> Result<TxReceipt, LedgerError>;

    /// Submit a contract-creation transaction signed by `from`.
    async fn deploy(
        &self,
        constructor_args: Vec<Value>,
        from: &Address,
        gas: u64,
    ) -> Result<Deployment, LedgerError>;
}
