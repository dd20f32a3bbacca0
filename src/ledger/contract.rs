use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::timestamp::Timestamp;

use super::{Address, Deployment, Ledger, LedgerError, TxReceipt};

/// Gas limit for the contract-creation transaction.
pub const DEPLOY_GAS_LIMIT: u64 = 3_000_000;

/// Per-voter state held by the contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterStatus {
    pub valid_voter: bool,
    pub voted: bool,
    #[serde(default)]
    pub voted_for: u32,
}

/// Per-candidate tally held by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub name: String,
    pub vote_count: u64,
}

/// Typed accessor over one deployed election contract.
///
/// Candidate IDs are indices into the candidate list the contract was
/// constructed with.
pub struct ElectionContract<'l> {
    ledger: &'l dyn Ledger,
    address: Address,
}

impl<'l> ElectionContract<'l> {
    /// Handle on the contract deployed at `address`.
    pub fn at(ledger: &'l dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    /// Publish a new election contract. The constructor takes the candidate
    /// names, then the end time, then the start time, both as epoch seconds.
    pub async fn deploy(
        ledger: &'l dyn Ledger,
        candidates: &[String],
        end_time: Timestamp,
        start_time: Timestamp,
        from: &Address,
    ) -> Result<Deployment, LedgerError> {
        ledger
            .deploy(
                vec![json!(candidates), json!(end_time), json!(start_time)],
                from,
                DEPLOY_GAS_LIMIT,
            )
            .await
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> Result<T, LedgerError> {
        let result = self.ledger.call(&self.address, method, args).await?;
        serde_json::from_value(result).map_err(|err| {
            LedgerError::Protocol(format!("bad result from {method}: {err}"))
        })
    }

    pub async fn voter(&self, address: &Address) -> Result<VoterStatus, LedgerError> {
        self.call_as("voters", vec![json!(address)]).await
    }

    pub async fn number_of_candidates(&self) -> Result<u32, LedgerError> {
        self.call_as("numberOfCandidates", vec![]).await
    }

    pub async fn candidate(&self, index: u32) -> Result<CandidateTally, LedgerError> {
        self.call_as("candidates", vec![json!(index)]).await
    }

    pub async fn winner(&self) -> Result<String, LedgerError> {
        self.call_as("getWinner", vec![]).await
    }

    pub async fn vote(&self, candidate: u32, from: &Address) -> Result<TxReceipt, LedgerError> {
        self.ledger
            .send(&self.address, "vote", vec![json!(candidate)], from)
            .await
    }

    /// Grant the right to vote to every address in one batched transaction.
    pub async fn give_right_to_vote(
        &self,
        voters: &[Address],
        from: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        self.ledger
            .send(&self.address, "giveRightToVote", vec![json!(voters)], from)
            .await
    }
}
