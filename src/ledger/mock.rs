use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::model::user::AccountIndex;

use super::{
    Address, CandidateTally, Deployment, Ledger, LedgerError, TxReceipt, VoterStatus,
};

/// A scriptable in-process ledger, behaving like a deployed election
/// contract: rights must be granted before voting, double votes revert,
/// results revert until the election is marked ended.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    voters: HashMap<Address, VoterStatus>,
    grant_batches: Vec<Vec<Address>>,
    deployments: u32,
    calls: u32,
    candidates: Vec<CandidateTally>,
    winner: String,
    ended: bool,
}

impl MockLedger {
    /// Deterministic address of a wallet account.
    pub fn account_address(account: AccountIndex) -> Address {
        Address::from(format!("0xaccount{account:04}"))
    }

    /// Number of contract-creation transactions submitted so far.
    pub fn deployment_count(&self) -> u32 {
        self.state.lock().unwrap().deployments
    }

    /// Number of read-only calls made so far.
    pub fn call_count(&self) -> u32 {
        self.state.lock().unwrap().calls
    }

    /// Every `giveRightToVote` batch submitted so far.
    pub fn grant_batches(&self) -> Vec<Vec<Address>> {
        self.state.lock().unwrap().grant_batches.clone()
    }

    pub fn voter_status(&self, address: &Address) -> VoterStatus {
        self.state
            .lock()
            .unwrap()
            .voters
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    /// Script the final tallies and mark the election as ended.
    pub fn finish_with_results(&self, tallies: &[(&str, u64)], winner: &str) {
        let mut state = self.state.lock().unwrap();
        state.candidates = tallies
            .iter()
            .map(|(name, votes)| CandidateTally {
                name: name.to_string(),
                vote_count: *votes,
            })
            .collect();
        state.winner = winner.to_string();
        state.ended = true;
    }

    fn arg<T: serde::de::DeserializeOwned>(args: &[Value], index: usize) -> Result<T, LedgerError> {
        args.get(index)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| LedgerError::Protocol(format!("missing argument {index}")))
    }
}

#[rocket::async_trait]
impl Ledger for MockLedger {
    async fn resolve_address(&self, account: AccountIndex) -> Result<Address, LedgerError> {
        Ok(Self::account_address(account))
    }

    async fn call(
        &self,
        _contract: &Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        match method {
            "voters" => {
                let address: Address = Self::arg(&args, 0)?;
                let status = state.voters.get(&address).copied().unwrap_or_default();
                Ok(json!(status))
            }
            "numberOfCandidates" => Ok(json!(state.candidates.len() as u32)),
            "candidates" => {
                let index: usize = Self::arg(&args, 0)?;
                state
                    .candidates
                    .get(index)
                    .map(|tally| json!(tally))
                    .ok_or_else(|| LedgerError::Reverted("invalid candidate".to_string()))
            }
            "getWinner" => {
                if !state.ended {
                    return Err(LedgerError::Reverted(
                        "Election end time has not passed".to_string(),
                    ));
                }
                Ok(json!(state.winner))
            }
            other => Err(LedgerError::Protocol(format!("unknown method {other}"))),
        }
    }

    async fn send(
        &self,
        _contract: &Address,
        method: &str,
        args: Vec<Value>,
        from: &Address,
    ) -> Result<TxReceipt, LedgerError> {
        let mut state = self.state.lock().unwrap();
        match method {
            "vote" => {
                let candidate: u32 = Self::arg(&args, 0)?;
                let status = state.voters.entry(from.clone()).or_default();
                if !status.valid_voter {
                    return Err(LedgerError::Reverted("Has no right to vote".to_string()));
                }
                if status.voted {
                    return Err(LedgerError::Reverted("Already voted".to_string()));
                }
                status.voted = true;
                status.voted_for = candidate;
                Ok(TxReceipt {
                    transaction_hash: format!("0xvote{:04}", candidate),
                })
            }
            "giveRightToVote" => {
                let addresses: Vec<Address> = Self::arg(&args, 0)?;
                for address in &addresses {
                    state.voters.entry(address.clone()).or_default().valid_voter = true;
                }
                let batch = state.grant_batches.len();
                state.grant_batches.push(addresses);
                Ok(TxReceipt {
                    transaction_hash: format!("0xgrant{batch:04}"),
                })
            }
            other => Err(LedgerError::Protocol(format!("unknown method {other}"))),
        }
    }

    async fn deploy(
        &self,
        _constructor_args: Vec<Value>,
        _from: &Address,
        _gas: u64,
    ) -> Result<Deployment, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.deployments += 1;
        let n = state.deployments;
        Ok(Deployment {
            address: Address::from(format!("0xcontract{n:04}")),
            transaction_hash: format!("0xdeploy{n:04}"),
        })
    }
}
