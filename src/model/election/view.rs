use serde::{Deserialize, Serialize};

use crate::ledger::Address;
use crate::model::user::UserId;

use super::{ElectionRecord, VoterList};

/// The organizer of record sees the full election, times humanized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerView {
    pub election_name: String,
    pub organizer_name: String,
    #[serde(rename = "organizerID")]
    pub organizer_id: UserId,
    pub candidates: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub voters: VoterList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl From<ElectionRecord> for OrganizerView {
    fn from(record: ElectionRecord) -> Self {
        Self {
            election_name: record.election_name,
            organizer_name: record.organizer_name,
            organizer_id: record.organizer_id,
            candidates: record.candidates,
            start_time: record.start_time.to_human(),
            end_time: record.end_time.to_human(),
            voters: record.voters,
            address: record.address,
        }
    }
}

/// What the requesting voter has done with their ballot, read from the
/// contract. `voted_for` is only meaningful once they have voted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStatus {
    pub voted: bool,
    #[serde(rename = "votedFor", skip_serializing_if = "Option::is_none")]
    pub voted_for: Option<u32>,
}

/// Voters see a filtered election: no allow-list, no organizer ID. The
/// ballot status is attached only on a direct lookup of a deployed
/// election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterView {
    pub election_name: String,
    pub organizer_name: String,
    pub candidates: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(flatten)]
    pub ballot: Option<BallotStatus>,
}

impl VoterView {
    pub fn new(record: ElectionRecord, ballot: Option<BallotStatus>) -> Self {
        Self {
            election_name: record.election_name,
            organizer_name: record.organizer_name,
            candidates: record.candidates,
            start_time: record.start_time.to_human(),
            end_time: record.end_time.to_human(),
            address: record.address,
            ballot,
        }
    }
}

/// One candidate's final tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub votes: u64,
}

/// Results of an ended election, read back from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub total_votes: u64,
    pub results: Vec<CandidateResult>,
    pub winner: String,
}
