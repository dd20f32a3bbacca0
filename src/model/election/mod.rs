mod spec;
mod view;

pub use spec::ElectionSpec;
pub use view::{BallotStatus, CandidateResult, ElectionResults, OrganizerView, VoterView};

use std::fmt::{Display, Formatter};

use rocket::{request::FromParam, FromFormField};
use serde::{Deserialize, Serialize};

use crate::ledger::Address;
use crate::model::timestamp::Timestamp;
use crate::model::user::{UserId, VoterId};

/// An election's key in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionId(String);

impl ElectionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ElectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'a> FromParam<'a> for ElectionId {
    type Error = std::convert::Infallible;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Ok(Self(param.to_string()))
    }
}

/// The election allow-list.
///
/// Before deployment it holds plain voter IDs; deployment resolves them to
/// ledger addresses and converts the list one-way. The two variants never
/// coexist for one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoterList {
    Unresolved(Vec<VoterId>),
    Resolved(Vec<Address>),
}

impl VoterList {
    pub fn len(&self) -> usize {
        match self {
            Self::Unresolved(ids) => ids.len(),
            Self::Resolved(addresses) => addresses.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Time classification of an election, derived on every read and never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    Upcoming,
    Ongoing,
    Previous,
}

/// An election, as stored at `elections/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionRecord {
    pub election_name: String,
    pub organizer_name: String,
    #[serde(rename = "organizerID")]
    pub organizer_id: UserId,
    pub candidates: Vec<String>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub voters: VoterList,
    /// Present iff the election has been deployed; set at most once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl ElectionRecord {
    pub fn is_deployed(&self) -> bool {
        self.address.is_some()
    }

    pub fn organized_by(&self, user: &UserId) -> bool {
        &self.organizer_id == user
    }

    /// Classify this election relative to `now`. A draft is always
    /// upcoming, whatever its times say.
    pub fn bucket(&self, now: Timestamp) -> TimeBucket {
        if self.address.is_none() || now < self.start_time {
            TimeBucket::Upcoming
        } else if now >= self.end_time {
            TimeBucket::Previous
        } else {
            TimeBucket::Ongoing
        }
    }
}
