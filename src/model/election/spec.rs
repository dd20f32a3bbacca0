use serde::{Deserialize, Serialize};

use crate::model::user::VoterId;

/// An election specification, as submitted by an organizer when creating
/// or updating a draft. Times are human-readable at this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub election_name: String,
    pub candidates: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub valid_voters: Vec<VoterId>,
}
