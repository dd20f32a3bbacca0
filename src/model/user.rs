use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Index of a wallet account on the ledger. Assigned once per user at
/// registration, globally unique, never reused.
pub type AccountIndex = u32;

/// An opaque user identifier issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voters on an election's allow-list are identified by their user ID.
pub type VoterId = UserId;

/// A user's profile, as stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub account: AccountIndex,
}
