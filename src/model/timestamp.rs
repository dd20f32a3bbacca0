use std::fmt::{Display, Formatter};

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An instant, stored as epoch seconds.
///
/// The API boundary speaks human-readable RFC 3339; everything at rest and
/// on-chain speaks epoch seconds. Sub-second precision is dropped on parse.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_epoch(seconds: i64) -> Self {
        Self(seconds)
    }

    pub fn epoch(self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    /// Parse a human-readable timestamp, truncating to whole seconds.
    pub fn parse_human(raw: &str) -> Result<Self, chrono::ParseError> {
        let parsed = DateTime::parse_from_rfc3339(raw)?;
        Ok(Self(parsed.timestamp()))
    }

    /// Render as an ISO 8601 UTC timestamp with millisecond precision.
    pub fn to_human(self) -> String {
        Utc.timestamp_opt(self.0, 0)
            .single()
            .expect("epoch seconds in representable range")
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_human())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_instant() {
        let ts = Timestamp::parse_human("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.epoch(), 1_704_067_200);
    }

    #[test]
    fn round_trip_preserves_the_instant() {
        let raw = "2024-01-01T00:00:00Z";
        let ts = Timestamp::parse_human(raw).unwrap();
        let human = ts.to_human();
        assert_eq!(human, "2024-01-01T00:00:00.000Z");
        assert_eq!(Timestamp::parse_human(&human).unwrap(), ts);
    }

    #[test]
    fn sub_second_precision_is_truncated() {
        let ts = Timestamp::parse_human("2024-01-01T00:00:00.900Z").unwrap();
        assert_eq!(ts, Timestamp::parse_human("2024-01-01T00:00:00Z").unwrap());
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let ts = Timestamp::parse_human("2024-01-01T05:30:00+05:30").unwrap();
        assert_eq!(ts.to_human(), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse_human("next tuesday").is_err());
    }

    #[test]
    fn ordering_follows_time() {
        let earlier = Timestamp::from_epoch(100);
        let later = Timestamp::from_epoch(200);
        assert!(earlier < later);
    }
}
