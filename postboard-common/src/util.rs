use std::str::FromStr;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

/// A lifetime that is strictly greater than zero, such as a token expiry.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    pub fn from_seconds(seconds: i64) -> Result<Self, NonPositiveDurationError> {
        Duration::seconds(seconds).try_into()
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// Stored form; sub-second parts are dropped.
    #[must_use]
    pub fn whole_seconds(&self) -> i64 {
        self.0.whole_seconds()
    }

    /// The last instant still inside the lifetime when it starts at `start`.
    #[must_use]
    pub fn ends_after(&self, start: OffsetDateTime) -> OffsetDateTime {
        start.saturating_add(self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ParsePositiveDurationError {
    #[error("Expected a whole number of seconds: {0}")]
    Number(#[from] std::num::ParseIntError),
    #[error(transparent)]
    NonPositive(#[from] NonPositiveDurationError),
}

/// Parses a whole number of seconds.
impl FromStr for PositiveDuration {
    type Err = ParsePositiveDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_seconds(s.trim().parse()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn only_positive_durations() {
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::seconds(-5)).is_none());
        assert_eq!(
            PositiveDuration::from_seconds(90).map(|d| d.get()),
            Ok(Duration::seconds(90))
        );
    }

    #[test]
    fn parses_seconds() {
        assert_eq!("3600".parse::<PositiveDuration>().map(|d| d.whole_seconds()), Ok(3600));
        assert!(matches!(
            "0".parse::<PositiveDuration>(),
            Err(ParsePositiveDurationError::NonPositive(_))
        ));
        assert!(matches!(
            "soon".parse::<PositiveDuration>(),
            Err(ParsePositiveDurationError::Number(_))
        ));
    }

    #[test]
    fn lifetime_end() {
        let start = datetime!(2025-03-01 12:00 UTC);
        let lifetime = PositiveDuration::from_seconds(60).unwrap();

        assert_eq!(lifetime.ends_after(start), datetime!(2025-03-01 12:01 UTC));
    }
}
