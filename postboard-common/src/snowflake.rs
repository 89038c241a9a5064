//! Snowflake ids.
//!
//! A snowflake packs, from the most significant bit down, 42 bits of
//! milliseconds since an [`Epoch`], a 5 bit worker id, a 5 bit process id and
//! a 12 bit sequence number. See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const WORKER_ID_BITS: u32 = 5;
pub const PROCESS_ID_BITS: u32 = 5;
pub const SEQUENCE_BITS: u32 = 12;

const SEQUENCE_SHIFT: u32 = 0;
const PROCESS_ID_SHIFT: u32 = SEQUENCE_SHIFT + SEQUENCE_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum TimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    BeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TooLarge,
}

macro_rules! snowflake_part {
    ($name:ident: $repr:ty, bits = $bits:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            #[must_use]
            pub fn new(value: $repr) -> Option<Self> {
                (u64::from(value) <= mask($bits)).then_some(Self(value))
            }

            #[must_use]
            pub fn get(self) -> $repr {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = <$repr>::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

snowflake_part!(WorkerId: u8, bits = WORKER_ID_BITS);
snowflake_part!(ProcessId: u8, bits = PROCESS_ID_BITS);
snowflake_part!(Sequence: u16, bits = SEQUENCE_BITS);

impl Sequence {
    /// The following sequence number, wrapping to zero after the 12 bit maximum.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn next(self) -> Self {
        Self(((u64::from(self.0) + 1) & mask(SEQUENCE_BITS)) as u16)
    }
}

/// Milliseconds between the epoch and `time`, checked to fit the timestamp bits.
pub fn millis_since_epoch<SnowflakeEpoch: Epoch>(
    time: UtcDateTime,
) -> Result<u64, TimestampError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(TimestampError::BeforeEpoch);
    }

    let millis = u64::try_from(millis).map_err(|_| TimestampError::TooLarge)?;
    (millis <= mask(TIMESTAMP_BITS))
        .then_some(millis)
        .ok_or(TimestampError::TooLarge)
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    /// Returns `None` if `millis` does not fit the timestamp bits.
    #[must_use]
    pub fn from_parts(
        millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        sequence: Sequence,
    ) -> Option<Self> {
        if millis > mask(TIMESTAMP_BITS) {
            return None;
        }

        let snowflake = millis << TIMESTAMP_SHIFT
            | u64::from(worker_id.get()) << WORKER_ID_SHIFT
            | u64::from(process_id.get()) << PROCESS_ID_SHIFT
            | u64::from(sequence.get()) << SEQUENCE_SHIFT;

        Some(Self::new(snowflake))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId(((self.0 >> WORKER_ID_SHIFT) & mask(WORKER_ID_BITS)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn process_id(self) -> ProcessId {
        ProcessId(((self.0 >> PROCESS_ID_SHIFT) & mask(PROCESS_ID_BITS)) as u8)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sequence(self) -> Sequence {
        Sequence(((self.0 >> SEQUENCE_SHIFT) & mask(SEQUENCE_BITS)) as u16)
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.millis().cast_signed())
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_sequence: Sequence,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch: Epoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_sequence: Sequence::default(),
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, TimestampError> {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();

        Snowflake::from_parts(millis, self.worker_id, self.process_id, sequence)
            .ok_or(TimestampError::TooLarge)
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, TimestampError> {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, ProcessId, Sequence, Snowflake, SnowflakeGenerator, TimestampError, WorkerId,
        millis_since_epoch,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-01-01 00:00);
    }

    #[test]
    fn part_ranges() {
        for legal_id in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::new(illegal_id).is_none());
        }

        assert!(Sequence::new(0xFFF).is_some());
        assert!(Sequence::new(0x1000).is_none());
    }

    #[test]
    fn sequence_wraps() {
        assert_eq!(Sequence::new(100).unwrap().next(), Sequence::new(101).unwrap());
        assert_eq!(Sequence::new(0xFFF).unwrap().next(), Sequence::new(0).unwrap());
    }

    #[test]
    fn epoch_bounds() {
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(MillennialEpoch::EPOCH_TIME),
            Ok(0)
        );
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1)
            ),
            Err(TimestampError::BeforeEpoch)
        );
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x0400_0000_0000)
            ),
            Err(TimestampError::TooLarge)
        );
    }

    #[test]
    fn parts_are_recovered() {
        let time = utc_datetime!(2025-10-24 10:30);
        let millis = millis_since_epoch::<MillennialEpoch>(time).unwrap();
        let worker_id = WorkerId::new(0b10101).unwrap();
        let process_id = ProcessId::new(0b10001).unwrap();
        let sequence = Sequence::new(100).unwrap();

        let snowflake =
            Snowflake::<MillennialEpoch>::from_parts(millis, worker_id, process_id, sequence)
                .unwrap();

        assert_eq!(snowflake.get(), 3_416_751_341_570_822_244);
        assert_eq!(snowflake.created_at(), time);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.sequence(), sequence);
    }

    #[test]
    fn generator_advances_sequence() {
        let worker_id = WorkerId::new(10).unwrap();
        let process_id = ProcessId::new(0).unwrap();
        let time = utc_datetime!(2025-10-24 10:55);

        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(worker_id, process_id);

        let first = generator.generate_at(time).unwrap();
        let second = generator.generate_at(time).unwrap();

        assert_eq!(first.sequence(), Sequence::new(0).unwrap());
        assert_eq!(second.sequence(), Sequence::new(1).unwrap());
        assert_eq!(first.created_at(), second.created_at());
        assert!(first < second);
    }
}
