use crate::error::AggregatorError;
use std::time::Duration;

/// A validated, strictly positive bucket width in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketWidth(i64);

impl BucketWidth {
    pub const TEN_MINUTES: BucketWidth = BucketWidth(10 * 60 * 1_000_000_000);

    pub fn from_nanos(width_nanos: i64) -> Result<Self, AggregatorError> {
        if width_nanos <= 0 {
            return Err(AggregatorError::NonPositiveWidth { width_nanos });
        }
        Ok(Self(width_nanos))
    }

    pub fn from_duration(width: Duration) -> Result<Self, AggregatorError> {
        let nanos = i64::try_from(width.as_nanos()).map_err(|_| AggregatorError::WidthOverflow)?;
        Self::from_nanos(nanos)
    }

    #[inline(always)]
    pub fn as_nanos(self) -> i64 {
        self.0
    }

    /// Maps a timestamp to its bucket key.
    ///
    /// Floors toward negative infinity, so `-1ns` lands in bucket `-1` rather
    /// than sharing bucket `0` with `+1ns`.
    #[inline(always)]
    pub fn key(self, timestamp_nanos: i64) -> i64 {
        timestamp_nanos.div_euclid(self.0)
    }

    /// First timestamp covered by `key`, saturating at the ends of the i64 range.
    #[inline(always)]
    pub fn start(self, key: i64) -> i64 {
        key.saturating_mul(self.0)
    }

    /// Aligns a timestamp to the start of its bucket.
    #[inline(always)]
    pub fn align(self, timestamp_nanos: i64) -> i64 {
        self.start(self.key(timestamp_nanos))
    }
}

impl Default for BucketWidth {
    fn default() -> Self {
        Self::TEN_MINUTES
    }
}

impl TryFrom<Duration> for BucketWidth {
    type Error = AggregatorError;

    fn try_from(width: Duration) -> Result<Self, Self::Error> {
        Self::from_duration(width)
    }
}

#[cfg(test)]
mod bucket_tests {
    use super::*;

    #[test]
    fn test_bucket_alignment() {
        let width = BucketWidth::from_nanos(100_000).unwrap();

        // Both should fall into the 100,000 bucket
        assert_eq!(width.align(150_200), 100_000);
        assert_eq!(width.align(199_999), 100_000);
        assert_eq!(width.key(199_999), 1);

        // Next bucket
        assert_eq!(width.align(200_001), 200_000);
        assert_eq!(width.key(200_000), 2);
    }

    #[test]
    fn test_negative_timestamps_floor() {
        let width = BucketWidth::from_nanos(10).unwrap();
        assert_eq!(width.key(-1), -1);
        assert_eq!(width.key(-10), -1);
        assert_eq!(width.key(-11), -2);
        assert_eq!(width.align(-1), -10);
    }

    #[test]
    fn test_rejects_non_positive_width() {
        assert_eq!(
            BucketWidth::from_nanos(0),
            Err(AggregatorError::NonPositiveWidth { width_nanos: 0 })
        );
        assert_eq!(
            BucketWidth::from_nanos(-5),
            Err(AggregatorError::NonPositiveWidth { width_nanos: -5 })
        );
        assert!(BucketWidth::from_duration(Duration::ZERO).is_err());
        assert_eq!(
            BucketWidth::from_duration(Duration::MAX),
            Err(AggregatorError::WidthOverflow)
        );
    }

    #[test]
    fn test_extreme_keys_do_not_wrap() {
        let width = BucketWidth::from_nanos(7).unwrap();
        assert_eq!(width.align(i64::MIN), i64::MIN);
        assert_eq!(width.key(i64::MAX), i64::MAX / 7);
    }
}
