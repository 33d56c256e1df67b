//! UTC datetime stored as signed milliseconds since the Unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Error type for datetime conversions whose input cannot be represented.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("datetime outside the representable signed 64-bit millisecond range")]
    OutOfRange,
}

/// A UTC datetime with millisecond precision.
///
/// Constructors that accept coarser units clamp to the representable
/// extremes instead of wrapping; the fallible `try_from_*` variants report
/// [`DateTimeError::OutOfRange`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    millis: i64,
}

impl DateTime {
    /// The earliest representable datetime.
    pub const MIN: DateTime = DateTime { millis: i64::MIN };
    /// The latest representable datetime.
    pub const MAX: DateTime = DateTime { millis: i64::MAX };

    /// Constructs a datetime from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Constructs a datetime from seconds since the Unix epoch, clamping
    /// at the representable extremes.
    pub fn from_secs(secs: i64) -> Self {
        Self {
            millis: secs.saturating_mul(1000),
        }
    }

    /// Constructs a datetime from seconds since the Unix epoch, failing
    /// when the equivalent millisecond count is unrepresentable.
    pub fn try_from_secs(secs: i64) -> Result<Self, DateTimeError> {
        secs.checked_mul(1000)
            .map(|millis| Self { millis })
            .ok_or(DateTimeError::OutOfRange)
    }

    /// The current wall-clock time, clamped at the extremes.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Converts a [`SystemTime`], clamping at the representable extremes.
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
            Err(err) => i64::try_from(err.duration().as_millis())
                .map(|m| m.checked_neg().unwrap_or(i64::MIN))
                .unwrap_or(i64::MIN),
        };
        Self { millis }
    }

    /// Converts a [`SystemTime`], failing when it is unrepresentable.
    pub fn try_from_system_time(time: SystemTime) -> Result<Self, DateTimeError> {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).map_err(|_| DateTimeError::OutOfRange)?,
            Err(err) => i64::try_from(err.duration().as_millis())
                .ok()
                .and_then(|m| m.checked_neg())
                .ok_or(DateTimeError::OutOfRange)?,
        };
        Ok(Self { millis })
    }

    /// Milliseconds since the Unix epoch.
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Converts to a [`SystemTime`] where the platform can represent it.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        if self.millis >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_millis(self.millis as u64))
        } else {
            let back = self.millis.unsigned_abs();
            UNIX_EPOCH.checked_sub(Duration::from_millis(back))
        }
    }
}

impl From<SystemTime> for DateTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}
