//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for evaluation times and `last_watered`.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// The Unix epoch; a device last watered "at the epoch" is always due.
#[must_use]
pub fn epoch() -> Timestamp {
    Timestamp::default()
}

/// Convert producer-clock Unix seconds into a [`Timestamp`].
///
/// Returns `None` when the value is outside the representable range.
#[must_use]
pub fn from_unix_secs(secs: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(secs, 0)
}
