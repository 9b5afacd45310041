//! Input Validation
//!
//! Pure checks shared by every backend. They run before any table access, so
//! a rejected call never leaves a trace in the store.

use crate::error::{Result, StoreError};
use std::time::Duration;

/// Maximum key length, counted in UTF-16 code units.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Largest accepted TTL (~100 years). Keeps instant arithmetic from overflowing.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Checks that a key is non-empty, at most [`MAX_KEY_LENGTH`] units long and
/// free of null characters.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('\0') {
        return Err(StoreError::InvalidKey);
    }

    // UTF-16 length never exceeds UTF-8 length, so short keys skip the count.
    if key.len() > MAX_KEY_LENGTH && key.encode_utf16().count() > MAX_KEY_LENGTH {
        return Err(StoreError::InvalidKey);
    }

    Ok(())
}

/// Checks a TTL given in seconds and converts it to a [`Duration`].
pub fn validate_ttl(ttl_secs: u64) -> Result<Duration> {
    if ttl_secs == 0 || ttl_secs > MAX_TTL_SECS {
        return Err(StoreError::InvalidTtl(ttl_secs));
    }
    Ok(Duration::from_secs(ttl_secs))
}

/// Validates an optional TTL. `None` means "never expires" and is always valid.
pub fn validate_optional_ttl(ttl_secs: Option<u64>) -> Result<Option<Duration>> {
    ttl_secs.map(validate_ttl).transpose()
}

/// Checks a counter amount.
///
/// Zero and negative amounts are fine. `i64::MIN` is rejected because it has
/// no positive counterpart, so the same amount could not be decremented.
pub fn validate_amount(amount: i64) -> Result<i64> {
    if amount == i64::MIN {
        return Err(StoreError::InvalidAmount(amount));
    }
    Ok(amount)
}
