//! Error types for the roundkit library.
//!
//! ## Key Components
//!
//! - [`WindowError`]: Recoverable lookup/update failures of
//!   [`MonotonicRingBuffer`](crate::ds::MonotonicRingBuffer). Callers are
//!   expected to log and drop the offending update.
//! - [`InvariantViolation`]: A caller bug, such as combining two bit buffers of
//!   different sizes. The panicking APIs use its `Display` text as the panic
//!   message so tests can match on it.
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (e.g. zero capacity).
//! - [`FormatError`]: Wrong-length input to the wire [`Message`](crate::message::Message).
//!
//! ## Example Usage
//!
//! ```
//! use roundkit::ds::MonotonicRingBuffer;
//! use roundkit::error::WindowError;
//!
//! let ring = MonotonicRingBuffer::new(4, |round: &u64| *round);
//! ring.push(10);
//! ring.push(11);
//!
//! assert_eq!(ring.get_by_key(9), Err(WindowError::TooOld { key: 9, oldest: 10 }));
//! assert_eq!(ring.get_by_key(12), Err(WindowError::TooNew { key: 12, newest: 11 }));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// WindowError
// ---------------------------------------------------------------------------

/// Recoverable failure of a keyed window operation.
///
/// Every variant names the key that caused it. None of them indicate
/// corruption: the window simply cannot serve or accept that key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The key precedes the oldest tracked key; that position was evicted.
    #[error("key {key} is older than the oldest tracked key {oldest}")]
    TooOld { key: u64, oldest: u64 },

    /// The key is beyond the most recent tracked key; not yet known.
    #[error("key {key} is newer than the most recent tracked key {newest}")]
    TooNew { key: u64, newest: u64 },

    /// The conflict-resolution predicate kept the existing value.
    #[error("did not upsert value with key {key}; resolver kept the existing value")]
    RejectedByPolicy { key: u64 },

    /// The key lies inside the window but a trusted `push` skipped over it,
    /// so no slot exists to update.
    #[error("key {key} is inside the window but has no slot; a push skipped it")]
    Untracked { key: u64 },

    /// Nothing has been pushed yet.
    #[error("window is empty")]
    Empty,
}

impl WindowError {
    /// Returns the key the failure refers to, if any.
    pub fn key(&self) -> Option<u64> {
        match *self {
            WindowError::TooOld { key, .. }
            | WindowError::TooNew { key, .. }
            | WindowError::RejectedByPolicy { key }
            | WindowError::Untracked { key } => Some(key),
            WindowError::Empty => None,
        }
    }
}

// ---------------------------------------------------------------------------
// InvariantViolation
// ---------------------------------------------------------------------------

/// A precondition violation that indicates a programming error.
///
/// Returned by the `try_*` variants and used as the panic payload of the
/// panicking variants (e.g. [`BitRangeBuffer::implies`](crate::ds::BitRangeBuffer::implies)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violation: {0}")]
pub struct InvariantViolation(String);

impl InvariantViolation {
    /// Creates a new `InvariantViolation` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when construction parameters are invalid.
///
/// # Example
///
/// ```
/// use roundkit::ds::BitRangeBuffer;
///
/// let err = BitRangeBuffer::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("blocks"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// FormatError
// ---------------------------------------------------------------------------

/// Wrong-length input to a fixed-layout wire record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be exactly {expected} bytes, got {actual}")]
pub struct FormatError {
    pub field: &'static str,
    pub expected: usize,
    pub actual: usize,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
