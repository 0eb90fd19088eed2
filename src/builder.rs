//! Single entry point for sizing the round windows.
//!
//! A node usually tracks the same horizon of rounds twice: the values it has
//! seen (a [`MonotonicRingBuffer`]) and which rounds have been checked (a
//! [`BitRangeBuffer`]). `WindowBuilder` takes the horizon once and builds
//! either.
//!
//! ## Example
//!
//! ```rust
//! use roundkit::builder::WindowBuilder;
//!
//! let builder = WindowBuilder::new(100);
//!
//! let rounds = builder.build_ring(|round: &u64| *round);
//! rounds.push(7);
//! assert_eq!(rounds.get(), Some(7));
//!
//! // 100 rounds need two 64-bit blocks
//! let checked = builder.build_bits();
//! assert_eq!(checked.num_blocks(), 2);
//! ```

use crate::ds::bit_buffer::BLOCK_BITS;
use crate::ds::{BitRangeBuffer, MonotonicRingBuffer};
use crate::error::ConfigError;

/// Builder for round windows of a fixed horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBuilder {
    capacity: usize,
}

impl WindowBuilder {
    /// Create a builder for a window of `capacity` rounds.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Number of rounds the built windows track.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of 64-bit blocks needed to hold `capacity` bits.
    pub fn bit_blocks(&self) -> usize {
        self.capacity.div_ceil(BLOCK_BITS as usize)
    }

    /// Build a thread-safe keyed ring.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero.
    pub fn build_ring<T, F>(&self, key_of: F) -> MonotonicRingBuffer<T, F>
    where
        F: Fn(&T) -> u64,
    {
        MonotonicRingBuffer::new(self.capacity, key_of)
    }

    /// Build a thread-safe keyed ring, rejecting a zero capacity.
    pub fn try_build_ring<T, F>(&self, key_of: F) -> Result<MonotonicRingBuffer<T, F>, ConfigError>
    where
        F: Fn(&T) -> u64,
    {
        MonotonicRingBuffer::try_new(self.capacity, key_of)
    }

    /// Build a bit buffer of `ceil(capacity / 64)` zeroed blocks.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero.
    pub fn build_bits(&self) -> BitRangeBuffer {
        BitRangeBuffer::new(self.bit_blocks())
    }

    /// Build a bit buffer, rejecting a zero capacity.
    pub fn try_build_bits(&self) -> Result<BitRangeBuffer, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("window capacity must be > 0"));
        }
        BitRangeBuffer::try_new(self.bit_blocks())
    }
}
