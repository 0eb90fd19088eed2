//! Bit-packed circular buffer addressed by absolute round number.
//!
//! Tracks one boolean per round in a fixed number of 64-bit blocks. Round
//! numbers grow without bound; the buffer maps every absolute position onto
//! its physical bit modulo the total capacity, so positions that differ by a
//! multiple of `N × 64` share a bit.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                      BitRangeBuffer (N = 3 blocks)                          │
//! │                                                                             │
//! │   blocks: Vec<u64>        bit order is MSB-first inside each block          │
//! │                                                                             │
//! │   block:      0                  1                  2                       │
//! │            ┌──────────────────┬──────────────────┬──────────────────┐       │
//! │   offset:  │ 0 1 2 ...     63 │ 0 1 2 ...     63 │ 0 1 2 ...     63 │       │
//! │            └──────────────────┴──────────────────┴──────────────────┘       │
//! │   pos:       0 ...        63   64 ...       127   128 ...      191          │
//! │              192 ...      255  256 ...      319   320 ...      383          │
//! │                                                                             │
//! │   convert_loc(pos) = ((pos / 64) mod N, pos mod 64)                         │
//! │   bit(offset)      = block >> (63 - offset) & 1                             │
//! │                                                                             │
//! │   Range ops (clear_range / set_range / copy)                                │
//! │   ──────────────────────────────────────────                                │
//! │                                                                             │
//! │   clear_range(150, 20) on N = 3 (capacity 192, end < start → wraps):        │
//! │                                                                             │
//! │     block 2: bit_mask_range(22, 64)  clears offsets 22..=63                 │
//! │     block 0: bit_mask_range(0, 21)   clears offsets 0..=20                  │
//! │                                                                             │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Range Encoding
//!
//! The public range operations take an **inclusive** `[start, end]` pair.
//! Internally a range is canonicalized to a starting position inside the
//! buffer plus a length, then handed to the mask helpers in half-open form
//! `[start, end + 1)`: [`delta`](BitRangeBuffer::delta) counts the spanned
//! blocks, [`convert_end`](BitRangeBuffer::convert_end) locates the exclusive
//! boundary inside the last block and [`bit_mask_range`] builds each block's
//! AND-mask.
//!
//! Canonicalization rules:
//!
//! - `end >= start`: the range is `end - start + 1` bits long. Anything at
//!   least `N × 64` bits long covers the whole buffer.
//! - `end < start`: both ends are reduced modulo the capacity. If the reduced
//!   end still precedes the reduced start, the range runs from `start` through
//!   the logical end of the buffer and continues from bit 0 to `end`.
//!
//! ## Operations
//!
//! | Operation              | Description                              | Complexity |
//! |------------------------|------------------------------------------|------------|
//! | [`get`] / [`set`] / [`clear`] | Single bit                        | O(1)       |
//! | [`clear_range`]        | Clear inclusive range, wraps             | O(blocks)  |
//! | [`set_range`]          | Set inclusive range, wraps               | O(blocks)  |
//! | [`copy`]               | Extract range into a padded buffer       | O(blocks)  |
//! | [`implies`]            | Material implication `mask ⇒ self`       | O(N)       |
//! | [`extend`]             | Grow to more blocks, zero-filled         | O(N)       |
//!
//! [`get`]: BitRangeBuffer::get
//! [`set`]: BitRangeBuffer::set
//! [`clear`]: BitRangeBuffer::clear
//! [`clear_range`]: BitRangeBuffer::clear_range
//! [`set_range`]: BitRangeBuffer::set_range
//! [`copy`]: BitRangeBuffer::copy
//! [`implies`]: BitRangeBuffer::implies
//! [`extend`]: BitRangeBuffer::extend
//!
//! ## Example Usage
//!
//! ```
//! use roundkit::ds::BitRangeBuffer;
//!
//! // 2 blocks = 128 rounds of history
//! let mut checked = BitRangeBuffer::new(2);
//! checked.set_range(100, 130); // wraps: 100..=127 and 0..=2
//! assert!(checked.get(127));
//! assert!(checked.get(128 + 2)); // same physical bit as round 2
//! assert!(!checked.get(3));
//!
//! // Forget a stale window
//! checked.clear_range(120, 129);
//! assert!(!checked.get(125));
//! assert!(checked.get(119));
//! ```
//!
//! ## Thread Safety
//!
//! `BitRangeBuffer` is not thread-safe. It is meant to be embedded in a
//! structure that already serializes access for its own invariants.

use std::fmt;

use crate::error::{ConfigError, InvariantViolation};

/// Number of bits in one storage block.
pub const BLOCK_BITS: u64 = 64;

/// Circular buffer of bits packed into 64-bit blocks, MSB-first.
///
/// # Example
///
/// ```
/// use roundkit::ds::BitRangeBuffer;
///
/// let mut buf = BitRangeBuffer::new(5);
/// buf.set(64);
/// assert!(buf.get(64));
/// assert!(buf.get(64 + 320)); // positions wrap every N × 64 bits
/// assert_eq!(buf.blocks()[1], 0x8000_0000_0000_0000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitRangeBuffer {
    blocks: Vec<u64>,
}

impl BitRangeBuffer {
    /// Creates a zero-filled buffer of `num_blocks` blocks.
    ///
    /// # Panics
    ///
    /// Panics if `num_blocks` is 0. Use [`try_new`](Self::try_new) for
    /// user-supplied sizes.
    pub fn new(num_blocks: usize) -> Self {
        assert!(num_blocks > 0, "BitRangeBuffer requires at least one block");
        Self {
            blocks: vec![0; num_blocks],
        }
    }

    /// Creates a zero-filled buffer, rejecting a block count of 0.
    pub fn try_new(num_blocks: usize) -> Result<Self, ConfigError> {
        if num_blocks == 0 {
            return Err(ConfigError::new(
                "BitRangeBuffer requires at least one block",
            ));
        }
        Ok(Self::new(num_blocks))
    }

    /// Wraps existing block contents.
    ///
    /// # Panics
    ///
    /// Panics if `blocks` is empty.
    pub fn from_blocks(blocks: Vec<u64>) -> Self {
        assert!(!blocks.is_empty(), "BitRangeBuffer requires at least one block");
        Self { blocks }
    }

    /// Returns the number of 64-bit blocks.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of addressable bits (`N × 64`).
    pub fn capacity_bits(&self) -> u64 {
        self.blocks.len() as u64 * BLOCK_BITS
    }

    /// Returns the raw blocks.
    pub fn blocks(&self) -> &[u64] {
        &self.blocks
    }

    /// Consumes the buffer, returning the raw blocks.
    pub fn into_blocks(self) -> Vec<u64> {
        self.blocks
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u64 {
        self.blocks.iter().map(|block| u64::from(block.count_ones())).sum()
    }

    /// Returns the bit at `pos`.
    pub fn get(&self, pos: u64) -> bool {
        let (block, offset) = self.convert_loc(pos);
        (self.blocks[block] >> (63 - offset)) & 1 == 1
    }

    /// Sets the bit at `pos` to 1.
    pub fn set(&mut self, pos: u64) {
        let (block, offset) = self.convert_loc(pos);
        self.blocks[block] |= 1 << (63 - offset);
    }

    /// Sets the bit at `pos` to 0.
    pub fn clear(&mut self, pos: u64) {
        let (block, offset) = self.convert_loc(pos);
        self.blocks[block] &= !(1 << (63 - offset));
    }

    /// Clears every bit in the inclusive range `[start, end]`.
    ///
    /// If `end` precedes `start` (after reduction modulo the capacity) the
    /// range wraps: it runs from `start` to the logical end of the buffer and
    /// continues from bit 0 through `end`.
    ///
    /// # Example
    ///
    /// ```
    /// use roundkit::ds::BitRangeBuffer;
    ///
    /// let mut buf = BitRangeBuffer::from_blocks(vec![u64::MAX; 5]);
    /// buf.clear_range(310, 5);
    /// assert!(!buf.get(310) && !buf.get(319) && !buf.get(0) && !buf.get(5));
    /// assert!(buf.get(6) && buf.get(309));
    /// ```
    pub fn clear_range(&mut self, start: u64, end: u64) {
        let (first, len) = self.canonical_span(start, end);
        self.apply_masks(first, first + len, |block, mask| *block &= mask);
    }

    /// Sets every bit in the inclusive range `[start, end]`.
    ///
    /// Uses the same wraparound rule as [`clear_range`](Self::clear_range).
    pub fn set_range(&mut self, start: u64, end: u64) {
        let (first, len) = self.canonical_span(start, end);
        self.apply_masks(first, first + len, |block, mask| *block |= !mask);
    }

    /// Copies the inclusive range `[start, end]` into a new buffer holding
    /// exactly the spanned blocks.
    ///
    /// Bit `start` lands at offset `start mod 64` of block 0 of the copy.
    /// Bits before `start` in the first block are set to 1 and bits after
    /// `end` in the last block are cleared, so the padding is neutral when the
    /// copy is later combined with [`implies`](Self::implies) or an AND.
    ///
    /// # Example
    ///
    /// ```
    /// use roundkit::ds::BitRangeBuffer;
    ///
    /// let buf = BitRangeBuffer::new(4);
    /// let copied = buf.copy(70, 140);
    /// assert_eq!(copied.num_blocks(), 2);
    /// assert_eq!(copied.blocks()[0], 0xFC00_0000_0000_0000); // 6 padding bits
    /// ```
    pub fn copy(&self, start: u64, end: u64) -> BitRangeBuffer {
        let (first, len) = self.canonical_span(start, end);
        let end_exclusive = first + len;
        let num_blocks = self.delta(first, end_exclusive);
        let (first_block, start_bit) = self.convert_loc(first);

        let mut copied: Vec<u64> = (0..num_blocks)
            .map(|i| self.blocks[self.block_index(first_block + i)])
            .collect();

        copied[0] |= !bit_mask_range(0, start_bit);

        let (_, end_bit) = self.convert_end(end_exclusive);
        copied[num_blocks - 1] &= !bit_mask_range(0, end_bit);

        BitRangeBuffer { blocks: copied }
    }

    /// Returns the material implication `mask ⇒ self`, block by block:
    /// `result[i] = !mask[i] | self[i]`.
    ///
    /// # Panics
    ///
    /// Panics with an [`InvariantViolation`] message if the two buffers have
    /// different block counts.
    ///
    /// # Example
    ///
    /// ```
    /// use roundkit::ds::BitRangeBuffer;
    ///
    /// let valid = BitRangeBuffer::from_blocks(vec![0b1010]);
    /// let mask = BitRangeBuffer::from_blocks(vec![!0b0011]);
    /// assert_eq!(valid.implies(&mask).blocks(), &[0b1011]);
    /// ```
    pub fn implies(&self, mask: &BitRangeBuffer) -> BitRangeBuffer {
        match self.try_implies(mask) {
            Ok(result) => result,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`implies`](Self::implies).
    pub fn try_implies(&self, mask: &BitRangeBuffer) -> Result<BitRangeBuffer, InvariantViolation> {
        if self.blocks.len() != mask.blocks.len() {
            return Err(InvariantViolation::new(format!(
                "cannot imply two buffers of different lengths ({} and {})",
                self.blocks.len(),
                mask.blocks.len()
            )));
        }
        let blocks = self
            .blocks
            .iter()
            .zip(&mask.blocks)
            .map(|(&bits, &invalid)| !invalid | bits)
            .collect();
        Ok(BitRangeBuffer { blocks })
    }

    /// Returns a buffer of `num_blocks` blocks with this buffer's contents in
    /// the low-index blocks and zeros after them.
    ///
    /// # Panics
    ///
    /// Panics with an [`InvariantViolation`] message if `num_blocks` is smaller
    /// than the current block count.
    pub fn extend(&self, num_blocks: usize) -> BitRangeBuffer {
        match self.try_extend(num_blocks) {
            Ok(result) => result,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`extend`](Self::extend).
    pub fn try_extend(&self, num_blocks: usize) -> Result<BitRangeBuffer, InvariantViolation> {
        if num_blocks < self.blocks.len() {
            return Err(InvariantViolation::new(format!(
                "cannot extend a buffer of {} blocks to {} blocks",
                self.blocks.len(),
                num_blocks
            )));
        }
        let mut blocks = Vec::with_capacity(num_blocks);
        blocks.extend_from_slice(&self.blocks);
        blocks.resize(num_blocks, 0);
        Ok(BitRangeBuffer { blocks })
    }

    /// Maps an absolute position to `(block index, bit offset)`.
    ///
    /// Only the block component wraps; the offset is always `pos mod 64`.
    pub fn convert_loc(&self, pos: u64) -> (usize, u32) {
        let block = (pos / BLOCK_BITS) % self.blocks.len() as u64;
        (block as usize, (pos % BLOCK_BITS) as u32)
    }

    /// Maps an exclusive range end to `(block, offset)` with the offset in
    /// `1..=64`, so the boundary can feed [`bit_mask_range`] directly.
    ///
    /// The block index is not wrapped. `convert_end(0)` is `(0, 0)`.
    pub fn convert_end(&self, pos: u64) -> (usize, u32) {
        match pos.checked_sub(1) {
            Some(last) => ((last / BLOCK_BITS) as usize, (last % BLOCK_BITS) as u32 + 1),
            None => (0, 0),
        }
    }

    /// Counts the blocks touched by the half-open range `[start, end)`.
    ///
    /// A range whose start and end coincide counts as one block. If `end - 1`
    /// precedes `start` the range wraps through the end of the buffer.
    pub fn delta(&self, start: u64, end: u64) -> usize {
        if start == end {
            return 1;
        }
        let n = self.blocks.len() as u64;
        let start_block = start / BLOCK_BITS;
        let count = match end.checked_sub(1) {
            Some(last) if last >= start => last / BLOCK_BITS - start_block + 1,
            Some(last) => (n + last / BLOCK_BITS + 1).saturating_sub(start_block),
            None => (n + 1).saturating_sub(start_block),
        };
        count as usize
    }

    #[inline]
    fn block_index(&self, block: usize) -> usize {
        block % self.blocks.len()
    }

    /// Reduces an inclusive range to `(first, len)` with `first < capacity`
    /// and `1 <= len <= capacity`.
    fn canonical_span(&self, start: u64, end: u64) -> (u64, u64) {
        let cap = self.capacity_bits();
        let len = if end >= start {
            (end - start).saturating_add(1).min(cap)
        } else {
            let (s, e) = (start % cap, end % cap);
            if e >= s { e - s + 1 } else { cap - s + e + 1 }
        };
        (start % cap, len)
    }

    /// Visits every block spanned by `[first, end)` with the mask that has 0s
    /// over the part of the range inside that block.
    fn apply_masks(&mut self, first: u64, end: u64, mut op: impl FnMut(&mut u64, u64)) {
        let num_blocks = self.delta(first, end);
        let (first_block, mut first_bit) = self.convert_loc(first);
        let (_, end_bit) = self.convert_end(end);

        for i in 0..num_blocks {
            let idx = self.block_index(first_block + i);
            let last_bit = if i == num_blocks - 1 { end_bit } else { 64 };
            op(&mut self.blocks[idx], bit_mask_range(first_bit, last_bit));
            first_bit = 0;
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(!self.blocks.is_empty());
    }
}

/// Builds a mask with 0s over the half-open offset range `[start, end)` and 1s
/// elsewhere. If `end < start` the selection is inverted: only `[end, start)`
/// is set.
///
/// Offsets of 64 or more shift every bit out of the corresponding half.
///
/// # Example
///
/// ```
/// use roundkit::ds::bit_mask_range;
///
/// assert_eq!(bit_mask_range(5, 25), 0xF800_007F_FFFF_FFFF);
/// assert_eq!(bit_mask_range(62, 32), 0x0000_0000_FFFF_FFFC);
/// ```
pub fn bit_mask_range(start: u32, end: u32) -> u64 {
    let s = 64u32
        .checked_sub(start)
        .and_then(|shift| u64::MAX.checked_shl(shift))
        .unwrap_or(0);
    let e = u64::MAX.checked_shr(end).unwrap_or(0);
    let invert = if end < start { u64::MAX } else { 0 };
    (s | e) & (invert ^ (s ^ e))
}

/// Renders each block as 64 binary digits, blocks separated by spaces.
impl fmt::Display for BitRangeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{block:064b}")?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: set/clear affect exactly one bit
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_set_clear_locality(
            blocks in prop::collection::vec(any::<u64>(), 1..8),
            pos in any::<u32>(),
        ) {
            let pos = u64::from(pos);
            let original = BitRangeBuffer::from_blocks(blocks);
            let cap = original.capacity_bits();

            let mut buf = original.clone();
            buf.set(pos);
            prop_assert!(buf.get(pos));
            for other in (0..cap).filter(|&p| p != pos % cap) {
                prop_assert_eq!(buf.get(other), original.get(other));
            }

            buf.clear(pos);
            prop_assert!(!buf.get(pos));
            for other in (0..cap).filter(|&p| p != pos % cap) {
                prop_assert_eq!(buf.get(other), original.get(other));
            }
        }

        /// Property: clear_range clears exactly the covered bits
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_clear_range_matches_bitwise_model(
            num_blocks in 1usize..6,
            start in 0u64..1000,
            end in 0u64..1000,
        ) {
            let mut buf = BitRangeBuffer::from_blocks(vec![u64::MAX; num_blocks]);
            let cap = buf.capacity_bits();
            buf.clear_range(start, end);

            let (first, len) = buf.canonical_span(start, end);
            let covered: Vec<u64> = (first..first + len).map(|p| p % cap).collect();
            for p in 0..cap {
                prop_assert_eq!(buf.get(p), !covered.contains(&p), "bit {}", p);
            }
        }

        /// Property: copy matches the source inside the range and pads outside
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_copy_round_trip(
            blocks in prop::collection::vec(any::<u64>(), 1..10),
            start_seed in any::<u64>(),
            len_seed in any::<u64>(),
        ) {
            let buf = BitRangeBuffer::from_blocks(blocks);
            let cap = buf.capacity_bits();
            let start = start_seed % cap;
            let len = len_seed % cap + 1;
            let end = start + len - 1;

            let copied = buf.copy(start, end);
            let start_bit = start % 64;

            for j in 0..start_bit {
                prop_assert!(copied.get(j), "padding bit {} before start", j);
            }
            for j in 0..len {
                prop_assert_eq!(copied.get(start_bit + j), buf.get(start + j));
            }
            for j in (start_bit + len)..copied.capacity_bits() {
                prop_assert!(!copied.get(j), "padding bit {} after end", j);
            }
        }
    }
}
