pub mod bit_buffer;
pub mod ring_buffer;

pub use bit_buffer::{BLOCK_BITS, BitRangeBuffer, bit_mask_range};
pub use ring_buffer::{Iter, MonotonicRingBuffer, RoundRing};
