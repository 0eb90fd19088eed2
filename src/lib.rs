//! roundkit: monotonic round-window buffers for mix-network round tracking.
//!
//! - [`ds::MonotonicRingBuffer`] keeps the last `capacity` values of a stream
//!   keyed by round number and tolerates out-of-order arrival.
//! - [`ds::BitRangeBuffer`] is a circular bitset packed into 64-bit blocks with
//!   range operations that wrap around the logical end.
//!
//! The [`message`] and [`switchboard`] modules cover the wire record and the
//! listener registry that sit next to the buffers in a round-processing node.

pub mod builder;
pub mod ds;
pub mod error;
pub mod message;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod switchboard;
