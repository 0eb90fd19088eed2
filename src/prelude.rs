pub use crate::builder::WindowBuilder;
pub use crate::ds::{BitRangeBuffer, MonotonicRingBuffer, RoundRing};
pub use crate::error::{ConfigError, FormatError, InvariantViolation, WindowError};
pub use crate::message::Message;
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::RingMetricsSnapshot;
pub use crate::switchboard::{Item, Listener, ListenerId, MessageType, SenderId, Switchboard};
