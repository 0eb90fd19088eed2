//! Listener registry keyed by sender and message type.
//!
//! Listeners register for a `(sender, message type)` pair. Either half may be
//! a wildcard: [`SenderId::ZERO`] matches every sender and
//! [`MessageType::ANY`] matches every type. [`Switchboard::speak`] hands an
//! item to every listener whose registration matches it.
//!
//! ## Architecture
//!
//! ```text
//!   RwLock<Registry>
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ listeners: FxHashMap<(SenderId, MessageType), Vec<Record>>   │
//!   │ next_id:   u64                                               │
//!   └──────────────────────────────────────────────────────────────┘
//!
//!   speak(item from S with type T)
//!     read lock ─▶ collect (S, T) (ZERO, T) (S, ANY) (ZERO, ANY)
//!                  dedupe by ListenerId
//!     unlock    ─▶ hear(item, heard_elsewhere = matches > 1) on each
//! ```
//!
//! Listeners run on the speaker's thread after the lock is released, so a
//! listener may register or unregister others while hearing. To hear items
//! on another thread use [`Switchboard::listen_channel`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use roundkit::switchboard::{Item, MessageType, SenderId, Switchboard};
//!
//! #[derive(Clone)]
//! struct Text {
//!     from: SenderId,
//! }
//!
//! impl Item for Text {
//!     fn sender(&self) -> SenderId {
//!         self.from
//!     }
//!     fn message_type(&self) -> MessageType {
//!         MessageType(1)
//!     }
//! }
//!
//! let board = Switchboard::new();
//! let heard = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&heard);
//! board.register(SenderId::ZERO, MessageType::ANY, move |_: &Text, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(board.speak(&Text { from: SenderId::from_uints([0, 0, 0, 3]) }), 1);
//! assert_eq!(heard.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// 256-bit identity of a message sender.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SenderId(pub [u8; 32]);

impl SenderId {
    /// Wildcard sender.
    pub const ZERO: SenderId = SenderId([0; 32]);

    /// Builds an ID from four big-endian words.
    pub fn from_uints(words: [u64; 4]) -> Self {
        let mut bytes = [0u8; 32];
        for (chunk, word) in bytes.chunks_exact_mut(8).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[u8; 32]> for SenderId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SenderId({self})")
    }
}

/// Application message type. `0` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MessageType(pub i32);

impl MessageType {
    pub const ANY: MessageType = MessageType(0);
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that can be routed by the switchboard.
pub trait Item {
    fn sender(&self) -> SenderId;
    fn message_type(&self) -> MessageType;
}

/// Callback for matched items.
///
/// `heard_elsewhere` is true when at least one other listener was handed the
/// same item.
pub trait Listener<I>: Send + Sync {
    fn hear(&self, item: &I, heard_elsewhere: bool);
}

impl<I, F> Listener<I> for F
where
    F: Fn(&I, bool) + Send + Sync,
{
    fn hear(&self, item: &I, heard_elsewhere: bool) {
        self(item, heard_elsewhere)
    }
}

/// Handle returned by [`Switchboard::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ListenerRecord<I> {
    id: ListenerId,
    listener: Arc<dyn Listener<I>>,
}

impl<I> Clone for ListenerRecord<I> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Arc::clone(&self.listener),
        }
    }
}

struct Registry<I> {
    listeners: FxHashMap<(SenderId, MessageType), Vec<ListenerRecord<I>>>,
    next_id: u64,
}

/// Forwards heard items into a channel.
struct ChannelListener<I> {
    tx: Sender<I>,
}

impl<I: Clone + Send> Listener<I> for ChannelListener<I> {
    fn hear(&self, item: &I, _heard_elsewhere: bool) {
        if self.tx.send(item.clone()).is_err() {
            log::debug!("channel listener dropped an item: receiver disconnected");
        }
    }
}

/// Thread-safe listener registry.
pub struct Switchboard<I> {
    registry: RwLock<Registry<I>>,
}

impl<I: Item> Switchboard<I> {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry {
                listeners: FxHashMap::default(),
                next_id: 0,
            }),
        }
    }

    /// Registers `listener` for items from `sender` of `message_type`.
    ///
    /// Pass [`SenderId::ZERO`] or [`MessageType::ANY`] to match everything on
    /// that axis.
    pub fn register<L>(&self, sender: SenderId, message_type: MessageType, listener: L) -> ListenerId
    where
        L: Listener<I> + 'static,
    {
        self.register_arc(sender, message_type, Arc::new(listener))
    }

    /// Registers a shared listener.
    pub fn register_arc(
        &self,
        sender: SenderId,
        message_type: MessageType,
        listener: Arc<dyn Listener<I>>,
    ) -> ListenerId {
        let mut registry = self.registry.write();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry
            .listeners
            .entry((sender, message_type))
            .or_default()
            .push(ListenerRecord { id, listener });
        id
    }

    /// Removes a listener. Returns `false` if `id` was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.write();
        let mut emptied = None;
        let mut found = false;
        for (key, records) in registry.listeners.iter_mut() {
            if let Some(pos) = records.iter().position(|record| record.id == id) {
                records.remove(pos);
                if records.is_empty() {
                    emptied = Some(*key);
                }
                found = true;
                break;
            }
        }
        if let Some(key) = emptied {
            registry.listeners.remove(&key);
        }
        found
    }

    /// Hands `item` to every matching listener, each exactly once.
    ///
    /// Returns the number of listeners notified.
    pub fn speak(&self, item: &I) -> usize {
        let sender = item.sender();
        let message_type = item.message_type();
        let matches = self.match_listeners(sender, message_type);

        if matches.is_empty() {
            log::warn!(
                "message of type {} from sender {} matched no listeners",
                message_type,
                sender
            );
            return 0;
        }

        let heard_elsewhere = matches.len() > 1;
        for record in &matches {
            log::debug!("hearing on listener {}", record.id);
            record.listener.hear(item, heard_elsewhere);
        }
        matches.len()
    }

    /// Registers a listener that forwards clones of matching items into a
    /// bounded channel of `capacity` slots.
    ///
    /// [`speak`](Switchboard::speak) blocks while the channel is full. Once
    /// the receiver is dropped, forwarded items are discarded; unregister the
    /// returned ID to stop matching.
    pub fn listen_channel(
        &self,
        sender: SenderId,
        message_type: MessageType,
        capacity: usize,
    ) -> (ListenerId, Receiver<I>)
    where
        I: Clone + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let id = self.register(sender, message_type, ChannelListener { tx });
        (id, rx)
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.registry.read().listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn match_listeners(&self, sender: SenderId, message_type: MessageType) -> Vec<ListenerRecord<I>> {
        let registry = self.registry.read();
        let keys = [
            (sender, message_type),
            (SenderId::ZERO, message_type),
            (sender, MessageType::ANY),
            (SenderId::ZERO, MessageType::ANY),
        ];

        let mut matches: Vec<ListenerRecord<I>> = Vec::new();
        for key in keys {
            let Some(records) = registry.listeners.get(&key) else {
                continue;
            };
            for record in records {
                if !matches.iter().any(|m| m.id == record.id) {
                    matches.push(record.clone());
                }
            }
        }
        matches
    }
}

impl<I: Item> Default for Switchboard<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> fmt::Debug for Switchboard<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("Switchboard")
            .field("registrations", &registry.listeners.len())
            .field("next_id", &registry.next_id)
            .finish()
    }
}
