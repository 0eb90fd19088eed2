//! Fixed 512-byte wire record.
//!
//! The whole message is one serialized buffer; every field is a fixed byte
//! range of it, so reading or writing a field never reallocates and the
//! buffer is always ready to send.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                              master (512 B)                              │
//! ├────────────────────────────────────┬─────────────────────────────────────┤
//! │           payload A (256 B)        │          payload B (256 B)          │
//! ├───────────────────────────────┬────┴─────────────────────────────┬───────┤
//! │        contents (399 B)       │      associated data (112 B)     │ group │
//! │                               ├─────────┬───────┬───────┬────────┤ (1 B) │
//! │      padding  |  data         │recipient│ keyFP │ time  │  MAC   │       │
//! │                               │  32 B   │ 32 B  │ 16 B  │  32 B  │       │
//! └───────────────────────────────┴─────────┴───────┴───────┴────────┴───────┘
//!   0                            399       431     463     479      511   512
//! ```
//!
//! The trailing group byte stays zero so payload B, read as a big-endian
//! integer, is always smaller than the group modulus.

use std::ops::Range;

use crate::error::FormatError;

/// Total serialized length.
pub const TOTAL_LEN: usize = 512;
/// Length of each half of the message.
pub const PAYLOAD_LEN: usize = 256;

const PAYLOAD_A: Range<usize> = 0..PAYLOAD_LEN;
const PAYLOAD_B: Range<usize> = PAYLOAD_LEN..TOTAL_LEN;

const CONTENTS: Range<usize> = 0..399;
const ASSOCIATED_DATA: Range<usize> = 399..511;
const RECIPIENT_ID: Range<usize> = 399..431;
const KEY_FINGERPRINT: Range<usize> = 431..463;
const TIMESTAMP: Range<usize> = 463..479;
const MAC: Range<usize> = 479..511;
const GROUP_BYTE: usize = 511;

pub const CONTENTS_LEN: usize = CONTENTS.end - CONTENTS.start;
pub const ASSOCIATED_DATA_LEN: usize = ASSOCIATED_DATA.end - ASSOCIATED_DATA.start;
pub const RECIPIENT_ID_LEN: usize = 32;
pub const KEY_FINGERPRINT_LEN: usize = 32;
pub const TIMESTAMP_LEN: usize = 16;
pub const MAC_LEN: usize = 32;

/// A serialized message with fixed-offset fields.
///
/// # Example
///
/// ```
/// use roundkit::message::{Message, PAYLOAD_LEN};
///
/// let mut msg = Message::new();
/// msg.set_recipient_id(&[7u8; 32]).unwrap();
/// assert_eq!(msg.recipient_id(), &[7u8; 32]);
///
/// // Recipient ID lives in the second half of the record
/// assert_eq!(msg.payload_b()[399 - PAYLOAD_LEN], 7);
/// assert!(msg.set_payload_a(&[1, 2, 3]).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Message {
    master: [u8; TOTAL_LEN],
}

impl Message {
    /// Creates an all-zero message.
    pub fn new() -> Self {
        Self {
            master: [0; TOTAL_LEN],
        }
    }

    /// Parses a full serialized message.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let master = <[u8; TOTAL_LEN]>::try_from(bytes).map_err(|_| FormatError {
            field: "message",
            expected: TOTAL_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self { master })
    }

    /// Returns the entire serialized message.
    pub fn master(&self) -> &[u8; TOTAL_LEN] {
        &self.master
    }

    pub fn payload_a(&self) -> &[u8] {
        &self.master[PAYLOAD_A]
    }

    pub fn set_payload_a(&mut self, payload: &[u8]) -> Result<(), FormatError> {
        self.write(PAYLOAD_A, "payload A", payload)
    }

    pub fn payload_b(&self) -> &[u8] {
        &self.master[PAYLOAD_B]
    }

    pub fn set_payload_b(&mut self, payload: &[u8]) -> Result<(), FormatError> {
        self.write(PAYLOAD_B, "payload B", payload)
    }

    /// Returns a copy of payload B with its first byte moved to the end and
    /// the first byte zeroed, so the value is in the group.
    pub fn payload_b_for_encryption(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(self.payload_b());
        payload[PAYLOAD_LEN - 1] = payload[0];
        payload[0] = 0;
        payload
    }

    /// Stores a decrypted payload B, undoing [`payload_b_for_encryption`]:
    /// the last byte moves back to the front and the last byte is zeroed.
    ///
    /// [`payload_b_for_encryption`]: Message::payload_b_for_encryption
    pub fn set_decrypted_payload_b(&mut self, payload: &[u8]) -> Result<(), FormatError> {
        self.set_payload_b(payload)?;
        self.master[PAYLOAD_B.start] = self.master[PAYLOAD_B.end - 1];
        self.master[PAYLOAD_B.end - 1] = 0;
        Ok(())
    }

    /// Padding followed by data.
    pub fn contents(&self) -> &[u8] {
        &self.master[CONTENTS]
    }

    pub fn set_contents(&mut self, contents: &[u8]) -> Result<(), FormatError> {
        self.write(CONTENTS, "contents", contents)
    }

    /// Recipient ID, key fingerprint, timestamp and MAC.
    pub fn associated_data(&self) -> &[u8] {
        &self.master[ASSOCIATED_DATA]
    }

    pub fn set_associated_data(&mut self, data: &[u8]) -> Result<(), FormatError> {
        self.write(ASSOCIATED_DATA, "associated data", data)
    }

    pub fn recipient_id(&self) -> &[u8] {
        &self.master[RECIPIENT_ID]
    }

    pub fn set_recipient_id(&mut self, id: &[u8]) -> Result<(), FormatError> {
        self.write(RECIPIENT_ID, "recipient ID", id)
    }

    pub fn key_fingerprint(&self) -> &[u8] {
        &self.master[KEY_FINGERPRINT]
    }

    pub fn set_key_fingerprint(&mut self, fingerprint: &[u8]) -> Result<(), FormatError> {
        self.write(KEY_FINGERPRINT, "key fingerprint", fingerprint)
    }

    pub fn timestamp(&self) -> &[u8] {
        &self.master[TIMESTAMP]
    }

    pub fn set_timestamp(&mut self, timestamp: &[u8]) -> Result<(), FormatError> {
        self.write(TIMESTAMP, "timestamp", timestamp)
    }

    pub fn mac(&self) -> &[u8] {
        &self.master[MAC]
    }

    pub fn set_mac(&mut self, mac: &[u8]) -> Result<(), FormatError> {
        self.write(MAC, "MAC", mac)
    }

    /// The trailing byte that keeps payload B in the group. Zero unless a
    /// caller wrote the raw payload directly.
    pub fn group_byte(&self) -> u8 {
        self.master[GROUP_BYTE]
    }

    fn write(
        &mut self,
        range: Range<usize>,
        field: &'static str,
        bytes: &[u8],
    ) -> Result<(), FormatError> {
        let expected = range.end - range.start;
        if bytes.len() != expected {
            return Err(FormatError {
                field,
                expected,
                actual: bytes.len(),
            });
        }
        self.master[range].copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("recipient_id", &self.recipient_id())
            .field("key_fingerprint", &self.key_fingerprint())
            .field("timestamp", &self.timestamp())
            .field("group_byte", &self.group_byte())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    #[test]
    fn layout_lengths() {
        assert_eq!(CONTENTS_LEN, 399);
        assert_eq!(ASSOCIATED_DATA_LEN, 112);
        assert_eq!(
            RECIPIENT_ID_LEN + KEY_FINGERPRINT_LEN + TIMESTAMP_LEN + MAC_LEN,
            ASSOCIATED_DATA_LEN
        );
        assert_eq!(CONTENTS_LEN + ASSOCIATED_DATA_LEN + 1, TOTAL_LEN);
    }

    #[test]
    fn new_message_is_zero() {
        let msg = Message::new();
        assert!(msg.master().iter().all(|&b| b == 0));
        assert_eq!(msg.group_byte(), 0);
    }

    #[test]
    fn payloads_split_master_in_half() {
        let mut msg = Message::new();
        msg.set_payload_a(&[0xAA; PAYLOAD_LEN]).unwrap();
        msg.set_payload_b(&[0xBB; PAYLOAD_LEN]).unwrap();

        assert_eq!(&msg.master()[..PAYLOAD_LEN], &[0xAA; PAYLOAD_LEN][..]);
        assert_eq!(&msg.master()[PAYLOAD_LEN..], &[0xBB; PAYLOAD_LEN][..]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut msg = Message::new();
        let err = msg.set_payload_b(&[1; 255]).unwrap_err();
        assert_eq!(err.field, "payload B");
        assert_eq!(err.expected, PAYLOAD_LEN);
        assert_eq!(err.actual, 255);
        assert!(msg.set_mac(&[0; 33]).is_err());
        assert!(Message::from_bytes(&[0; 511]).is_err());
        // Failed writes leave the record untouched
        assert_eq!(msg, Message::new());
    }

    #[test]
    fn associated_fields_are_disjoint() {
        let mut msg = Message::new();
        msg.set_recipient_id(&[1; RECIPIENT_ID_LEN]).unwrap();
        msg.set_key_fingerprint(&[2; KEY_FINGERPRINT_LEN]).unwrap();
        msg.set_timestamp(&[3; TIMESTAMP_LEN]).unwrap();
        msg.set_mac(&[4; MAC_LEN]).unwrap();

        let ad = msg.associated_data();
        assert!(ad[..32].iter().all(|&b| b == 1));
        assert!(ad[32..64].iter().all(|&b| b == 2));
        assert!(ad[64..80].iter().all(|&b| b == 3));
        assert!(ad[80..].iter().all(|&b| b == 4));
        assert!(msg.contents().iter().all(|&b| b == 0));
        assert_eq!(msg.group_byte(), 0);
    }

    #[test]
    fn contents_overlap_payload_b() {
        let mut msg = Message::new();
        let contents = ramp(CONTENTS_LEN);
        msg.set_contents(&contents).unwrap();
        assert_eq!(msg.payload_a(), &contents[..PAYLOAD_LEN]);
        assert_eq!(&msg.payload_b()[..CONTENTS_LEN - PAYLOAD_LEN], &contents[PAYLOAD_LEN..]);
    }

    #[test]
    fn payload_b_for_encryption_moves_first_byte() {
        let mut msg = Message::new();
        let mut payload = ramp(PAYLOAD_LEN);
        payload[0] = 0x9C;
        payload[PAYLOAD_LEN - 1] = 0;
        msg.set_payload_b(&payload).unwrap();

        let encrypted = msg.payload_b_for_encryption();
        assert_eq!(encrypted[0], 0);
        assert_eq!(encrypted[PAYLOAD_LEN - 1], 0x9C);
        assert_eq!(&encrypted[1..PAYLOAD_LEN - 1], &payload[1..PAYLOAD_LEN - 1]);
        // The stored payload is not modified
        assert_eq!(msg.payload_b(), &payload[..]);
    }

    #[test]
    fn decrypted_payload_b_restores_original() {
        let mut msg = Message::new();
        let mut payload = ramp(PAYLOAD_LEN);
        payload[PAYLOAD_LEN - 1] = 0;
        msg.set_payload_b(&payload).unwrap();

        let encrypted = msg.payload_b_for_encryption();
        let mut received = Message::new();
        received.set_decrypted_payload_b(&encrypted).unwrap();

        assert_eq!(received.payload_b(), msg.payload_b());
        assert_eq!(received.group_byte(), 0);
    }

    #[test]
    fn from_bytes_round_trips_master() {
        let bytes = ramp(TOTAL_LEN);
        let msg = Message::from_bytes(&bytes).unwrap();
        assert_eq!(&msg.master()[..], &bytes[..]);
        assert_eq!(msg.group_byte(), 255);
    }
}
