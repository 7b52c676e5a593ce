//! Wire constants
//!
//! Reserved byte values of the framing discipline. These are fixed properties
//! of the wire format shared with the gateway firmware, not tunables.

/// Marks the start and end of every frame on the wire.
pub const HDLC_FLAG: u8 = 0x7E;
/// Announces that the next wire byte is masked payload data.
pub const HDLC_ESCAPE: u8 = 0x7D;
/// Mask XORed onto escaped payload bytes.
pub const HDLC_ESCAPE_MASK: u8 = 0x20;
