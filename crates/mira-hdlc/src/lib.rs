//! Mira Gateway Serial Framing
//!
//! This crate implements the byte-stream framing discipline used between the
//! host and the mira gateway board: payloads travel over a continuous serial
//! byte channel delimited by a reserved flag byte, with any payload byte that
//! collides with a control byte escaped on the wire.
//!
//! # Protocol Overview
//!
//! The serial channel delivers bytes one at a time with no message
//! boundaries of its own, so the framing layer provides:
//!
//! - **Encoding**: a pure transform wrapping a payload in flag delimiters and
//!   escaping reserved bytes ([`encode_frame`])
//! - **Decoding**: an incremental state machine that rebuilds payloads from
//!   the byte stream and resynchronizes after corruption without losing the
//!   frames that follow ([`FrameDecoder`])
//!
//! # Example
//!
//! ```rust,ignore
//! use mira_hdlc::{encode_frame, DecoderState, FrameDecoder};
//!
//! let wire = encode_frame(&[0x01, 0x02]);
//!
//! let mut decoder = FrameDecoder::new();
//! for &byte in &wire {
//!     decoder.handle_byte(byte)?;
//!     if decoder.state() == DecoderState::Ready {
//!         let payload = decoder.take_frame().unwrap();
//!     }
//! }
//! ```

mod constants;
mod error;
mod frame;

pub use constants::*;
pub use error::*;
pub use frame::*;
