//! Frame encoding and the incremental frame decoder.
//!
//! Each frame on the wire is the payload wrapped in flag bytes, with any
//! payload byte equal to a control byte stuffed behind an escape:
//!
//! ```text
//! +------+------------------+------+
//! | 0x7E | escaped(payload) | 0x7E |
//! +------+------------------+------+
//! ```
//!
//! A payload byte equal to [`HDLC_FLAG`] or [`HDLC_ESCAPE`] appears on the
//! wire as [`HDLC_ESCAPE`] followed by the byte XOR [`HDLC_ESCAPE_MASK`];
//! every other byte passes through unchanged. An unescaped flag therefore
//! never occurs inside a frame, which is what lets the decoder find frame
//! boundaries in an arbitrary byte stream.

use bytes::{BufMut, BytesMut};

use crate::constants::{HDLC_ESCAPE, HDLC_ESCAPE_MASK, HDLC_FLAG};
use crate::error::FramingError;

/// Encode a payload into its flag-delimited wire form.
///
/// Pure transform with no failure modes: the result is always exactly
/// decodable back to `payload` by [`FrameDecoder`]. The output length is the
/// payload length plus two delimiters plus one extra byte per escaped
/// occurrence.
///
/// An empty payload encodes to two adjacent flag bytes, which a decoder
/// treats as idle-line flag padding rather than an empty frame.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(payload.len() + 2);
    wire.push(HDLC_FLAG);
    for &byte in payload {
        if byte == HDLC_FLAG || byte == HDLC_ESCAPE {
            wire.push(HDLC_ESCAPE);
            wire.push(byte ^ HDLC_ESCAPE_MASK);
        } else {
            wire.push(byte);
        }
    }
    wire.push(HDLC_FLAG);
    wire
}

/// State of the incremental frame decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No frame in progress; waiting for an opening flag.
    Idle,
    /// Accumulating unescaped payload bytes.
    Receiving,
    /// An escape byte was seen; the next byte is masked payload data.
    Escaped,
    /// A complete frame is buffered, waiting for [`FrameDecoder::take_frame`].
    Ready,
}

/// Incremental decoder for flag-delimited frames.
///
/// The decoder consumes exactly one wire byte per [`handle_byte`] call and
/// holds the already-unescaped bytes of the frame being assembled. Once a
/// closing flag completes a frame the state reaches [`DecoderState::Ready`]
/// and the payload can be read with [`take_frame`], which implicitly resets
/// the decoder for the next frame.
///
/// Malformed input (a flag terminating an open escape sequence) surfaces as
/// an error from [`handle_byte`]; the frame in progress is discarded and the
/// decoder resynchronizes on the next flag, so one corrupted frame never
/// affects the frames that follow. Flags seen while the buffer is empty are
/// treated as re-synchronizing openers, which makes the decoder tolerant of
/// idle-line flag padding and back-to-back closing/opening flags.
///
/// One instance decodes one connection's byte stream and must be driven
/// sequentially, in arrival order, from a single reader. The completed frame
/// must be taken before feeding further bytes; otherwise it is discarded.
///
/// [`handle_byte`]: FrameDecoder::handle_byte
/// [`take_frame`]: FrameDecoder::take_frame
#[derive(Debug)]
pub struct FrameDecoder {
    /// Current state of the byte processor.
    state: DecoderState,
    /// Unescaped bytes of the frame currently being assembled.
    buffer: BytesMut,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder in the idle state.
    pub fn new() -> Self {
        FrameDecoder {
            state: DecoderState::Idle,
            buffer: BytesMut::new(),
        }
    }

    /// Current decoder state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of payload bytes buffered for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Consume one wire byte and advance the state machine.
    ///
    /// Returns an error when the byte completes a malformed sequence; the
    /// frame being assembled is dropped and the decoder returns to an
    /// accepting state, so the caller can keep feeding the stream.
    pub fn handle_byte(&mut self, byte: u8) -> Result<(), FramingError> {
        match self.state {
            DecoderState::Idle => {
                // Everything before an opening flag is line noise.
                if byte == HDLC_FLAG {
                    self.buffer.clear();
                    self.state = DecoderState::Receiving;
                }
            }
            DecoderState::Receiving => match byte {
                HDLC_FLAG => {
                    if self.buffer.is_empty() {
                        // Idle-line padding or a closing flag doubling as the
                        // next opener: keep accumulating from here.
                    } else {
                        log::trace!("frame complete: {} bytes", self.buffer.len());
                        self.state = DecoderState::Ready;
                    }
                }
                HDLC_ESCAPE => self.state = DecoderState::Escaped,
                _ => self.buffer.put_u8(byte),
            },
            DecoderState::Escaped => {
                if byte == HDLC_FLAG {
                    self.buffer.clear();
                    self.state = DecoderState::Idle;
                    return Err(FramingError::UnexpectedFlag);
                }
                self.buffer.put_u8(byte ^ HDLC_ESCAPE_MASK);
                self.state = DecoderState::Receiving;
            }
            DecoderState::Ready => {
                // The caller fed more bytes without taking the completed
                // frame. Drop it and continue from a clean accumulating state.
                log::trace!("discarding unread frame ({} bytes)", self.buffer.len());
                self.buffer.clear();
                self.state = DecoderState::Receiving;
                return self.handle_byte(byte);
            }
        }
        Ok(())
    }

    /// Take the completed frame once the state has reached
    /// [`DecoderState::Ready`], resetting the decoder for the next frame.
    ///
    /// Returns `None` in every other state.
    pub fn take_frame(&mut self) -> Option<Vec<u8>> {
        if self.state != DecoderState::Ready {
            return None;
        }
        let payload = self.buffer.split().to_vec();
        self.state = DecoderState::Receiving;
        Some(payload)
    }

    /// Discard any frame in progress and return to the idle state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a byte sequence one byte at a time, collecting completed frames
    /// and counting decode errors.
    fn drain(decoder: &mut FrameDecoder, wire: &[u8]) -> (Vec<Vec<u8>>, usize) {
        let mut frames = Vec::new();
        let mut errors = 0;
        for &byte in wire {
            if decoder.handle_byte(byte).is_err() {
                errors += 1;
                continue;
            }
            if decoder.state() == DecoderState::Ready {
                frames.push(decoder.take_frame().expect("ready state holds a frame"));
            }
        }
        (frames, errors)
    }

    #[test]
    fn test_encode_plain_payload() {
        assert_eq!(encode_frame(&[0x01, 0x02]), vec![0x7E, 0x01, 0x02, 0x7E]);
    }

    #[test]
    fn test_encode_escapes_flag() {
        // 0x7E XOR 0x20 = 0x5E
        assert_eq!(encode_frame(&[0x7E]), vec![0x7E, 0x7D, 0x5E, 0x7E]);
    }

    #[test]
    fn test_encode_escapes_escape() {
        // 0x7D XOR 0x20 = 0x5D
        assert_eq!(encode_frame(&[0x7D]), vec![0x7E, 0x7D, 0x5D, 0x7E]);
    }

    #[test]
    fn test_encode_empty_payload() {
        assert_eq!(encode_frame(&[]), vec![0x7E, 0x7E]);
    }

    #[test]
    fn test_encode_output_length() {
        // Two reserved bytes out of five: length = 5 + 2 delimiters + 2 stuffed.
        let payload = [0x10, 0x7E, 0x20, 0x7D, 0x30];
        assert_eq!(encode_frame(&payload).len(), payload.len() + 2 + 2);
    }

    #[test]
    fn test_roundtrip_plain() {
        let payload = b"hello gateway".to_vec();
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &encode_frame(&payload));
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn test_roundtrip_reserved_bytes() {
        let payload = vec![0x7E, 0x00, 0x7D, 0x7E, 0xFF];
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &encode_frame(&payload));
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn test_roundtrip_all_byte_values() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &encode_frame(&payload));
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![payload]);
    }

    #[test]
    fn test_roundtrip_long_payload() {
        let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &encode_frame(&payload));
        assert_eq!(errors, 0);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], payload);
    }

    #[test]
    fn test_no_empty_frames() {
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &[0x7E, 0x7E]);
        assert_eq!(errors, 0);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_flag_padding_between_frames() {
        let mut wire = vec![0x7E, 0x7E, 0x7E];
        wire.extend_from_slice(&encode_frame(&[0x42]));
        wire.extend_from_slice(&[0x7E, 0x7E]);

        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &wire);
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x42]]);
    }

    #[test]
    fn test_streaming_independence() {
        // Any split point must yield the same single frame.
        let payload = vec![0x01, 0x7E, 0x02, 0x7D, 0x03];
        let wire = encode_frame(&payload);

        for split in 0..=wire.len() {
            let mut decoder = FrameDecoder::new();
            let (mut frames, errors) = drain(&mut decoder, &wire[..split]);
            let (tail_frames, tail_errors) = drain(&mut decoder, &wire[split..]);
            frames.extend(tail_frames);

            assert_eq!(errors + tail_errors, 0, "split at {split}");
            assert_eq!(frames, vec![payload.clone()], "split at {split}");
        }
    }

    #[test]
    fn test_resynchronization_after_malformed_frame() {
        // Escape immediately followed by flag aborts the frame in progress.
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &[0x7E, 0x01, 0x7D, 0x7E, 0x02, 0x7E]);
        assert_eq!(errors, 1);
        assert!(frames.is_empty());

        // The next well-formed frame on the stream still decodes.
        let (frames, errors) = drain(&mut decoder, &[0x7E, 0x03, 0x7E]);
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x03]]);
    }

    #[test]
    fn test_multi_frame_stream() {
        let mut wire = encode_frame(&[0x01]);
        wire.extend_from_slice(&encode_frame(&[0x02]));

        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &wire);
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x01], vec![0x02]]);
    }

    #[test]
    fn test_escaped_escape_byte() {
        // An escape stuffed behind an escape decodes to 0x7D XOR 0x20.
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &[0x7E, 0x7D, 0x7D, 0x7E]);
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x5D]]);
    }

    #[test]
    fn test_noise_before_first_flag_ignored() {
        let mut decoder = FrameDecoder::new();
        let (frames, errors) = drain(&mut decoder, &[0xDE, 0xAD, 0x7E, 0x03, 0x7E]);
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x03]]);
    }

    #[test]
    fn test_take_frame_requires_ready() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.take_frame(), None);

        decoder.handle_byte(0x7E).unwrap();
        decoder.handle_byte(0x01).unwrap();
        assert_eq!(decoder.take_frame(), None);

        decoder.handle_byte(0x7E).unwrap();
        assert_eq!(decoder.state(), DecoderState::Ready);
        assert_eq!(decoder.take_frame(), Some(vec![0x01]));
        assert_eq!(decoder.state(), DecoderState::Receiving);
        assert_eq!(decoder.take_frame(), None);
    }

    #[test]
    fn test_state_transitions() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), DecoderState::Idle);

        decoder.handle_byte(0x7E).unwrap();
        assert_eq!(decoder.state(), DecoderState::Receiving);

        decoder.handle_byte(0x01).unwrap();
        assert_eq!(decoder.state(), DecoderState::Receiving);
        assert_eq!(decoder.buffered_len(), 1);

        decoder.handle_byte(0x7D).unwrap();
        assert_eq!(decoder.state(), DecoderState::Escaped);

        decoder.handle_byte(0x5E).unwrap();
        assert_eq!(decoder.state(), DecoderState::Receiving);
        assert_eq!(decoder.buffered_len(), 2);

        decoder.handle_byte(0x7E).unwrap();
        assert_eq!(decoder.state(), DecoderState::Ready);
        assert_eq!(decoder.take_frame(), Some(vec![0x01, 0x7E]));
    }

    #[test]
    fn test_error_returns_decoder_to_idle() {
        let mut decoder = FrameDecoder::new();
        decoder.handle_byte(0x7E).unwrap();
        decoder.handle_byte(0x7D).unwrap();
        assert_eq!(
            decoder.handle_byte(0x7E),
            Err(FramingError::UnexpectedFlag)
        );
        assert_eq!(decoder.state(), DecoderState::Idle);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_unread_frame_is_discarded() {
        let mut wire = encode_frame(&[0x01]);
        wire.extend_from_slice(&encode_frame(&[0x02]));

        // Feed everything without ever draining the first Ready state: the
        // first frame is dropped, the second survives.
        let mut decoder = FrameDecoder::new();
        for &byte in &wire {
            decoder.handle_byte(byte).unwrap();
        }
        assert_eq!(decoder.take_frame(), Some(vec![0x02]));
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.handle_byte(0x7E).unwrap();
        decoder.handle_byte(0x01).unwrap();

        decoder.reset();
        assert_eq!(decoder.state(), DecoderState::Idle);
        assert_eq!(decoder.buffered_len(), 0);

        let (frames, errors) = drain(&mut decoder, &encode_frame(&[0x09]));
        assert_eq!(errors, 0);
        assert_eq!(frames, vec![vec![0x09]]);
    }
}
