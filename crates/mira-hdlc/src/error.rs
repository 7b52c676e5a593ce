//! Framing error types.

use thiserror::Error;

/// Errors that can occur while decoding frames from the wire.
///
/// A decode error is scoped to the frame being assembled: the decoder
/// discards that frame and resynchronizes on the next flag byte, so the
/// connection itself stays usable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// A flag byte arrived while an escape sequence was still open.
    ///
    /// The escape byte must be followed by exactly one masked data byte;
    /// a flag in that position means the frame was truncated or corrupted.
    #[error("flag byte 0x7E terminated an open escape sequence")]
    UnexpectedFlag,
}
