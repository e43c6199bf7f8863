//! Error types for motionphoto-media.

use std::io;
use thiserror::Error;

use crate::heif::BoxType;

/// Result type for motionphoto-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for motionphoto-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer bytes available than a read requested.
    #[error("Buffer underflow: need {need} bytes, have {have}")]
    BufferUnderflow { need: usize, have: usize },

    /// A seek target outside the buffer.
    #[error("Seek to {pos} outside buffer of {len} bytes")]
    SeekOutOfRange { pos: u64, len: u64 },

    /// A nested box whose contents contradict its header.
    #[error("Invalid {box_type} box: {reason}")]
    InvalidBox { box_type: BoxType, reason: String },

    /// Root box declares a size smaller than its own header.
    #[error("Box at offset {offset} declares size {size}, smaller than its header")]
    BoxTooSmall { offset: u64, size: u64 },

    /// Root box end offset does not fit in 64 bits.
    #[error("Box at offset {offset} with size {size} overflows the offset range")]
    BoxOverflow { offset: u64, size: u64 },

    /// Root box extends past the end of the stream.
    #[error("Box at offset {offset} with size {size} exceeds stream length {stream_len}")]
    BoxOutOfBounds {
        offset: u64,
        size: u64,
        stream_len: u64,
    },

    /// Stream ended part way through a root box header.
    #[error("Truncated box header at offset {offset}")]
    TruncatedHeader { offset: u64 },

    /// Vendor box larger than the buffering limit.
    #[error("Vendor box of {size} bytes exceeds maximum {max}")]
    BoxTooLarge { size: u64, max: u64 },

    /// Required nested box is absent.
    #[error("Missing required box: {0}")]
    MissingBox(&'static str),

    /// JPEG input that is not a JPEG or carries an unusable video pointer.
    #[error("Invalid JPEG: {0}")]
    InvalidJpeg(String),
}

impl Error {
    /// Create an invalid box error.
    pub fn invalid_box(box_type: BoxType, reason: impl Into<String>) -> Self {
        Self::InvalidBox {
            box_type,
            reason: reason.into(),
        }
    }

    /// Create an invalid JPEG error.
    pub fn invalid_jpeg(msg: impl Into<String>) -> Self {
        Self::InvalidJpeg(msg.into())
    }
}
