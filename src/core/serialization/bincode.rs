/*!
 * Binary Framing with bincode
 * Versioned, length-prefixed frames for the single-slot worker result channel
 *
 * # Format
 *
 * `[1-byte version][4-byte LE payload length][bincode payload]`
 *
 * The length prefix is what lets the caller tell a published result apart
 * from a partially written one: a slot counts as published only once a full
 * frame has arrived.
 */

use crate::core::limits::{FRAME_FORMAT_VERSION, FRAME_HEADER_LEN, MAX_FRAME_PAYLOAD};
use serde::{de::DeserializeOwned, Serialize};

/// Result type for framing operations
pub type FrameResult<T> = Result<T, FrameError>;

/// Framing errors with context
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FrameError {
    #[error("Serialization failed: {context}")]
    Serialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Deserialization failed: {context}")]
    Deserialization {
        context: &'static str,
        #[source]
        source: Box<bincode::ErrorKind>,
    },

    #[error("Frame truncated: expected {expected} bytes, got {actual} bytes")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid format version: expected {expected}, got {actual}")]
    InvalidVersion { expected: u8, actual: u8 },

    #[error("Payload too large: {size} bytes exceeds {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// Encode a value into a versioned frame
pub fn encode_frame<T: Serialize>(value: &T) -> FrameResult<Vec<u8>> {
    let payload = bincode::serialize(value).map_err(|source| FrameError::Serialization {
        context: "worker result",
        source,
    })?;

    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::TooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.push(FRAME_FORMAT_VERSION);
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Total length of the frame at the start of `bytes`, once the header is in
///
/// Returns `None` while fewer than `FRAME_HEADER_LEN` bytes have arrived.
pub fn frame_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < FRAME_HEADER_LEN {
        return None;
    }
    let len = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
    Some(FRAME_HEADER_LEN + len)
}

/// Decode a complete frame
pub fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> FrameResult<T> {
    let total = frame_len(bytes).ok_or(FrameError::Truncated {
        expected: FRAME_HEADER_LEN,
        actual: bytes.len(),
    })?;

    if bytes[0] != FRAME_FORMAT_VERSION {
        return Err(FrameError::InvalidVersion {
            expected: FRAME_FORMAT_VERSION,
            actual: bytes[0],
        });
    }

    if total - FRAME_HEADER_LEN > MAX_FRAME_PAYLOAD {
        return Err(FrameError::TooLarge {
            size: total - FRAME_HEADER_LEN,
            max: MAX_FRAME_PAYLOAD,
        });
    }

    if bytes.len() < total {
        return Err(FrameError::Truncated {
            expected: total,
            actual: bytes.len(),
        });
    }

    bincode::deserialize(&bytes[FRAME_HEADER_LEN..total]).map_err(|source| {
        FrameError::Deserialization {
            context: "worker result",
            source,
        }
    })
}
