/*!
 * Serialization Utilities
 *
 * Bincode framing for results crossing the worker process boundary.
 */

pub mod bincode;

pub use self::bincode::{decode_frame, encode_frame, frame_len, FrameError, FrameResult};
