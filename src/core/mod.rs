/*!
 * Core Module
 * Error kinds, limits and framing shared by both timeout strategies
 */

pub mod errors;
pub mod limits;
pub mod serialization;

pub use errors::*;
