/*!
 * Time Limits
 * Normalizes heterogeneous time specifications into one bound in seconds
 */

mod resolver;

pub use resolver::{as_duration, resolve, TimeSpec};
