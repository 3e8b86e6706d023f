//! Plain-text utilities used by the extraction pipeline.
//!
//! - `clean`: HTML fragment to plain text.
//! - `reading_time`: minutes-to-read estimate for mixed CJK/Latin text.

pub mod clean;
pub mod reading_time;

pub use clean::clean;
pub use reading_time::{estimate as estimate_reading_time, TextStats};
