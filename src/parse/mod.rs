//! Best-effort parsing of loosely formatted durations and timestamps.

pub mod date;
pub mod duration;

pub use date::{parse_date, parse_date_in, parse_date_str_in};
pub use duration::{parse_duration_minutes, parse_duration_str};
