//! SDK Utilities

mod time;

pub use time::{now_ms, relative_time};
