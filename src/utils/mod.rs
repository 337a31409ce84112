//! Utils Module
pub mod logging;
pub mod time;

pub use logging::init_logging;
pub use time::{format_time, from_epoch_secs, seconds, span, Timestamp};
