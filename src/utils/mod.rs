//! Shared helpers: filesystem locations, external commands, time and output formatting

pub mod format;
pub mod paths;
pub mod process;
pub mod time;
