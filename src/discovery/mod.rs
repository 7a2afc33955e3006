//! Language server discovery: process listing, argument parsing, port lookup

pub mod cmdline;
pub mod locator;
pub mod ports;

pub use locator::ProcessLocator;

/// One row of an OS process listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProcess {
    pub pid: u32,
    pub command_line: String,
}
