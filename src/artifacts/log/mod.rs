//! Raw log normalization
//!
//! This module turns the text produced by `git log` with the graph format into commit
//! records:
//!
//! - `parser`: line parser, decoration filtering and timestamp conversion
//!
//! Parsing never fails as a whole. A malformed record only shrinks the result.

pub mod parser;

pub use parser::{Clock, FixedClock, LogParser, ParsedLog, SystemClock};
