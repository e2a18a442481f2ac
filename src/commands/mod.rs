//! Command implementations behind the `bit-graph` binary
//!
//! Commands write to the writer they are given, so they can be driven from tests
//! without capturing stdout.

pub mod porcelain;
