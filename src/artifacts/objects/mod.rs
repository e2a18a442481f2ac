//! Commit identifiers and normalized commit records
//!
//! - `object_id`: validated commit hash
//! - `commit`: the immutable record produced by the log normalizer

pub mod commit;
pub mod object_id;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-256 hash in hexadecimal format
pub const OBJECT_ID_SHA256_LENGTH: usize = 64;
