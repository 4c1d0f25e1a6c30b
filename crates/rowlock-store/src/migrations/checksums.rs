//! Checksum validation for migrations
//!
//! A SHA256 of each migration's SQL is recorded when it is applied; a
//! different checksum on a later run means the embedded SQL was edited.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
