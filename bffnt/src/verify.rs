//! Content-hash comparison of original and rewritten containers

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `bytes`
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hashes of the input and output of a rewrite
///
/// Equal hashes mean the rewrite changed nothing. That is a valid outcome
/// (no functional edit), not a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    pub original_hash: String,
    pub output_hash: String,
}

impl Verification {
    pub fn compare(original: &[u8], output: &[u8]) -> Self {
        Self {
            original_hash: content_hash(original),
            output_hash: content_hash(output),
        }
    }

    pub fn is_identical(&self) -> bool {
        self.original_hash == self.output_hash
    }
}
