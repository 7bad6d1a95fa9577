//! SHA-256 digests used as content keys.

use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of `content`.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
