use sha2::{Digest, Sha256};

/// Hex SHA-256 of the memo body with surrounding whitespace trimmed.
pub fn calculate_content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.trim().as_bytes()))
}
