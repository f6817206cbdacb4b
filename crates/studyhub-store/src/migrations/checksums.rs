//! SHA-256 checksums of migration SQL, to detect edited migrations

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `content`
pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_hex_sha256() {
        let checksum = compute_checksum("SELECT 1");
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_checksum_changes_with_content() {
        assert_eq!(compute_checksum("SELECT 1"), compute_checksum("SELECT 1"));
        assert_ne!(compute_checksum("SELECT 1"), compute_checksum("SELECT 2"));
    }
}
