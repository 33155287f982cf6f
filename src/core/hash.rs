// Hashing utilities

use sha2::{Digest, Sha256};

/// Length of a node address in hex characters
pub const ADDRESS_LEN: usize = 40;

/// SHA256 of the data as lowercase hex (64 characters)
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Single SHA256 hash as raw bytes (signature message digest)
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

/// Derive an address from an encoded public key:
/// first 40 hex chars of SHA256(SHA256(encoded key))
pub fn derive_address(encoded_pubkey: &str) -> String {
    let inner = sha256_hex(encoded_pubkey.as_bytes());
    let mut outer = sha256_hex(inner.as_bytes());
    outer.truncate(ADDRESS_LEN);
    outer
}

/// Count leading '0' hex digits of a hash string
pub fn leading_zero_digits(hash: &str) -> usize {
    hash.chars().take_while(|c| *c == '0').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        // Same data should produce same hash
        assert_eq!(hash, sha256_hex(b"hello world"));
    }

    #[test]
    fn test_sha256_hex_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_derive_address() {
        let addr = derive_address("02abcdef");
        assert_eq!(addr.len(), ADDRESS_LEN);
        assert_eq!(addr, derive_address("02abcdef"));
        assert_ne!(addr, derive_address("03abcdef"));
    }

    #[test]
    fn test_leading_zero_digits() {
        assert_eq!(leading_zero_digits("000abc"), 3);
        assert_eq!(leading_zero_digits("abc000"), 0);
        assert_eq!(leading_zero_digits(""), 0);
    }
}
