//! Cryptographic primitives for Keylink.
//!
//! This module provides:
//! - SHA-256 for deterministic token digests
//! - HMAC-SHA256 for randomized token digests
//! - OS-backed random bytes for per-token salts
//! - Lowercase hex encoding of digests

use crate::error::{Error, Result};

/// Compute HMAC-SHA256.
///
/// # Arguments
///
/// * `key` - The MAC key (any length)
/// * `data` - The data to authenticate
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Compute SHA-256 hash of data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Fill a fixed-size buffer from the operating system's entropy source.
///
/// Returns [`Error::Entropy`] if the source fails.
pub fn try_random_bytes<const N: usize>() -> Result<[u8; N]> {
    use rand::RngCore;

    let mut bytes = [0u8; N];
    rand::rngs::OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(bytes)
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256() {
        let key = b"test_key";
        let data = b"test_data";

        let hmac1 = hmac_sha256(key, data);
        let hmac2 = hmac_sha256(key, data);

        assert_eq!(hmac1, hmac2);

        let hmac3 = hmac_sha256(key, b"different_data");
        assert_ne!(hmac1, hmac3);

        let hmac4 = hmac_sha256(b"different_key", data);
        assert_ne!(hmac1, hmac4);
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            to_hex(&sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_try_random_bytes() {
        let bytes1: [u8; 16] = try_random_bytes().unwrap();
        let bytes2: [u8; 16] = try_random_bytes().unwrap();

        assert_ne!(bytes1, bytes2, "Random bytes should be different");
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x00, 0x0f, 0xa0, 0xff]), "000fa0ff");
        assert_eq!(to_hex(&[]), "");
    }
}
