//! 32-byte SHA-256 digests and leaf canonicalization.
//!
//! Every node in the tree, including the leaves, is a [`Digest`]. Leaves come
//! from [`canonicalize`], internal nodes from [`hash_pair`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{MerkleError, Result};

/// Digest width in bytes.
pub const DIGEST_LEN: usize = 32;

/// A SHA-256 output. Equality is byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Wraps an existing 32-byte slice without hashing it.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DIGEST_LEN {
            return Err(MerkleError::InvalidDigest(format!(
                "expected {} bytes, got {}",
                DIGEST_LEN,
                bytes.len()
            )));
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parses 64 hex characters, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = decode_hex(hex_str)?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

impl FromStr for Digest {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Decodes hex with an optional `0x`/`0X` prefix. Surrounding whitespace is ignored.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>> {
    let trimmed = hex_str.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(body).map_err(|e| MerkleError::InvalidDigest(format!("'{}': {}", trimmed, e)))
}

/// Hash of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    finish(hasher)
}

/// Parent node hash: `H(left || right)`, always in tree-position order.
pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    finish(hasher)
}

fn finish(hasher: Sha256) -> Digest {
    let mut arr = [0u8; DIGEST_LEN];
    arr.copy_from_slice(&hasher.finalize()[..DIGEST_LEN]);
    Digest(arr)
}

/// Turns a transaction identifier of any length (empty included) into a leaf.
pub fn canonicalize(identifier: &[u8]) -> Digest {
    sha256(identifier)
}

/// Canonicalizes a hex-encoded identifier such as `0xabc...`, hashing the
/// decoded bytes rather than the text.
pub fn canonicalize_hex(identifier: &str) -> Result<Digest> {
    Ok(canonicalize(&decode_hex(identifier)?))
}

pub fn canonicalize_all<I, T>(identifiers: I) -> Vec<Digest>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    identifiers
        .into_iter()
        .map(|id| canonicalize(id.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest as _;

    #[test]
    fn test_canonicalize_matches_sha256() {
        let expected = Sha256::digest(b"tx1");
        assert_eq!(canonicalize(b"tx1").as_bytes()[..], expected[..]);
    }

    #[test]
    fn test_canonicalize_empty_input() {
        // SHA-256 of the empty string
        let expected =
            Digest::from_hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();
        assert_eq!(canonicalize(&[]), expected);
    }

    #[test]
    fn test_canonicalize_hex_hashes_decoded_bytes() {
        let raw = [0xABu8; 32];
        let text = format!("0x{}", hex::encode(raw));
        assert_eq!(canonicalize_hex(&text).unwrap(), canonicalize(&raw));
        assert_eq!(
            canonicalize_hex(&hex::encode_upper(raw)).unwrap(),
            canonicalize(&raw)
        );
        assert!(canonicalize_hex("0xzz").is_err());
    }

    #[test]
    fn test_hash_pair_is_position_ordered() {
        let a = canonicalize(b"a");
        let b = canonicalize(b"b");
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));

        let mut concat = Vec::new();
        concat.extend_from_slice(a.as_bytes());
        concat.extend_from_slice(b.as_bytes());
        assert_eq!(hash_pair(&a, &b), sha256(&concat));
    }

    #[test]
    fn test_digest_hex_round_trip_and_length_check() {
        let d = canonicalize(b"leaf");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert_eq!(d.to_string(), d.to_hex());
        assert!(matches!(
            Digest::from_hex("0x1234"),
            Err(MerkleError::InvalidDigest(_))
        ));
    }

    #[test]
    fn test_digest_serde_as_hex_string() {
        let d = canonicalize(b"leaf");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_str::<Digest>("\"0xnothex\"").is_err());
    }
}
