//! Secrets and hashlocks
//!
//! A [`Secret`] is 32 random bytes; its [`HashLock`] is the digest registered
//! on-chain. The digest function is chain-specific and must match the deployed
//! contract exactly, so it is always chosen by the chain adapter. On the wire
//! both values travel as 0x-prefixed lower-case hex.

use rand::RngCore;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use std::fmt;

use crate::error::{SwapError, SwapResult};

/// Byte length of secrets and hashlocks.
pub const DIGEST_LEN: usize = 32;

/// Digest function binding a secret to its on-chain hashlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    Sha256,
    Sha3_256,
}

/// A swap secret: 32 cryptographically random bytes.
///
/// Owned exclusively by the party that generated it until a claim reveals it
/// on-chain, after which it is public.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; DIGEST_LEN]);

/// Digest of a [`Secret`]; the on-chain commitment both locks share.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashLock([u8; DIGEST_LEN]);

impl Secret {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Secret(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Wire encoding: lower-case hex with a literal `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex; the `0x` prefix is accepted but not required, since
    /// persisted records from older producers omit it.
    pub fn from_hex(input: &str) -> SwapResult<Self> {
        decode_hex32(input).map(Secret)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.to_hex())
    }
}

impl HashLock {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        HashLock(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(input: &str) -> SwapResult<Self> {
        decode_hex32(input).map(HashLock)
    }

    /// Digest a secret under the given algorithm.
    pub fn compute(alg: HashAlgorithm, secret: &Secret) -> Self {
        let digest: [u8; DIGEST_LEN] = match alg {
            HashAlgorithm::Sha256 => Sha256::digest(secret.as_bytes()).into(),
            HashAlgorithm::Sha3_256 => Sha3_256::digest(secret.as_bytes()).into(),
        };
        HashLock(digest)
    }
}

impl fmt::Debug for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashLock({})", self.to_hex())
    }
}

impl fmt::Display for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Generates and verifies secret/hashlock pairs.
pub struct SecretManager;

impl SecretManager {
    /// Draw a fresh secret from the OS CSPRNG and compute its hashlock.
    ///
    /// Fails with [`SwapError::RandomnessUnavailable`] if the platform RNG
    /// cannot produce bytes; there is no weaker fallback. Every call draws new
    /// randomness, so secrets are never reused across swaps.
    pub fn generate(alg: HashAlgorithm) -> SwapResult<(Secret, HashLock)> {
        let mut bytes = [0u8; DIGEST_LEN];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SwapError::RandomnessUnavailable(e.to_string()))?;
        let secret = Secret(bytes);
        let hash_lock = HashLock::compute(alg, &secret);
        Ok((secret, hash_lock))
    }

    /// Recompute the digest and compare against the expected hashlock.
    ///
    /// The comparison accumulates over all bytes instead of short-circuiting.
    pub fn verify(secret: &Secret, expected: &HashLock, alg: HashAlgorithm) -> bool {
        let actual = HashLock::compute(alg, secret);
        let mut diff = 0u8;
        for (a, b) in actual.0.iter().zip(expected.0.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

/// Independent SHA3-256 verification of a secret against a hashlock.
///
/// Lets an operator cross-check a commitment produced by a SHA3-based contract
/// without going through an adapter.
pub fn verify_hashlock_sha3(secret: &Secret, expected: &HashLock) -> bool {
    SecretManager::verify(secret, expected, HashAlgorithm::Sha3_256)
}

/// Decode a 32-byte value from hex, with or without the `0x` prefix.
pub fn decode_hex32(input: &str) -> SwapResult<[u8; DIGEST_LEN]> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(stripped).map_err(|_| SwapError::MalformedHex {
        input: input.to_string(),
        expected: DIGEST_LEN,
    })?;
    bytes.try_into().map_err(|_| SwapError::MalformedHex {
        input: input.to_string(),
        expected: DIGEST_LEN,
    })
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Secret::from_hex(&s).map_err(de::Error::custom)
    }
}

impl Serialize for HashLock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashLock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HashLock::from_hex(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_verifies_under_its_hashlock() {
        let (secret, hash_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        assert!(SecretManager::verify(
            &secret,
            &hash_lock,
            HashAlgorithm::Sha256
        ));
    }

    #[test]
    fn different_secret_fails_verification() {
        let (secret, hash_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let mut other = *secret.as_bytes();
        other[0] ^= 0x01;
        let other = Secret::from_bytes(other);
        assert!(!SecretManager::verify(
            &other,
            &hash_lock,
            HashAlgorithm::Sha256
        ));
    }

    #[test]
    fn sha3_and_sha256_commitments_differ() {
        let (secret, sha256_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let sha3_lock = HashLock::compute(HashAlgorithm::Sha3_256, &secret);
        assert_ne!(sha256_lock.as_bytes(), sha3_lock.as_bytes());
        assert!(verify_hashlock_sha3(&secret, &sha3_lock));
        assert!(!verify_hashlock_sha3(&secret, &sha256_lock));
    }

    #[test]
    fn hex_round_trip() {
        let (secret, hash_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let secret_back = Secret::from_hex(&secret.to_hex()).unwrap();
        assert_eq!(secret.as_bytes(), secret_back.as_bytes());
        let lock_back = HashLock::from_hex(&hash_lock.to_hex()).unwrap();
        assert_eq!(hash_lock, lock_back);
    }

    #[test]
    fn hex_accepts_unprefixed_input() {
        let secret = Secret::from_bytes([7u8; 32]);
        let unprefixed = secret.to_hex().trim_start_matches("0x").to_string();
        assert_eq!(
            Secret::from_hex(&unprefixed).unwrap().as_bytes(),
            secret.as_bytes()
        );
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(matches!(
            Secret::from_hex("0xzz"),
            Err(SwapError::MalformedHex { .. })
        ));
        assert!(matches!(
            HashLock::from_hex("0x1234"),
            Err(SwapError::MalformedHex { .. })
        ));
    }

    #[test]
    fn serde_round_trip_as_prefixed_hex() {
        let (secret, hash_lock) = SecretManager::generate(HashAlgorithm::Sha256).unwrap();
        let json = serde_json::to_string(&hash_lock).unwrap();
        assert!(json.starts_with("\"0x"));
        let back: HashLock = serde_json::from_str(&json).unwrap();
        assert_eq!(hash_lock, back);

        let json = serde_json::to_string(&secret).unwrap();
        let back: Secret = serde_json::from_str(&json).unwrap();
        assert_eq!(secret.as_bytes(), back.as_bytes());
    }
}
