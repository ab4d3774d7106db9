//! Cryptographic capabilities for U2F ceremonies
//!
//! The protocol logic never touches curve parameters directly; it composes
//! byte buffers and hands them to these capability traits. Both traits are
//! implemented here against the process RNG and ECDSA P-256 (the only
//! algorithm U2F tokens speak), and both can be swapped for deterministic
//! test doubles.

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Challenge length in bytes (256 bits)
pub const CHALLENGE_SIZE: usize = 32;

/// Source of per-ceremony random challenges
pub trait ChallengeGenerator: Send + Sync {
    /// Produce a fresh random challenge
    fn generate_challenge(&self) -> [u8; CHALLENGE_SIZE];
}

/// Signature verification and hashing used by the protocol core
///
/// Implementations are stateless and safely shared across concurrent
/// ceremonies.
pub trait CryptoVerifier: Send + Sync {
    /// Verify `signature` over `message` with the given public key
    ///
    /// Malformed keys or signatures yield `false`, never a panic.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;

    /// SHA-256 digest of `data`
    fn sha256(&self, data: &[u8]) -> [u8; 32];
}

/// Challenge generator backed by the operating system's secure RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsChallengeGenerator;

impl ChallengeGenerator for OsChallengeGenerator {
    fn generate_challenge(&self) -> [u8; CHALLENGE_SIZE] {
        let mut bytes = [0u8; CHALLENGE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        bytes
    }
}

/// ECDSA P-256 with SHA-256 (ES256), the U2F signature algorithm
///
/// Public keys are SEC1 uncompressed points, signatures are ASN.1
/// DER-encoded as tokens emit them.
#[derive(Debug, Default, Clone, Copy)]
pub struct P256Verifier;

impl CryptoVerifier for P256Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_der(signature) else {
            return false;
        };
        verifying_key.verify(message, &signature).is_ok()
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}
