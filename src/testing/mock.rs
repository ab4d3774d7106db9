//! Deterministic capability doubles

use sha2::{Digest, Sha256};

use crate::crypto::{ChallengeGenerator, CryptoVerifier, CHALLENGE_SIZE};

/// Challenge generator returning a fixed value, for tests that need to
/// predict the issued challenge
#[derive(Debug, Clone, Copy)]
pub struct FixedChallengeGenerator {
    challenge: [u8; CHALLENGE_SIZE],
}

impl FixedChallengeGenerator {
    #[must_use]
    pub fn new(challenge: [u8; CHALLENGE_SIZE]) -> Self {
        Self { challenge }
    }
}

impl ChallengeGenerator for FixedChallengeGenerator {
    fn generate_challenge(&self) -> [u8; CHALLENGE_SIZE] {
        self.challenge
    }
}

/// Verifier that fails every signature while hashing normally
///
/// Lets tests drive the `InvalidSignature` path without crafting a
/// corrupted payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAllVerifier;

impl CryptoVerifier for RejectAllVerifier {
    fn verify(&self, _public_key: &[u8], _message: &[u8], _signature: &[u8]) -> bool {
        false
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}
