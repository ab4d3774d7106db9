//! Client data envelope validation
//!
//! The browser sends back a JSON envelope binding the ceremony type, the
//! issued challenge, and the asserting origin. The raw decoded bytes are
//! kept verbatim because they are an input to signature verification:
//! re-serializing the JSON would break byte-for-byte equality with what the
//! token actually signed.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::errors::U2fError;

#[derive(Deserialize)]
struct ClientDataFields {
    typ: String,
    challenge: String,
    origin: String,
    #[serde(default, alias = "channelIdPublicKey")]
    cid_pubkey: Option<serde_json::Value>,
}

/// Parsed client data with its canonical byte representation
pub struct ClientData {
    raw: Vec<u8>,
    typ: String,
    challenge: String,
    origin: String,
    cid_pubkey: Option<serde_json::Value>,
}

impl ClientData {
    /// Decode a base64url-encoded client data envelope
    ///
    /// Unknown JSON fields are ignored; missing `typ`, `challenge`, or
    /// `origin` are not.
    ///
    /// # Errors
    /// Returns `MalformedClientData` on invalid base64, invalid JSON, or
    /// missing required fields.
    pub fn from_base64(encoded: &str) -> Result<Self, U2fError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| U2fError::MalformedClientData("invalid base64 encoding".into()))?;
        Self::from_bytes(raw)
    }

    /// Parse a decoded client data envelope, retaining the raw bytes
    ///
    /// # Errors
    /// Returns `MalformedClientData` on invalid JSON or missing required
    /// fields.
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self, U2fError> {
        let fields: ClientDataFields = serde_json::from_slice(&raw)
            .map_err(|e| U2fError::MalformedClientData(e.to_string()))?;
        Ok(Self {
            raw,
            typ: fields.typ,
            challenge: fields.challenge,
            origin: fields.origin,
            cid_pubkey: fields.cid_pubkey,
        })
    }

    /// Validate the envelope against the ceremony's expectations
    ///
    /// Checks run in order and fail fast: type, challenge, then origin
    /// against the facet allow-list. A `None` or empty allow-list disables
    /// the origin check. Origin comparison is exact string equality; callers
    /// wanting a laxer policy normalize their facet set first.
    ///
    /// # Errors
    /// Returns `TypeMismatch`, `ChallengeMismatch`, or `UntrustedFacet` for
    /// the first violated check.
    pub fn check_content(
        &self,
        expected_type: &'static str,
        expected_challenge: &str,
        facets: Option<&HashSet<String>>,
    ) -> Result<(), U2fError> {
        if self.typ != expected_type {
            return Err(U2fError::TypeMismatch {
                expected: expected_type,
                actual: self.typ.clone(),
            });
        }

        if self.challenge != expected_challenge {
            return Err(U2fError::ChallengeMismatch);
        }

        if let Some(facets) = facets {
            if !facets.is_empty() && !facets.contains(&self.origin) {
                return Err(U2fError::UntrustedFacet(self.origin.clone()));
            }
        }

        Ok(())
    }

    /// The exact bytes the client produced, used as signature input
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Ceremony type token asserted by the client
    #[must_use]
    pub fn typ(&self) -> &str {
        &self.typ
    }

    /// Challenge echoed by the client
    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Origin asserted by the client
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Optional channel ID public key; carried through but never validated
    #[must_use]
    pub fn cid_pubkey(&self) -> Option<&serde_json::Value> {
        self.cid_pubkey.as_ref()
    }
}
