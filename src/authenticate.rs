//! Binary authentication response parsing and verification
//!
//! Fixed layout of the raw signature payload:
//!
//! ```text
//! [user presence: 1 byte][counter: u32 big-endian][signature: remaining]
//! ```
//!
//! The credential signature covers
//! `sha256(app_id) || user_presence || counter_be || sha256(client_data)`
//! and verifies against the public key captured at registration time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;

use crate::crypto::CryptoVerifier;
use crate::der::ByteCursor;
use crate::errors::U2fError;

/// Bit 0 of the user presence byte: the token observed a physical
/// interaction
const USER_PRESENT_FLAG: u8 = 0x01;

/// Parsed raw authentication payload
pub struct RawAuthenticationResponse {
    user_presence: u8,
    counter: u32,
    signature: Vec<u8>,
}

impl RawAuthenticationResponse {
    /// Decode and parse a base64url-encoded signature payload
    ///
    /// # Errors
    /// Returns `MalformedResponse` if the encoding or the binary layout is
    /// invalid.
    pub fn from_base64(encoded: &str) -> Result<Self, U2fError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| U2fError::MalformedResponse("invalid base64 encoding".into()))?;
        Self::from_bytes(&raw)
    }

    /// Parse a decoded signature payload
    ///
    /// # Errors
    /// Returns `MalformedResponse` if the binary layout is invalid.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, U2fError> {
        let mut cursor = ByteCursor::new(raw);
        let user_presence = cursor.read_u8()?;
        let counter = cursor.read_u32_be()?;
        let signature = cursor.read_rest().to_vec();
        if signature.is_empty() {
            return Err(U2fError::MalformedResponse(
                "authentication payload has no signature".into(),
            ));
        }
        Ok(Self {
            user_presence,
            counter,
            signature,
        })
    }

    /// Verify the credential signature for this authentication
    ///
    /// `client_data` must be the canonical client data bytes; `public_key`
    /// is the device's registered 65-byte uncompressed point.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if verification fails.
    pub fn check_signature(
        &self,
        app_id: &str,
        client_data: &[u8],
        public_key: &[u8],
        verifier: &dyn CryptoVerifier,
    ) -> Result<(), U2fError> {
        let signed_bytes = self.signed_bytes(app_id, client_data, verifier);
        if verifier.verify(public_key, &signed_bytes, &self.signature) {
            debug!("authentication signature verified, counter {}", self.counter);
            Ok(())
        } else {
            Err(U2fError::InvalidSignature)
        }
    }

    /// Require the user presence bit
    ///
    /// # Errors
    /// Returns `UserNotPresent` if bit 0 of the user presence byte is clear.
    pub fn check_user_presence(&self) -> Result<(), U2fError> {
        if self.user_presence & USER_PRESENT_FLAG == 0 {
            return Err(U2fError::UserNotPresent);
        }
        Ok(())
    }

    /// Signature counter reported by the token
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Raw user presence byte
    #[must_use]
    pub fn user_presence(&self) -> u8 {
        self.user_presence
    }

    fn signed_bytes(&self, app_id: &str, client_data: &[u8], verifier: &dyn CryptoVerifier) -> Vec<u8> {
        let app_id_hash = verifier.sha256(app_id.as_bytes());
        let client_data_hash = verifier.sha256(client_data);

        let mut signed = Vec::with_capacity(32 + 1 + 4 + 32);
        signed.extend_from_slice(&app_id_hash);
        signed.push(self.user_presence);
        signed.extend_from_slice(&self.counter.to_be_bytes());
        signed.extend_from_slice(&client_data_hash);
        signed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_presence_counter_and_signature() {
        let raw = [0x01, 0x00, 0x00, 0x00, 0x2a, 0xde, 0xad, 0xbe, 0xef];
        let response = RawAuthenticationResponse::from_bytes(&raw).unwrap();
        assert_eq!(response.user_presence(), 0x01);
        assert_eq!(response.counter(), 42);
        assert!(response.check_user_presence().is_ok());
    }

    #[test]
    fn counter_is_big_endian() {
        let raw = [0x01, 0x01, 0x00, 0x00, 0x00, 0xff];
        let response = RawAuthenticationResponse::from_bytes(&raw).unwrap();
        assert_eq!(response.counter(), 0x0100_0000);
    }

    #[test]
    fn user_presence_requires_bit_zero() {
        // bit 1 set, bit 0 clear
        let raw = [0x02, 0x00, 0x00, 0x00, 0x01, 0xaa];
        let response = RawAuthenticationResponse::from_bytes(&raw).unwrap();
        assert!(matches!(
            response.check_user_presence(),
            Err(U2fError::UserNotPresent)
        ));
    }

    #[test]
    fn rejects_truncated_payload() {
        assert!(RawAuthenticationResponse::from_bytes(&[0x01, 0x00]).is_err());
        // header only, no signature bytes
        assert!(RawAuthenticationResponse::from_bytes(&[0x01, 0, 0, 0, 1]).is_err());
    }
}
