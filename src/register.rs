//! Binary registration response parsing and verification
//!
//! Fixed layout of the raw registration payload:
//!
//! ```text
//! [0x05][public key: 65 bytes][kh length: 1 byte][key handle]
//! [attestation certificate: DER, self-delimiting][signature: remaining]
//! ```
//!
//! The attestation signature covers
//! `0x00 || sha256(app_id) || sha256(client_data) || key_handle || public_key`
//! and verifies against the key embedded in the attestation certificate.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;

use crate::crypto::CryptoVerifier;
use crate::der::{self, ByteCursor, EC_POINT_LENGTH, UNCOMPRESSED_POINT};
use crate::errors::U2fError;
use crate::types::DeviceRegistration;

/// Reserved first byte of a version 2 registration payload
const REGISTRATION_RESERVED_BYTE: u8 = 0x05;
/// Reserved first byte of the registration signed-bytes structure
const SIGNED_BYTES_RESERVED_BYTE: u8 = 0x00;

/// Parsed raw registration payload
pub struct RawRegistrationResponse {
    user_public_key: [u8; EC_POINT_LENGTH],
    key_handle: Vec<u8>,
    attestation_certificate: Vec<u8>,
    attestation_public_key: [u8; EC_POINT_LENGTH],
    signature: Vec<u8>,
}

impl RawRegistrationResponse {
    /// Decode and parse a base64url-encoded registration payload
    ///
    /// # Errors
    /// Returns `MalformedResponse` if the encoding or the binary layout is
    /// invalid, including an unparseable attestation certificate.
    pub fn from_base64(encoded: &str) -> Result<Self, U2fError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| U2fError::MalformedResponse("invalid base64 encoding".into()))?;
        Self::from_bytes(&raw)
    }

    /// Parse a decoded registration payload
    ///
    /// # Errors
    /// Returns `MalformedResponse` if the binary layout is invalid.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, U2fError> {
        let mut cursor = ByteCursor::new(raw);

        let reserved = cursor.read_u8()?;
        if reserved != REGISTRATION_RESERVED_BYTE {
            return Err(U2fError::MalformedResponse(format!(
                "reserved byte is 0x{reserved:02x}, expected 0x{REGISTRATION_RESERVED_BYTE:02x}"
            )));
        }

        let mut user_public_key = [0u8; EC_POINT_LENGTH];
        user_public_key.copy_from_slice(cursor.read_bytes(EC_POINT_LENGTH)?);
        if user_public_key[0] != UNCOMPRESSED_POINT {
            return Err(U2fError::MalformedResponse(
                "public key is not in uncompressed point format".into(),
            ));
        }

        let key_handle_length = usize::from(cursor.read_u8()?);
        let key_handle = cursor.read_bytes(key_handle_length)?.to_vec();

        // the certificate is self-delimiting; its DER header tells us where
        // the trailing signature begins
        let rest = cursor.read_rest();
        let certificate_length = der::element_length(rest)?;
        let attestation_certificate = rest[..certificate_length].to_vec();
        let signature = rest[certificate_length..].to_vec();
        if signature.is_empty() {
            return Err(U2fError::MalformedResponse(
                "registration payload has no signature".into(),
            ));
        }

        let attestation_public_key = der::certificate_public_key(&attestation_certificate)?;

        Ok(Self {
            user_public_key,
            key_handle,
            attestation_certificate,
            attestation_public_key,
            signature,
        })
    }

    /// Verify the attestation signature for this registration
    ///
    /// `client_data` must be the canonical client data bytes, exactly as the
    /// client produced them.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if verification fails.
    pub fn check_signature(
        &self,
        app_id: &str,
        client_data: &[u8],
        verifier: &dyn CryptoVerifier,
    ) -> Result<(), U2fError> {
        let signed_bytes = self.signed_bytes(app_id, client_data, verifier);
        if verifier.verify(&self.attestation_public_key, &signed_bytes, &self.signature) {
            debug!(
                "registration signature verified for key handle of {} bytes",
                self.key_handle.len()
            );
            Ok(())
        } else {
            Err(U2fError::InvalidSignature)
        }
    }

    /// Build a device record for this registration; call only after
    /// `check_signature` has succeeded
    #[must_use]
    pub fn create_device(self) -> DeviceRegistration {
        DeviceRegistration {
            public_key: self.user_public_key.to_vec(),
            key_handle: self.key_handle,
            attestation_certificate: self.attestation_certificate,
            counter: 0,
        }
    }

    fn signed_bytes(&self, app_id: &str, client_data: &[u8], verifier: &dyn CryptoVerifier) -> Vec<u8> {
        let app_id_hash = verifier.sha256(app_id.as_bytes());
        let client_data_hash = verifier.sha256(client_data);

        let mut signed = Vec::with_capacity(1 + 32 + 32 + self.key_handle.len() + EC_POINT_LENGTH);
        signed.push(SIGNED_BYTES_RESERVED_BYTE);
        signed.extend_from_slice(&app_id_hash);
        signed.extend_from_slice(&client_data_hash);
        signed.extend_from_slice(&self.key_handle);
        signed.extend_from_slice(&self.user_public_key);
        signed
    }

    /// Credential public key parsed from the payload
    #[must_use]
    pub fn user_public_key(&self) -> &[u8] {
        &self.user_public_key
    }

    /// Key handle parsed from the payload
    #[must_use]
    pub fn key_handle(&self) -> &[u8] {
        &self.key_handle
    }

    /// Raw attestation certificate bytes
    #[must_use]
    pub fn attestation_certificate(&self) -> &[u8] {
        &self.attestation_certificate
    }
}
