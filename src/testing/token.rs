//! Software security token
//!
//! Emits the same raw byte layouts a hardware U2F token produces, signed
//! with freshly generated P-256 keys. The attestation certificate is a
//! minimal self-signed X.509 structure carrying the attestation public key
//! in its `SubjectPublicKeyInfo`; ceremony verification only reads that
//! key, so nothing more elaborate is needed.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::service::{AUTHENTICATE_TYPE, REGISTER_TYPE};
use crate::types::{
    AuthenticateResponse, RegisterResponse, StartedAuthentication, StartedRegistration,
};

use super::{client_data_json, encode};

// DER object identifiers, pre-encoded with their tag and length
const OID_EC_PUBLIC_KEY: &[u8] = &[0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
const OID_PRIME256V1: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
const OID_ECDSA_WITH_SHA256: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];

/// A software U2F token holding one credential
pub struct SoftToken {
    attestation_key: SigningKey,
    attestation_certificate: Vec<u8>,
    credential_key: SigningKey,
    key_handle: Vec<u8>,
    counter: u32,
}

impl SoftToken {
    /// Token with random attestation and credential keys and a random
    /// 32-byte key handle
    #[must_use]
    pub fn new() -> Self {
        let attestation_key = SigningKey::random(&mut OsRng);
        let attestation_certificate = build_attestation_certificate(&attestation_key);
        let mut key_handle = vec![0u8; 32];
        OsRng.fill_bytes(&mut key_handle);
        Self {
            attestation_key,
            attestation_certificate,
            credential_key: SigningKey::random(&mut OsRng),
            key_handle,
            counter: 0,
        }
    }

    /// The credential's public key as a 65-byte uncompressed point
    #[must_use]
    pub fn public_key(&self) -> Vec<u8> {
        self.credential_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// The credential's key handle
    #[must_use]
    pub fn key_handle(&self) -> &[u8] {
        &self.key_handle
    }

    /// The DER attestation certificate this token presents
    #[must_use]
    pub fn attestation_certificate(&self) -> &[u8] {
        &self.attestation_certificate
    }

    /// Force the internal counter, for replay and wraparound tests
    pub fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    /// Answer a registration ceremony
    ///
    /// Produces the client data envelope for `origin` and the raw
    /// registration payload signed by the attestation key.
    #[must_use]
    pub fn register(&self, started: &StartedRegistration, origin: &str) -> RegisterResponse {
        let client_data = client_data_json(REGISTER_TYPE, &started.challenge, origin);
        RegisterResponse {
            registration_data: encode(&self.registration_payload(
                &started.app_id,
                client_data.as_bytes(),
            )),
            client_data: encode(client_data.as_bytes()),
        }
    }

    /// Answer an authentication ceremony, incrementing the token counter
    #[must_use]
    pub fn authenticate(
        &mut self,
        started: &StartedAuthentication,
        origin: &str,
        user_present: bool,
    ) -> AuthenticateResponse {
        self.counter += 1;
        let client_data = client_data_json(AUTHENTICATE_TYPE, &started.challenge, origin);
        let presence = u8::from(user_present);
        AuthenticateResponse {
            signature_data: encode(&self.authentication_payload(
                &started.app_id,
                client_data.as_bytes(),
                presence,
            )),
            client_data: encode(client_data.as_bytes()),
            key_handle: encode(&self.key_handle),
        }
    }

    /// Raw registration payload for arbitrary client data bytes
    #[must_use]
    pub fn registration_payload(&self, app_id: &str, client_data: &[u8]) -> Vec<u8> {
        let public_key = self.public_key();

        let mut signed = vec![0x00];
        signed.extend_from_slice(&sha256(app_id.as_bytes()));
        signed.extend_from_slice(&sha256(client_data));
        signed.extend_from_slice(&self.key_handle);
        signed.extend_from_slice(&public_key);
        let signature: Signature = self.attestation_key.sign(&signed);

        let mut payload = vec![0x05];
        payload.extend_from_slice(&public_key);
        payload.push(u8::try_from(self.key_handle.len()).expect("key handle fits in one byte"));
        payload.extend_from_slice(&self.key_handle);
        payload.extend_from_slice(&self.attestation_certificate);
        payload.extend_from_slice(signature.to_der().as_bytes());
        payload
    }

    /// Raw authentication payload for arbitrary client data bytes, using
    /// the current counter value
    #[must_use]
    pub fn authentication_payload(
        &self,
        app_id: &str,
        client_data: &[u8],
        user_presence: u8,
    ) -> Vec<u8> {
        let mut signed = Vec::with_capacity(32 + 1 + 4 + 32);
        signed.extend_from_slice(&sha256(app_id.as_bytes()));
        signed.push(user_presence);
        signed.extend_from_slice(&self.counter.to_be_bytes());
        signed.extend_from_slice(&sha256(client_data));
        let signature: Signature = self.credential_key.sign(&signed);

        let mut payload = vec![user_presence];
        payload.extend_from_slice(&self.counter.to_be_bytes());
        payload.extend_from_slice(signature.to_der().as_bytes());
        payload
    }
}

impl Default for SoftToken {
    fn default() -> Self {
        Self::new()
    }
}

fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Prepend a DER tag-length header to `content`
fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(u8::try_from(len).expect("short form"));
    } else if len <= 0xff {
        out.push(0x81);
        out.push(u8::try_from(len).expect("one length octet"));
    } else {
        let len = u16::try_from(len).expect("certificate under 64 KiB");
        out.push(0x82);
        out.extend_from_slice(&len.to_be_bytes());
    }
    out.extend_from_slice(content);
    out
}

fn bit_string(content: &[u8]) -> Vec<u8> {
    let mut padded = vec![0x00]; // no unused bits
    padded.extend_from_slice(content);
    tlv(0x03, &padded)
}

/// Minimal self-signed X.509 v3 certificate over the attestation key
fn build_attestation_certificate(key: &SigningKey) -> Vec<u8> {
    let public_key = key.verifying_key().to_encoded_point(false);

    let algorithm = tlv(0x30, OID_ECDSA_WITH_SHA256);
    let spki_algorithm = tlv(0x30, &[OID_EC_PUBLIC_KEY, OID_PRIME256V1].concat());
    let spki = tlv(
        0x30,
        &[spki_algorithm, bit_string(public_key.as_bytes())].concat(),
    );

    let version = tlv(0xa0, &tlv(0x02, &[0x02])); // EXPLICIT [0] version v3
    let serial = tlv(0x02, &[0x01]);
    let empty_name = tlv(0x30, &[]);
    let validity = tlv(
        0x30,
        &[
            tlv(0x17, b"250101000000Z"),
            tlv(0x17, b"350101000000Z"),
        ]
        .concat(),
    );

    let tbs = tlv(
        0x30,
        &[
            version,
            serial,
            algorithm.clone(),
            empty_name.clone(),
            validity,
            empty_name,
            spki,
        ]
        .concat(),
    );

    let signature: Signature = key.sign(&tbs);
    tlv(
        0x30,
        &[
            tbs,
            algorithm,
            bit_string(signature.to_der().as_bytes()),
        ]
        .concat(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der;

    #[test]
    fn certificate_is_self_delimiting_and_carries_the_key() {
        let token = SoftToken::new();
        let cert = token.attestation_certificate();

        assert_eq!(der::element_length(cert).unwrap(), cert.len());

        let embedded = der::certificate_public_key(cert).unwrap();
        let expected = token
            .attestation_key
            .verifying_key()
            .to_encoded_point(false);
        assert_eq!(&embedded[..], expected.as_bytes());
    }

    #[test]
    fn registration_payload_has_the_fixed_layout() {
        let token = SoftToken::new();
        let payload = token.registration_payload("https://example.com", b"{}");

        assert_eq!(payload[0], 0x05);
        assert_eq!(payload[1], 0x04);
        assert_eq!(usize::from(payload[66]), token.key_handle().len());
    }
}
