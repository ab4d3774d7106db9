//! U2F protocol messages and the registered-device record
//!
//! These are the types callers persist and relay: the `Started*` records go
//! out to the client and come back at finish time, the `*Response` types are
//! the client's answers, and `DeviceRegistration` is the long-lived record
//! the relying party stores per token. Field names serialize to the
//! camelCase keys the U2F JavaScript API expects.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::U2fError;

/// Serde adapter encoding byte fields as base64url-without-padding strings
mod b64url {
    use super::{Engine, URL_SAFE_NO_PAD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(&encoded)
            .map_err(serde::de::Error::custom)
    }
}

/// In-flight registration ceremony, issued by `start_registration`
///
/// Sent to the client and held by the caller until the matching
/// `finish_registration` consumes it. Single-use.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StartedRegistration {
    /// Protocol version token, always `"U2F_V2"`
    pub version: String,
    /// Base64url-encoded challenge
    pub challenge: String,
    #[serde(rename = "appId")]
    pub app_id: String,
}

/// Registration answer from the token/client
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegisterResponse {
    /// Base64url-encoded binary registration payload
    #[serde(rename = "registrationData")]
    pub registration_data: String,
    /// Base64url-encoded client data JSON envelope
    #[serde(rename = "clientData")]
    pub client_data: String,
}

/// In-flight authentication ceremony, issued by `start_authentication`
///
/// Paired to exactly one `DeviceRegistration` through its key handle.
/// Single-use.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StartedAuthentication {
    /// Protocol version token, always `"U2F_V2"`
    pub version: String,
    /// Base64url-encoded challenge
    pub challenge: String,
    #[serde(rename = "appId")]
    pub app_id: String,
    /// Base64url-encoded key handle selecting the credential
    #[serde(rename = "keyHandle")]
    pub key_handle: String,
}

/// Authentication answer from the token/client
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticateResponse {
    /// Base64url-encoded binary signature payload
    #[serde(rename = "signatureData")]
    pub signature_data: String,
    /// Base64url-encoded client data JSON envelope
    #[serde(rename = "clientData")]
    pub client_data: String,
    /// Key handle echoed by the client; informational, the caller already
    /// selected the device record
    #[serde(rename = "keyHandle")]
    pub key_handle: String,
}

/// A registered token, persisted by the caller across ceremonies
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeviceRegistration {
    /// 65-byte uncompressed EC public key of the credential
    #[serde(rename = "publicKey", with = "b64url")]
    pub public_key: Vec<u8>,
    /// Opaque token-issued credential identifier
    #[serde(rename = "keyHandle", with = "b64url")]
    pub key_handle: Vec<u8>,
    /// Raw X.509 attestation certificate, kept for caller-side trust checks
    #[serde(rename = "attestationCert", with = "b64url")]
    pub attestation_certificate: Vec<u8>,
    /// Last accepted signature counter
    pub counter: u32,
}

impl DeviceRegistration {
    /// Accept `new_counter` if it is strictly greater than the stored value
    /// and record it
    ///
    /// This is the sole mutation in an authentication ceremony and runs only
    /// after every cryptographic check has passed. Callers racing on the
    /// same record must serialize access themselves.
    ///
    /// # Errors
    /// Returns `ReplayedCounter` if `new_counter <= self.counter`; the
    /// stored value is left untouched.
    pub fn check_and_update_counter(&mut self, new_counter: u32) -> Result<(), U2fError> {
        if new_counter <= self.counter {
            return Err(U2fError::ReplayedCounter {
                stored: self.counter,
                received: new_counter,
            });
        }
        self.counter = new_counter;
        Ok(())
    }

    /// Key handle in its transport encoding
    #[must_use]
    pub fn key_handle_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.key_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceRegistration {
        DeviceRegistration {
            public_key: vec![0x04; 65],
            key_handle: vec![0xab, 0xcd, 0xef],
            attestation_certificate: vec![0x30, 0x00],
            counter: 10,
        }
    }

    #[test]
    fn counter_must_strictly_increase() {
        let mut device = device();
        assert!(matches!(
            device.check_and_update_counter(10),
            Err(U2fError::ReplayedCounter {
                stored: 10,
                received: 10
            })
        ));
        assert!(matches!(
            device.check_and_update_counter(9),
            Err(U2fError::ReplayedCounter { .. })
        ));
        assert_eq!(device.counter, 10);

        device.check_and_update_counter(11).unwrap();
        assert_eq!(device.counter, 11);
    }

    #[test]
    fn device_round_trips_through_json() {
        let device = device();
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"publicKey\""));
        assert!(json.contains("\"keyHandle\""));

        let decoded: DeviceRegistration = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.public_key, device.public_key);
        assert_eq!(decoded.key_handle, device.key_handle);
        assert_eq!(decoded.attestation_certificate, device.attestation_certificate);
        assert_eq!(decoded.counter, device.counter);
    }

    #[test]
    fn started_registration_serializes_wire_names() {
        let started = StartedRegistration {
            version: "U2F_V2".to_string(),
            challenge: "abc".to_string(),
            app_id: "https://example.com".to_string(),
        };
        let json = serde_json::to_string(&started).unwrap();
        assert!(json.contains("\"appId\":\"https://example.com\""));
        assert!(json.contains("\"version\":\"U2F_V2\""));
    }
}
