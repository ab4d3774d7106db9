//! U2F ceremony orchestration
//!
//! `U2fService` composes the capability traits with the parsing and
//! verification modules into the four relying-party operations. The service
//! itself is stateless: the caller persists the `Started*` record between
//! the start and finish halves of a ceremony and owns the
//! `DeviceRegistration` across its lifetime, including expiring stale
//! ceremonies by its own TTL. Every finish operation fails fast on the
//! first violated check and commits nothing on failure.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::debug;

use crate::authenticate::RawAuthenticationResponse;
use crate::client_data::ClientData;
use crate::crypto::{ChallengeGenerator, CryptoVerifier, OsChallengeGenerator, P256Verifier};
use crate::errors::U2fError;
use crate::register::RawRegistrationResponse;
use crate::types::{
    AuthenticateResponse, DeviceRegistration, RegisterResponse, StartedAuthentication,
    StartedRegistration,
};

/// Protocol version reported to clients
pub const U2F_VERSION: &str = "U2F_V2";
/// Client data type token for registration ceremonies
pub const REGISTER_TYPE: &str = "navigator.id.finishEnrollment";
/// Client data type token for authentication ceremonies
pub const AUTHENTICATE_TYPE: &str = "navigator.id.getAssertion";

/// U2F relying-party service
///
/// Generic over its challenge source and signature verifier so tests can
/// inject deterministic doubles; `new` wires up the OS RNG and ECDSA P-256.
pub struct U2fService<G = OsChallengeGenerator, V = P256Verifier> {
    challenge_generator: G,
    verifier: V,
}

impl U2fService {
    /// Service with production capabilities: OS RNG and P-256 verification
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(OsChallengeGenerator, P256Verifier)
    }
}

impl Default for U2fService {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: ChallengeGenerator, V: CryptoVerifier> U2fService<G, V> {
    /// Service with caller-supplied capabilities
    #[must_use]
    pub fn with_capabilities(challenge_generator: G, verifier: V) -> Self {
        Self {
            challenge_generator,
            verifier,
        }
    }

    /// Begin a registration ceremony for `app_id`
    ///
    /// The returned record goes to the client and must be kept by the
    /// caller for the matching `finish_registration`.
    #[must_use]
    pub fn start_registration(&self, app_id: &str) -> StartedRegistration {
        let challenge = self.challenge_generator.generate_challenge();
        debug!("starting registration for app {app_id}");
        StartedRegistration {
            version: U2F_VERSION.to_string(),
            challenge: URL_SAFE_NO_PAD.encode(challenge),
            app_id: app_id.to_string(),
        }
    }

    /// Finish a registration ceremony, producing the device record to
    /// persist
    ///
    /// Checks run in order: client data type, challenge, facet allow-list,
    /// then payload layout and attestation signature.
    ///
    /// # Errors
    /// Returns the first violated check: `MalformedClientData`,
    /// `TypeMismatch`, `ChallengeMismatch`, `UntrustedFacet`,
    /// `MalformedResponse`, or `InvalidSignature`.
    pub fn finish_registration(
        &self,
        started: &StartedRegistration,
        response: &RegisterResponse,
        facets: Option<&HashSet<String>>,
    ) -> Result<DeviceRegistration, U2fError> {
        let client_data = ClientData::from_base64(&response.client_data)?;
        client_data.check_content(REGISTER_TYPE, &started.challenge, facets)?;

        let raw = RawRegistrationResponse::from_base64(&response.registration_data)?;
        raw.check_signature(&started.app_id, client_data.as_bytes(), &self.verifier)?;

        debug!("registration finished for app {}", started.app_id);
        Ok(raw.create_device())
    }

    /// Begin an authentication ceremony for a registered device
    ///
    /// Issues a fresh challenge bound to the device's key handle.
    #[must_use]
    pub fn start_authentication(
        &self,
        app_id: &str,
        device: &DeviceRegistration,
    ) -> StartedAuthentication {
        let challenge = self.challenge_generator.generate_challenge();
        debug!("starting authentication for app {app_id}");
        StartedAuthentication {
            version: U2F_VERSION.to_string(),
            challenge: URL_SAFE_NO_PAD.encode(challenge),
            app_id: app_id.to_string(),
            key_handle: device.key_handle_base64(),
        }
    }

    /// Finish an authentication ceremony
    ///
    /// Checks run in order: client data type, challenge, facet allow-list,
    /// payload layout, credential signature, user presence, counter. On
    /// success the device's counter is set to the response's counter; that
    /// is the only mutation, and it happens after every other check.
    ///
    /// # Errors
    /// Returns the first violated check: `MalformedClientData`,
    /// `TypeMismatch`, `ChallengeMismatch`, `UntrustedFacet`,
    /// `MalformedResponse`, `InvalidSignature`, `UserNotPresent`, or
    /// `ReplayedCounter`.
    pub fn finish_authentication(
        &self,
        started: &StartedAuthentication,
        response: &AuthenticateResponse,
        device: &mut DeviceRegistration,
        facets: Option<&HashSet<String>>,
    ) -> Result<(), U2fError> {
        let client_data = ClientData::from_base64(&response.client_data)?;
        client_data.check_content(AUTHENTICATE_TYPE, &started.challenge, facets)?;

        let raw = RawAuthenticationResponse::from_base64(&response.signature_data)?;
        raw.check_signature(
            &started.app_id,
            client_data.as_bytes(),
            &device.public_key,
            &self.verifier,
        )?;
        raw.check_user_presence()?;

        device.check_and_update_counter(raw.counter())?;
        debug!(
            "authentication finished for app {}, counter {}",
            started.app_id,
            raw.counter()
        );
        Ok(())
    }
}
