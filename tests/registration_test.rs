//! Registration ceremony integration tests
//!
//! Run with `cargo test --features testing`.

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use u2f_core::testing::{client_data_json, encode, SoftToken, TEST_APP_ID, TEST_ORIGIN};
use u2f_core::{RegisterResponse, U2fError, U2fService, REGISTER_TYPE};

#[test]
fn full_registration_ceremony_produces_a_device_with_zero_counter() {
    let service = U2fService::new();
    let token = SoftToken::new();

    let started = service.start_registration(TEST_APP_ID);
    assert_eq!(started.version, "U2F_V2");

    let response = token.register(&started, TEST_ORIGIN);
    let device = service
        .finish_registration(&started, &response, None)
        .unwrap();

    assert_eq!(device.counter, 0);
    assert_eq!(device.public_key, token.public_key());
    assert_eq!(device.key_handle, token.key_handle());
    assert_eq!(device.attestation_certificate, token.attestation_certificate());
}

#[test]
fn registration_respects_the_facet_allow_list() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    let response = token.register(&started, TEST_ORIGIN);

    let trusted: HashSet<String> = [TEST_ORIGIN.to_string()].into();
    assert!(service
        .finish_registration(&started, &response, Some(&trusted))
        .is_ok());

    let other: HashSet<String> = ["https://evil.example".to_string()].into();
    assert!(matches!(
        service.finish_registration(&started, &response, Some(&other)),
        Err(U2fError::UntrustedFacet(origin)) if origin == TEST_ORIGIN
    ));
}

#[test]
fn registration_with_untrusted_origin_fails_despite_valid_signature() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    // token signs over an origin outside the allow-list
    let response = token.register(&started, "https://phish.example");

    let trusted: HashSet<String> = [TEST_ORIGIN.to_string()].into();
    assert!(matches!(
        service.finish_registration(&started, &response, Some(&trusted)),
        Err(U2fError::UntrustedFacet(_))
    ));
}

#[test]
fn stale_challenge_is_rejected() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    let other_started = service.start_registration(TEST_APP_ID);

    // client answers the wrong ceremony
    let response = token.register(&other_started, TEST_ORIGIN);
    assert!(matches!(
        service.finish_registration(&started, &response, None),
        Err(U2fError::ChallengeMismatch)
    ));
}

#[test]
fn authentication_type_token_is_rejected_at_registration() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);

    let client_data = client_data_json(
        "navigator.id.getAssertion",
        &started.challenge,
        TEST_ORIGIN,
    );
    let response = RegisterResponse {
        registration_data: encode(
            &token.registration_payload(&started.app_id, client_data.as_bytes()),
        ),
        client_data: encode(client_data.as_bytes()),
    };

    assert!(matches!(
        service.finish_registration(&started, &response, None),
        Err(U2fError::TypeMismatch { expected, .. }) if expected == REGISTER_TYPE
    ));
}

#[test]
fn any_flipped_payload_byte_invalidates_the_signature() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    let response = token.register(&started, TEST_ORIGIN);

    let mut payload = URL_SAFE_NO_PAD.decode(&response.registration_data).unwrap();

    // flip one byte in each signed region: public key, key handle
    for index in [10, 70] {
        payload[index] ^= 0x01;
        let tampered = RegisterResponse {
            registration_data: URL_SAFE_NO_PAD.encode(&payload),
            client_data: response.client_data.clone(),
        };
        assert!(
            matches!(
                service.finish_registration(&started, &tampered, None),
                Err(U2fError::InvalidSignature) | Err(U2fError::MalformedResponse(_))
            ),
            "byte {index} flip must not verify"
        );
        payload[index] ^= 0x01;
    }

    // untampered payload still verifies after the loop restored it
    let intact = RegisterResponse {
        registration_data: URL_SAFE_NO_PAD.encode(&payload),
        client_data: response.client_data,
    };
    assert!(service.finish_registration(&started, &intact, None).is_ok());
}

#[test]
fn truncated_registration_payload_is_malformed() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    let response = token.register(&started, TEST_ORIGIN);

    let payload = URL_SAFE_NO_PAD.decode(&response.registration_data).unwrap();
    let truncated = RegisterResponse {
        registration_data: URL_SAFE_NO_PAD.encode(&payload[..40]),
        client_data: response.client_data,
    };
    assert!(matches!(
        service.finish_registration(&started, &truncated, None),
        Err(U2fError::MalformedResponse(_))
    ));
}

#[test]
fn device_record_round_trips_key_material_through_serialization() {
    let service = U2fService::new();
    let token = SoftToken::new();
    let started = service.start_registration(TEST_APP_ID);
    let response = token.register(&started, TEST_ORIGIN);
    let device = service
        .finish_registration(&started, &response, None)
        .unwrap();

    let json = serde_json::to_string(&device).unwrap();
    let restored: u2f_core::DeviceRegistration = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.public_key, device.public_key);
    assert_eq!(restored.key_handle, device.key_handle);
    assert_eq!(restored.counter, device.counter);
}
