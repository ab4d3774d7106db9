//! Testing utilities for U2F ceremonies
//!
//! Gated behind the `testing` cargo feature (and available to unit tests).
//! The centerpiece is [`SoftToken`], a software security token that emits
//! layout-exact registration and authentication payloads signed with real
//! P-256 keys, so ceremony tests exercise the same verification paths a
//! hardware token would.

pub mod mock;
pub mod token;

pub use mock::{FixedChallengeGenerator, RejectAllVerifier};
pub use token::SoftToken;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Default test relying party
pub const TEST_APP_ID: &str = "https://example.com";

/// Default test origin, matching the app id
pub const TEST_ORIGIN: &str = "https://example.com";

/// Build a client data JSON envelope the way the U2F browser API does
#[must_use]
pub fn client_data_json(typ: &str, challenge: &str, origin: &str) -> String {
    format!(r#"{{"typ":"{typ}","challenge":"{challenge}","origin":"{origin}"}}"#)
}

/// Base64url-encode without padding, the transport encoding for all U2F
/// material
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
