#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Server-side U2F (CTAP1) protocol core
//!
//! This crate drives the registration and authentication ceremonies a
//! relying party runs against a physical security token: challenge
//! issuance, client data validation, binary response parsing, signature
//! verification over the protocol's signed-bytes structures, and
//! counter-based replay protection.
//!
//! Storage and transport stay with the caller: the `Started*` records and
//! the [`DeviceRegistration`] are plain serializable values to persist
//! between calls, and every operation is synchronous bounded CPU work.
//!
//! ```
//! use u2f_core::U2fService;
//!
//! let service = U2fService::new();
//! let started = service.start_registration("https://example.com");
//! // send `started` to the client, persist it, then pass the client's
//! // response to `service.finish_registration(...)`
//! ```

/// Version of the u2f-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod authenticate;
pub mod client_data;
pub mod crypto;
pub mod der;
pub mod errors;
pub mod register;
pub mod service;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use authenticate::RawAuthenticationResponse;
pub use client_data::ClientData;
pub use crypto::{ChallengeGenerator, CryptoVerifier, OsChallengeGenerator, P256Verifier};
pub use errors::U2fError;
pub use register::RawRegistrationResponse;
pub use service::{U2fService, AUTHENTICATE_TYPE, REGISTER_TYPE, U2F_VERSION};
pub use types::{
    AuthenticateResponse, DeviceRegistration, RegisterResponse, StartedAuthentication,
    StartedRegistration,
};
