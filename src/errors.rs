//! U2F protocol error types
//!
//! Every check in a ceremony surfaces as its own named failure so callers
//! can log and audit the specific security reason. Nothing here is retried
//! internally; a failed cryptographic check is terminal.

use std::fmt;

/// Errors that can occur while finishing a registration or authentication
/// ceremony
#[derive(Debug)]
pub enum U2fError {
    /// Client data envelope does not decode or is missing required fields
    MalformedClientData(String),

    /// Binary token response does not match the fixed U2F layout
    MalformedResponse(String),

    /// Client data `typ` does not match the ceremony being finished
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// Client data challenge does not equal the one issued at start time
    ChallengeMismatch,

    /// Client data origin is not in the caller-supplied facet allow-list
    UntrustedFacet(String),

    /// Signature verification over the reconstructed signed bytes failed
    InvalidSignature,

    /// Authenticator did not assert user presence
    UserNotPresent,

    /// Response counter is not strictly greater than the stored counter
    ReplayedCounter { stored: u32, received: u32 },
}

impl fmt::Display for U2fError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedClientData(msg) => write!(f, "Malformed client data: {msg}"),
            Self::MalformedResponse(msg) => write!(f, "Malformed token response: {msg}"),
            Self::TypeMismatch { expected, actual } => {
                write!(f, "Client data type mismatch: expected '{expected}', got '{actual}'")
            }
            Self::ChallengeMismatch => write!(f, "Client data challenge does not match"),
            Self::UntrustedFacet(origin) => {
                write!(f, "Origin '{origin}' is not a trusted facet")
            }
            Self::InvalidSignature => write!(f, "Signature verification failed"),
            Self::UserNotPresent => write!(f, "User presence was not asserted"),
            Self::ReplayedCounter { stored, received } => {
                write!(
                    f,
                    "Counter {received} is not greater than stored counter {stored}"
                )
            }
        }
    }
}

impl std::error::Error for U2fError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_specific_failure() {
        let err = U2fError::ReplayedCounter {
            stored: 7,
            received: 7,
        };
        assert_eq!(
            err.to_string(),
            "Counter 7 is not greater than stored counter 7"
        );

        let err = U2fError::TypeMismatch {
            expected: "navigator.id.getAssertion",
            actual: "navigator.id.finishEnrollment".to_string(),
        };
        assert!(err.to_string().contains("navigator.id.getAssertion"));
    }
}
