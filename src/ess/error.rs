//! Error types for the ESS client.

use thiserror::Error;

use crate::fleet::FleetError;

/// Errors raised by the ESS client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EssError {
    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to build HTTP client: {message}")]
    Client {
        /// Message from the HTTP stack.
        message: String,
    },
    /// Raised when a request cannot be signed.
    #[error("failed to sign request: {message}")]
    Signing {
        /// Message from the MAC implementation.
        message: String,
    },
    /// Raised when the request never produced an HTTP response.
    #[error("{action} request failed: {message}")]
    Http {
        /// API action being called.
        action: &'static str,
        /// Transport error message.
        message: String,
    },
    /// Raised when the API answered with a non-success status.
    #[error("{action} returned HTTP {status} {code}: {message} (request {request_id})")]
    Api {
        /// API action being called.
        action: &'static str,
        /// HTTP status code.
        status: u16,
        /// Provider error code.
        code: String,
        /// Provider error message.
        message: String,
        /// Provider request id, for support tickets.
        request_id: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode {action} response: {message}")]
    Decode {
        /// API action being called.
        action: &'static str,
        /// Decoder error message.
        message: String,
    },
}

impl From<EssError> for FleetError {
    fn from(value: EssError) -> Self {
        Self::Remote {
            message: value.to_string(),
        }
    }
}
