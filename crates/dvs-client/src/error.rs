//! Error types for DVSPortal client operations

use thiserror::Error;

/// Result type alias for portal client operations
pub type Result<T> = std::result::Result<T, PortalError>;

/// Errors that can occur while talking to the DVSPortal API
#[derive(Error, Debug)]
pub enum PortalError {
    /// Request did not complete within the configured timeout
    #[error("Request to DVSPortal timed out")]
    Timeout,

    /// DNS, socket or other transport-level failure
    #[error("Error communicating with DVSPortal: {0}")]
    Connection(String),

    /// The portal rejected the credentials or the cached token
    #[error("DVSPortal authentication failed: {0}")]
    Auth(String),

    /// Any other error response: non-2xx status, vendor-flagged error
    /// payload, or a non-JSON body
    #[error("DVSPortal error {status}: {message}")]
    Server { status: u16, message: String },

    /// The account has no permit; the client needs exactly one
    #[error("No permit found on this account")]
    NoPermit,

    /// The account has more than one permit; the client needs exactly one
    #[error("More than one permit found on this account")]
    MultiplePermits,

    /// The permit carries no permit media to reserve against
    #[error("Permit has no permit media")]
    NoPermitMedia,

    /// Response did not match the expected shape
    #[error("Failed to parse DVSPortal response: {0}")]
    Parse(String),

    /// Invalid host or base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error (test harness socket setup)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PortalError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Whether a retry on the next poll cycle could plausibly succeed.
    ///
    /// Timeouts and transport failures are transient; auth, server and
    /// invariant failures need outside intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}
