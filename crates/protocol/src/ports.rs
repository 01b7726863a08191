//! Port traits implemented by infrastructure crates.
//!
//! The client only talks to the network through [`Transport`] (posting an
//! envelope) and [`DescriptionFetcher`] (retrieving a service description).
//! [`DumpLogger`] is an optional sink for the raw bytes of each exchange.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::RetryPolicy;
use crate::wsdl::DescriptionError;

/// `Content-Type` sent with every envelope.
pub const SOAP_CONTENT_TYPE: &str = "text/xml;charset=UTF-8";

/// `Accept` sent with every envelope.
pub const ACCEPT_TYPE: &str = "text/xml";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns credentials only when both parts are non-empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Option<Self> {
        let username = username.into();
        let password = password.into();
        (!username.is_empty() && !password.is_empty()).then_some(Self { username, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One envelope to post.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Endpoint address.
    pub url: String,
    /// Serialized envelope.
    pub payload: Vec<u8>,
    /// Value for the `SOAPAction` header. `None` omits the header.
    pub soap_action: Option<String>,
    pub credentials: Option<Credentials>,
}

/// Errors raised by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The endpoint address is not a usable URL.
    #[error("invalid endpoint url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be sent or the response body could not be read.
    #[error("request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    /// The endpoint answered with a status outside 200..=399.
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The call did not complete within its deadline.
    #[error("call timed out")]
    Timeout,
}

impl TransportError {
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Timeout | Self::Request { .. } => RetryPolicy::Retryable { after: None },
            Self::Status { status } if *status == 429 || *status >= 500 => {
                RetryPolicy::Retryable { after: None }
            }
            _ => RetryPolicy::NonRetryable,
        }
    }
}

/// Posts serialized envelopes.
///
/// Implementations set `Content-Type` to [`SOAP_CONTENT_TYPE`], `Accept` to
/// [`ACCEPT_TYPE`], `SOAPAction` when the request carries one, and basic
/// authentication when it carries credentials. A status outside 200..=399 is
/// an error; the body of a successful response is returned as-is.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Vec<u8>, TransportError>;
}

// ---------------------------------------------------------------------------
// Description fetching
// ---------------------------------------------------------------------------

/// Retrieves the raw bytes of a service description.
#[async_trait]
pub trait DescriptionFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, DescriptionError>;
}

// ---------------------------------------------------------------------------
// Dumps
// ---------------------------------------------------------------------------

/// Receives the raw request and response bytes of every call when dumping is
/// enabled.
pub trait DumpLogger: Send + Sync {
    fn log_request(&self, operation: &str, dump: &[u8]);
    fn log_response(&self, operation: &str, dump: &[u8]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_both_parts() {
        assert!(Credentials::new("user", "").is_none());
        assert!(Credentials::new("", "pass").is_none());
        assert!(Credentials::new("user", "pass").is_some());
    }

    #[test]
    fn credentials_debug_hides_the_password() {
        let credentials = Credentials::new("user", "s3cret").expect("both parts set");
        let printed = format!("{credentials:?}");
        assert!(printed.contains("user"));
        assert!(!printed.contains("s3cret"));
    }

    #[test]
    fn server_side_statuses_are_retryable() {
        let retryable = RetryPolicy::Retryable { after: None };
        assert_eq!(TransportError::Status { status: 503 }.retry_policy(), retryable);
        assert_eq!(TransportError::Status { status: 429 }.retry_policy(), retryable);
        assert_eq!(
            TransportError::Status { status: 404 }.retry_policy(),
            RetryPolicy::NonRetryable
        );
        assert_eq!(
            TransportError::InvalidUrl {
                url: "nope".into(),
                reason: "relative URL without a base".into(),
            }
            .retry_policy(),
            RetryPolicy::NonRetryable
        );
    }
}
