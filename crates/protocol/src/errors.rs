//! Top-level error and retry-policy types for the SOAP client.
//!
//! [`SoapError`] is what every call returns. Its variants are the seven error
//! kinds a caller can branch on: the description being unavailable, a
//! description without any service, a malformed parameter, an envelope
//! configuration error, a transport failure, a remote fault, and a decode
//! failure. Component-level errors ([`crate::wsdl::DescriptionError`],
//! [`crate::response::ResponseError`], [`crate::ports::TransportError`]) are
//! defined in their respective modules and wrapped here.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::TransportError;
use crate::response::{Fault, ResponseError};
use crate::wsdl::DescriptionError;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transport timeouts, connection failures, 5xx and 429
///   responses.
/// - `NonRetryable` errors: faults, decode failures, malformed parameters,
///   envelope configuration errors, an unavailable description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried without changing something first.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Wire-building errors
// ---------------------------------------------------------------------------

/// Errors raised while turning parameters into envelope bytes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An element name was empty, or a value could not be serialized into
    /// parameter tokens.
    #[error("malformed parameter: {reason}")]
    MalformedParameter {
        /// What was wrong with the parameter.
        reason: String,
    },

    /// A close token did not match the innermost open element.
    #[error("unbalanced token stream: expected close of {expected:?}, found close of '{found}'")]
    UnbalancedTokens {
        /// Name of the innermost open element, `None` if nothing was open.
        expected: Option<String>,
        /// Name carried by the offending close token.
        found: String,
    },

    /// The token stream ended with an element still open.
    #[error("unbalanced token stream: element '{name}' is never closed")]
    UnclosedElement {
        /// Name of the element left open.
        name: String,
    },

    /// The operation name or its resolved namespace is empty.
    #[error("envelope configuration error: {message}")]
    EnvelopeConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The XML writer failed.
    #[error("failed to write envelope: {0}")]
    Write(String),
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedParameter {
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Call-level errors
// ---------------------------------------------------------------------------

/// Every way a SOAP call can fail.
///
/// Transport and decode errors carry the outgoing envelope (`payload`) so the
/// request can be inspected after the fact. Use [`SoapError::is_fault`] to
/// tell "the server rejected my call" apart from "the network or encoding
/// failed".
#[derive(Debug, Error)]
pub enum SoapError {
    /// The service description could not be fetched or parsed.
    ///
    /// Sticky: every call returns the same error until the client is
    /// re-pointed or a refresh succeeds.
    #[error("service description unavailable: {0}")]
    DescriptionUnavailable(Arc<DescriptionError>),

    /// The description parsed, but declares no service port with an address.
    #[error("no services found in service description")]
    NoServiceDefined,

    /// A parameter could not be encoded (empty element name, unbalanced raw
    /// fragment, unserializable value).
    #[error("malformed parameter: {reason}")]
    MalformedParameter {
        /// What was wrong with the parameter.
        reason: String,
    },

    /// The operation name or resolved body namespace is empty.
    #[error("envelope configuration error: {message}")]
    EnvelopeConfiguration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Sending the envelope failed or the endpoint answered with a
    /// non-success status.
    #[error("transport error: {source}")]
    Transport {
        /// Underlying transport failure.
        #[source]
        source: TransportError,
        /// Envelope bytes that were being sent.
        payload: Vec<u8>,
    },

    /// The endpoint answered with a SOAP fault.
    #[error("SOAP fault {fault}")]
    Fault {
        /// The fault returned by the endpoint.
        fault: Fault,
        /// Envelope bytes that provoked the fault.
        payload: Vec<u8>,
    },

    /// The response could not be unwrapped or bound to the caller's type.
    #[error("failed to decode response: {source}")]
    Decode {
        /// Underlying decode failure.
        #[source]
        source: ResponseError,
        /// Envelope bytes that were sent.
        payload: Vec<u8>,
    },
}

impl SoapError {
    /// Returns `true` when the remote end answered with a SOAP fault.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }

    /// Returns the fault carried by this error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault { fault, .. } => Some(fault),
            _ => None,
        }
    }

    /// Returns the outgoing envelope attached to this error, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Transport { payload, .. }
            | Self::Fault { payload, .. }
            | Self::Decode { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Attaches `payload` to a response decode failure.
    ///
    /// A [`ResponseError::Fault`] becomes [`SoapError::Fault`] so a fault is
    /// never reported as a decode error.
    pub fn from_response(source: ResponseError, payload: Vec<u8>) -> Self {
        match source {
            ResponseError::Fault(fault) => Self::Fault { fault, payload },
            source => Self::Decode { source, payload },
        }
    }

    /// Whether the call that produced this error may be retried as-is.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport { source, .. } => source.retry_policy(),
            _ => RetryPolicy::NonRetryable,
        }
    }
}

impl From<ProtocolError> for SoapError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::EnvelopeConfiguration { message } => {
                Self::EnvelopeConfiguration { message }
            }
            ProtocolError::MalformedParameter { reason } => Self::MalformedParameter { reason },
            other => Self::MalformedParameter {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_configuration_keeps_its_kind() {
        let err: SoapError = ProtocolError::EnvelopeConfiguration {
            message: "method or namespace is empty".into(),
        }
        .into();
        assert!(matches!(err, SoapError::EnvelopeConfiguration { .. }));
    }

    #[test]
    fn unbalanced_tokens_surface_as_malformed_parameter() {
        let err: SoapError = ProtocolError::UnclosedElement {
            name: "countryCode".into(),
        }
        .into();
        match err {
            SoapError::MalformedParameter { reason } => assert!(reason.contains("countryCode")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fault_response_error_becomes_fault_kind() {
        let fault = Fault {
            code: "soap:Server".into(),
            description: "boom".into(),
            detail: String::new(),
        };
        let err = SoapError::from_response(ResponseError::Fault(fault.clone()), b"<x/>".to_vec());
        assert!(err.is_fault());
        assert_eq!(err.fault(), Some(&fault));
        assert_eq!(err.payload(), Some(&b"<x/>"[..]));
    }

    #[test]
    fn decode_error_is_not_a_fault() {
        let err = SoapError::from_response(ResponseError::BodyEmpty, Vec::new());
        assert!(!err.is_fault());
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
    }

    #[test]
    fn transport_timeouts_are_retryable() {
        let err = SoapError::Transport {
            source: TransportError::Timeout,
            payload: Vec::new(),
        };
        assert_eq!(err.retry_policy(), RetryPolicy::Retryable { after: None });
    }

    #[test]
    fn sticky_description_errors_are_not_retryable() {
        let err = SoapError::DescriptionUnavailable(Arc::new(DescriptionError::NotLoaded));
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
        assert!(err.payload().is_none());
    }
}
