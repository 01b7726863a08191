//! SOAP wire domain.
//!
//! This crate contains every wire-level concept of the client: the parameter
//! value sum type and its encoder, the token stream and the XML writer that
//! turns it into bytes, envelope framing, the WSDL description model with its
//! parser and action resolver, response unwrapping with fault detection, and
//! the cross-cutting error types. Infrastructure crates implement the port
//! traits defined in [`ports`]; they never add wire rules.
//!
//! ## Architectural Layer
//!
//! **Wire rules + port definitions.** This crate performs no network I/O.
//! It defines *what* a transport and a description fetcher must do; the
//! `transport` crate defines *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`token`] | `Token` events and the per-call `TokenBuffer` |
//! | [`params`] | `ParamValue`, the closed parameter sum type |
//! | [`encode`] | Parameter encoder (`ParamValue` → tokens) |
//! | [`envelope`] | Envelope/Header/Body framing |
//! | [`writer`] | Token stream ↔ XML text at the serialization boundary |
//! | [`charset`] | Transcoding of documents that declare a non-UTF-8 encoding |
//! | [`wsdl`] | Description model, parser, and action resolver |
//! | [`request`] | `Request` and the `BuildRequest` trait |
//! | [`response`] | Envelope unwrapping, `Response`, and `Fault` |
//! | [`ports`] | `Transport`, `DescriptionFetcher`, `DumpLogger` |
//! | [`identifiers`] | `CallId` |
//! | [`errors`] | Top-level error and retry-policy types |

pub mod charset;
pub mod encode;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod params;
pub mod ports;
pub mod request;
pub mod response;
pub mod token;
pub mod writer;
pub mod wsdl;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use charset::{decode_document, CharsetError};
pub use encode::{encode, encode_into, ParamEncoder};
pub use envelope::{EnvelopeBuilder, EnvelopeConfig, DEFAULT_PREFIX, SOAP_ENVELOPE_NAMESPACE};
pub use errors::{ProtocolError, RetryPolicy, SoapError};
pub use identifiers::CallId;
pub use params::ParamValue;
pub use ports::{
    Credentials, DescriptionFetcher, DumpLogger, Transport, TransportError, TransportRequest,
    ACCEPT_TYPE, SOAP_CONTENT_TYPE,
};
pub use request::{BuildRequest, Request};
pub use response::{parse_envelope, parse_fault, Envelope, Fault, Response, ResponseError};
pub use token::{Attribute, Token, TokenBuffer};
pub use writer::{tokenize, write_tokens};
pub use wsdl::{
    parse_definitions, ActionResolver, BindingContext, BindingOptions, Definitions,
    DescriptionError, FirstBindingResolver,
};
