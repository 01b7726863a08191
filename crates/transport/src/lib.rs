//! SOAP infrastructure adapters.
//!
//! Implements the [`protocol::Transport`] and [`protocol::DescriptionFetcher`]
//! ports on top of `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP requests, header handling, basic authentication,
//! status checks and local file reads live here. The `client` crate sees only
//! the port traits.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`http`] | `HttpTransport`: POSTs envelopes |
//! | [`fetch`] | `DescriptionLoader`: fetches descriptions over HTTP or from disk |

pub mod fetch;
pub mod http;

pub use fetch::DescriptionLoader;
pub use http::HttpTransport;
