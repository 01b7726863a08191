//! SOAP client orchestration.
//!
//! This crate provides [`SoapClient`], which sequences one call from
//! parameters to a parsed response, and the [`DefinitionsManager`] that
//! fetches, caches and periodically refreshes the service description while
//! calls are in flight.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The client sequences calls between wire rules in
//! the [`protocol`] crate and the infrastructure ports ([`protocol::Transport`],
//! [`protocol::DescriptionFetcher`]). It contains no wire rules of its own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`client`] | `SoapClient`, its builder, and `CallOptions` |
//! | [`definitions`] | Description lifecycle under a readers/writer gate |
//! | [`config`] | `ClientConfig`, loadable from TOML |
//! | [`dump`] | `TracingDumpLogger` |

pub mod client;
pub mod config;
pub mod definitions;
pub mod dump;

pub use client::{CallOptions, SoapClient, SoapClientBuilder};
pub use config::{ClientConfig, ConfigError};
pub use definitions::{
    DefinitionsLease, DefinitionsManager, DefinitionsPhase, DefinitionsStatus,
    MIN_REFRESH_INTERVAL,
};
pub use dump::TracingDumpLogger;
