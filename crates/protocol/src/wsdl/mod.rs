//! Service descriptions: model, parser and action resolution.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`model`] | serde structs for the WSDL 1.1 / XML Schema vocabulary |
//! | [`parse`] | `parse_definitions`: bytes → [`Definitions`] |
//! | [`resolver`] | `ActionResolver` and the per-call [`BindingContext`] |

pub mod model;
pub mod parse;
pub mod resolver;

use thiserror::Error;

use crate::charset::CharsetError;

pub use model::Definitions;
pub use parse::{parse_definitions, WSDL_NAMESPACE};
pub use resolver::{ActionResolver, BindingContext, BindingOptions, FirstBindingResolver};

/// Errors raised while fetching or parsing a service description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// The location is neither an `http`/`https`/`file` URL nor a path.
    #[error("invalid description location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    /// The description could not be read.
    #[error("failed to fetch description from '{location}': {reason}")]
    Fetch { location: String, reason: String },

    /// The server answered the description request with a non-success status.
    #[error("fetching description from '{location}' returned HTTP status {status}")]
    Status { location: String, status: u16 },

    #[error(transparent)]
    Charset(#[from] CharsetError),

    /// The document root is not `definitions` in the WSDL namespace.
    #[error("document is not a WSDL 1.1 description (root element '{found}')")]
    NotWsdl { found: String },

    /// The document is not well-formed or does not fit the model.
    #[error("failed to parse description: {0}")]
    Parse(String),

    /// No description has been loaded yet.
    #[error("service description has not been loaded")]
    NotLoaded,
}
