//! Client configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! refresh_interval_secs = 3600
//! auto_action = true
//! header_name = "AuthHeader"
//! timeout_secs = 30
//! username = "user"
//! password = "secret"
//! dump = false
//!
//! [envelope]
//! prefix = "soapenv"
//!
//! [envelope.attributes]
//! "xmlns:soapenv" = "http://schemas.xmlsoap.org/soap/envelope/"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use protocol::{BindingOptions, Credentials, EnvelopeConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a [`ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings of a [`crate::SoapClient`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub envelope: EnvelopeConfig,

    /// Period of the background description refresh. Values below
    /// [`crate::MIN_REFRESH_INTERVAL`] disable the refresh.
    pub refresh_interval_secs: Option<u64>,

    /// Basic-auth user name; sent only together with a non-empty password.
    pub username: String,
    pub password: String,

    /// Emit the raw request and response bytes of every call.
    pub dump: bool,

    /// Construct a `SOAPAction` when the description declares none.
    pub auto_action: bool,

    /// Element wrapping the header parameters.
    pub header_name: String,

    /// Deadline of the transport call.
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs.map(Duration::from_secs)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::new(self.username.as_str(), self.password.as_str())
    }

    pub(crate) fn binding_options(&self) -> BindingOptions {
        BindingOptions {
            auto_action: self.auto_action,
            header_name: self.header_name.clone(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("envelope", &self.envelope)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("username", &self.username)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "<redacted>" },
            )
            .field("dump", &self.dump)
            .field("auto_action", &self.auto_action)
            .field("header_name", &self.header_name)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
