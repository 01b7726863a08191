//! Call requests.

use serde::Serialize;

use crate::errors::ProtocolError;
use crate::params::ParamValue;

/// An operation name with its body and optional header parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub params: ParamValue,
    /// Header parameters for this call. `None` falls back to the client's
    /// configured header parameters.
    pub header: Option<ParamValue>,
}

impl Request {
    pub fn new(method: impl Into<String>, params: impl Into<ParamValue>) -> Self {
        Self {
            method: method.into(),
            params: params.into(),
            header: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: impl Into<ParamValue>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// A request whose body parameters are the serialized fields of `value`.
    pub fn from_serializable<T: Serialize + ?Sized>(
        method: impl Into<String>,
        value: &T,
    ) -> Result<Self, ProtocolError> {
        Ok(Self::new(method, ParamValue::from_serializable(value)?))
    }
}

/// Types that know which operation they invoke and with what parameters.
pub trait BuildRequest {
    fn build_request(&self) -> Result<Request, ProtocolError>;
}

impl BuildRequest for Request {
    fn build_request(&self) -> Result<Request, ProtocolError> {
        Ok(self.clone())
    }
}
