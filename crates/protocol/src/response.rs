//! Response unwrapping and fault detection.
//!
//! [`parse_envelope`] splits a response document into the verbatim inner
//! markup of its `Header` and `Body`. [`Response`] then either reports a
//! [`Fault`] or binds the body to a caller type with `quick-xml`'s serde
//! deserializer. Fault detection always runs before the caller's decoder.

use std::fmt;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::charset::{decode_document, CharsetError};

/// Errors raised while unwrapping or decoding a response.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Charset(#[from] CharsetError),

    /// The document root is not an `Envelope` element.
    #[error("response is not a SOAP envelope (root element '{found}')")]
    NotAnEnvelope {
        /// Root element name, empty when the document has no elements.
        found: String,
    },

    /// The response is not well-formed XML.
    #[error("malformed response: {0}")]
    Xml(String),

    #[error("response body is empty")]
    BodyEmpty,

    #[error("response header is empty")]
    HeaderEmpty,

    /// The body carries a SOAP fault.
    #[error("SOAP fault {0}")]
    Fault(Fault),

    /// The body could not be bound to the requested type.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

impl ResponseError {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Fault(_))
    }
}

// ---------------------------------------------------------------------------
// Fault
// ---------------------------------------------------------------------------

/// A SOAP 1.1 fault.
///
/// A non-empty `code` marks a protocol-level error even when the other fields
/// are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fault {
    /// `faultcode`, e.g. `soap:Server`.
    #[serde(rename = "faultcode")]
    pub code: String,
    /// `faultstring`.
    #[serde(rename = "faultstring")]
    pub description: String,
    /// Inner markup of `detail`, verbatim.
    pub detail: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]: {} | Detail: {}",
            self.code, self.description, self.detail
        )
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Inner markup of a response envelope's header and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub header: String,
    pub body: String,
}

/// Unwraps a response document.
///
/// The root must be an `Envelope` element with any prefix. Only direct
/// `Header` and `Body` children are captured; anything else is ignored.
pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope, ResponseError> {
    let text = decode_document(bytes)?;
    let mut reader = Reader::from_str(&text);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(root) => {
                ensure_envelope(&root)?;
                break;
            }
            Event::Empty(root) => {
                ensure_envelope(&root)?;
                return Ok(Envelope::default());
            }
            Event::Eof => {
                return Err(ResponseError::NotAnEnvelope {
                    found: String::new(),
                })
            }
            _ => {}
        }
    }

    let mut envelope = Envelope::default();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(child) => {
                let span = reader.read_to_end(child.name()).map_err(xml_error)?;
                let inner = &text[span.start as usize..span.end as usize];
                match child.local_name().as_ref() {
                    b"Header" => envelope.header = inner.to_owned(),
                    b"Body" => envelope.body = inner.to_owned(),
                    _ => {}
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    Ok(envelope)
}

fn ensure_envelope(root: &BytesStart<'_>) -> Result<(), ResponseError> {
    if root.local_name().as_ref() == b"Envelope" {
        Ok(())
    } else {
        Err(ResponseError::NotAnEnvelope {
            found: String::from_utf8_lossy(root.name().as_ref()).into_owned(),
        })
    }
}

/// Looks for a fault in body markup.
///
/// The first element of `body` is treated as the fault container, whatever
/// its name; its direct `faultcode`, `faultstring` and `detail` children are
/// captured. Returns `Some` only when the code is non-empty.
///
/// A non-empty code is reported even when another field, or the markup after
/// it, cannot be read; that field is left empty.
pub fn parse_fault(body: &str) -> Result<Option<Fault>, ResponseError> {
    let mut reader = Reader::from_str(body);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(_) => break,
            Event::Empty(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }

    let mut fault = Fault::default();
    let mut failure = None;
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                failure = Some(xml_error(err));
                break;
            }
        };
        match event {
            Event::Start(child) => {
                let field = match child.local_name().as_ref() {
                    b"faultcode" => text_content(&mut reader).map(|text| fault.code = text),
                    b"faultstring" => {
                        text_content(&mut reader).map(|text| fault.description = text)
                    }
                    b"detail" => reader
                        .read_to_end(child.name())
                        .map_err(xml_error)
                        .map(|span| {
                            fault.detail = body[span.start as usize..span.end as usize]
                                .trim()
                                .to_owned();
                        }),
                    _ => reader.read_to_end(child.name()).map(drop).map_err(xml_error),
                };
                if let Err(err) = field {
                    tracing::debug!(error = %err, "fault field could not be read");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
            Event::End(_) | Event::Eof => break,
            _ => {}
        }
    }

    if !fault.code.is_empty() {
        return Ok(Some(fault));
    }
    failure.map_or(Ok(None), Err)
}

/// Reads the character data of the element whose start was just consumed,
/// joining text and CDATA sections and skipping nested markup.
///
/// An undecodable text chunk does not stop the scan: the element is read to
/// its end so the caller stays in step, then the error is returned.
fn text_content(reader: &mut Reader<&[u8]>) -> Result<String, ResponseError> {
    let mut text = String::new();
    let mut undecodable = None;
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(chunk) => match chunk.unescape() {
                Ok(decoded) => text.push_str(&decoded),
                Err(err) if undecodable.is_none() => undecodable = Some(xml_error(err)),
                Err(_) => {}
            },
            Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk.into_inner())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(ResponseError::Xml("fault ends inside a field".to_owned())),
            _ => {}
        }
    }
    match undecodable {
        Some(err) => Err(err),
        None => Ok(text.trim().to_owned()),
    }
}

fn xml_error(err: impl fmt::Display) -> ResponseError {
    ResponseError::Xml(err.to_string())
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A successful exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Inner markup of the response `Body`.
    pub body: String,
    /// Inner markup of the response `Header`.
    pub header: String,
    /// The outgoing envelope that produced this response.
    pub payload: Vec<u8>,
}

impl Response {
    pub fn new(envelope: Envelope, payload: Vec<u8>) -> Self {
        Self {
            body: envelope.body,
            header: envelope.header,
            payload,
        }
    }

    /// The fault carried by the body, if any.
    pub fn fault(&self) -> Result<Option<Fault>, ResponseError> {
        if self.body.trim().is_empty() {
            return Ok(None);
        }
        parse_fault(&self.body)
    }

    /// Binds the body to `T`.
    ///
    /// # Errors
    ///
    /// [`ResponseError::BodyEmpty`] for an empty body, [`ResponseError::Fault`]
    /// when the body is a fault, [`ResponseError::Decode`] when `T` does not
    /// match the body.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        if self.body.trim().is_empty() {
            return Err(ResponseError::BodyEmpty);
        }
        if let Some(fault) = parse_fault(&self.body)? {
            return Err(ResponseError::Fault(fault));
        }
        quick_xml::de::from_str(&self.body).map_err(|err| ResponseError::Decode(err.to_string()))
    }

    /// Binds the header to `T`.
    pub fn unmarshal_header<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        if self.header.trim().is_empty() {
            return Err(ResponseError::HeaderEmpty);
        }
        quick_xml::de::from_str(&self.header).map_err(|err| ResponseError::Decode(err.to_string()))
    }
}
