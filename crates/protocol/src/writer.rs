//! Serialization boundary between token streams and XML text.
//!
//! [`write_tokens`] is the only place where escaping happens and where the
//! structural invariants of a token stream are enforced: element names must
//! be non-empty and closes must match opens. [`tokenize`] goes the other way
//! and is used to turn serializer output into a raw parameter fragment.

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::ProtocolError;
use crate::token::{Attribute, Token};

/// Writes `tokens` as compact XML (no declaration, no indentation).
///
/// An element gets an `xmlns="…"` declaration when its token namespace is
/// non-empty and differs from the default namespace in scope. An explicit
/// `xmlns` attribute on the token takes precedence and changes the scope for
/// its children.
pub fn write_tokens(tokens: &[Token]) -> Result<Vec<u8>, ProtocolError> {
    let mut writer = Writer::new(Vec::new());
    // (element name, default namespace in scope for its children)
    let mut open: Vec<(&str, Cow<'_, str>)> = Vec::new();

    for token in tokens {
        match token {
            Token::Open {
                name,
                namespace,
                attributes,
            } => {
                if name.is_empty() {
                    return Err(ProtocolError::malformed("start tag with no name"));
                }
                let inherited = open.last().map(|(_, scope)| scope.as_ref()).unwrap_or("");

                let mut start = BytesStart::new(name.as_str());
                let mut scope = Cow::Owned(inherited.to_owned());
                let mut declares_default = false;
                for Attribute { name: key, value } in attributes {
                    if key == "xmlns" {
                        declares_default = true;
                        scope = Cow::Borrowed(value.as_str());
                    }
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if !declares_default && !namespace.is_empty() && namespace != inherited {
                    start.push_attribute(("xmlns", namespace.as_str()));
                    scope = Cow::Borrowed(namespace.as_str());
                }

                emit(&mut writer, Event::Start(start))?;
                open.push((name.as_str(), scope));
            }
            Token::Text(content) => emit(&mut writer, Event::Text(BytesText::new(content)))?,
            Token::Close { name } => {
                if name.is_empty() {
                    return Err(ProtocolError::malformed("end tag with no name"));
                }
                match open.pop() {
                    Some((expected, _)) if expected == name => {}
                    unmatched => {
                        return Err(ProtocolError::UnbalancedTokens {
                            expected: unmatched.map(|(expected, _)| expected.to_owned()),
                            found: name.clone(),
                        });
                    }
                }
                emit(&mut writer, Event::End(BytesEnd::new(name.as_str())))?;
            }
        }
    }

    if let Some((name, _)) = open.pop() {
        return Err(ProtocolError::UnclosedElement {
            name: name.to_owned(),
        });
    }
    Ok(writer.into_inner())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ProtocolError> {
    writer
        .write_event(event)
        .map_err(|err| ProtocolError::Write(err.to_string()))
}

/// Parses an XML fragment into tokens.
///
/// Attributes (including `xmlns` declarations) are kept on the open token and
/// the token namespace is left empty, so writing the tokens back reproduces
/// the same declarations. Self-closing elements become an open/close pair;
/// declarations, comments and processing instructions are dropped.
pub fn tokenize(xml: &str) -> Result<Vec<Token>, ProtocolError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();

    loop {
        match reader.read_event().map_err(malformed_xml)? {
            Event::Start(start) => tokens.push(open_token(&start)?),
            Event::Empty(start) => {
                let token = open_token(&start)?;
                if let Token::Open { name, .. } = &token {
                    let close = Token::close(name.clone());
                    tokens.push(token);
                    tokens.push(close);
                }
            }
            Event::End(end) => tokens.push(Token::close(
                String::from_utf8_lossy(end.name().as_ref()).into_owned(),
            )),
            Event::Text(text) => {
                let content = text.unescape().map_err(malformed_xml)?;
                tokens.push(Token::text(content.into_owned()));
            }
            Event::CData(data) => tokens.push(Token::text(
                String::from_utf8_lossy(&data.into_inner()).into_owned(),
            )),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tokens)
}

fn open_token(start: &BytesStart<'_>) -> Result<Token, ProtocolError> {
    let mut token = Token::open(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed_xml)?;
        let value = attribute.unescape_value().map_err(malformed_xml)?;
        token = token.with_attribute(
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            value.into_owned(),
        );
    }
    Ok(token)
}

fn malformed_xml(err: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::malformed(format!("invalid XML fragment: {err}"))
}
