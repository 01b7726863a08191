//! Transcoding of documents that are not UTF-8.
//!
//! Service descriptions and responses are XML documents whose encoding is
//! given by a byte-order mark or by the `encoding` pseudo-attribute of the
//! XML declaration. [`decode_document`] turns such bytes into UTF-8 text so
//! the rest of the crate only ever parses `&str`.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while transcoding a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharsetError {
    /// The XML declaration names an encoding with no known decoder.
    #[error("unsupported document encoding '{label}'")]
    UnknownEncoding {
        /// Encoding label as written in the declaration.
        label: String,
    },
}

/// Decodes `bytes` into UTF-8 text.
///
/// A byte-order mark wins over the declaration. Without either, the document
/// is treated as UTF-8. Malformed sequences are replaced with U+FFFD.
pub fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>, CharsetError> {
    let (encoding, bom_length) = match Encoding::for_bom(bytes) {
        Some(found) => found,
        None => (declared_encoding(bytes)?.unwrap_or(UTF_8), 0),
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            "document contains byte sequences invalid for its encoding"
        );
    }
    Ok(text)
}

/// Reads the `encoding` of the XML declaration, if the document starts with
/// one.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>, CharsetError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                let Some(Ok(label)) = decl.encoding() else {
                    return Ok(None);
                };
                return match Encoding::for_label(&label) {
                    Some(encoding) => Ok(Some(encoding.output_encoding())),
                    None => Err(CharsetError::UnknownEncoding {
                        label: String::from_utf8_lossy(&label).into_owned(),
                    }),
                };
            }
            // Leading whitespace before the declaration.
            Ok(Event::Text(text)) if text.iter().all(u8::is_ascii_whitespace) => buf.clear(),
            _ => return Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_without_declaration_is_borrowed() {
        let text = decode_document(b"<a>caf\xc3\xa9</a>").expect("decodes");
        assert!(matches!(text, Cow::Borrowed(_)));
        assert_eq!(text, "<a>café</a>");
    }

    #[test]
    fn declared_latin1_is_transcoded() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>caf\xe9</a>";
        let text = decode_document(bytes).expect("decodes");
        assert!(text.ends_with("<a>café</a>"));
    }

    #[test]
    fn byte_order_mark_wins_and_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>\xc3\xa9</a>");
        let text = decode_document(&bytes).expect("decodes");
        assert!(text.starts_with("<?xml"));
        assert!(text.ends_with("<a>é</a>"));
    }

    #[test]
    fn unknown_encoding_is_reported() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"x-klingon\"?><a/>";
        assert_eq!(
            decode_document(bytes),
            Err(CharsetError::UnknownEncoding {
                label: "x-klingon".into()
            })
        );
    }
}
