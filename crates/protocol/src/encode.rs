//! Parameter encoder: [`ParamValue`] → token stream.
//!
//! Each variant has its own method on [`ParamEncoder`]:
//!
//! | Variant | Tokens |
//! |---------|--------|
//! | `Map` | for each entry: open(name, ns), value, close(name) |
//! | `Pairs` | same as `Map`, in caller order, duplicates kept |
//! | `List` | each element in order, no wrapping element |
//! | `Raw` | the fragment verbatim |
//! | `Text` | one text token, unescaped |
//! | `Nil` | nothing |
//!
//! The encoder never fails. An empty element name is passed through and
//! rejected by the writer when the stream is serialized.

use crate::params::ParamValue;
use crate::token::{Token, TokenBuffer};

/// Encodes `value` into a fresh token stream, attributing every element it
/// opens to `namespace`.
pub fn encode(value: &ParamValue, namespace: &str) -> Vec<Token> {
    let mut buffer = TokenBuffer::new();
    encode_into(&mut buffer, value, namespace);
    buffer.into_tokens()
}

/// Encodes `value` onto the end of `buffer`.
pub fn encode_into(buffer: &mut TokenBuffer, value: &ParamValue, namespace: &str) {
    ParamEncoder::new(buffer, namespace).encode(value);
}

/// Recursive encoder writing into a call-owned [`TokenBuffer`].
#[derive(Debug)]
pub struct ParamEncoder<'a> {
    buffer: &'a mut TokenBuffer,
    namespace: &'a str,
}

impl<'a> ParamEncoder<'a> {
    pub fn new(buffer: &'a mut TokenBuffer, namespace: &'a str) -> Self {
        Self { buffer, namespace }
    }

    /// Dispatches on the variant of `value`.
    pub fn encode(&mut self, value: &ParamValue) {
        match value {
            ParamValue::Map(entries) => self.encode_map(entries.iter()),
            ParamValue::Pairs(pairs) => self.encode_pairs(pairs),
            ParamValue::List(items) => self.encode_list(items),
            ParamValue::Raw(tokens) => self.encode_raw(tokens),
            ParamValue::Text(text) => self.encode_text(text),
            ParamValue::Nil => self.encode_nil(),
        }
    }

    fn encode_map<'v>(&mut self, entries: impl Iterator<Item = (&'v String, &'v ParamValue)>) {
        for (name, value) in entries {
            self.encode_element(name, value);
        }
    }

    fn encode_pairs(&mut self, pairs: &[(String, ParamValue)]) {
        for (name, value) in pairs {
            self.encode_element(name, value);
        }
    }

    fn encode_list(&mut self, items: &[ParamValue]) {
        for item in items {
            self.encode(item);
        }
    }

    fn encode_raw(&mut self, tokens: &[Token]) {
        self.buffer.extend(tokens.iter().cloned());
    }

    fn encode_text(&mut self, text: &str) {
        self.buffer.push(Token::text(text));
    }

    fn encode_nil(&mut self) {
        tracing::trace!("nil parameter value produces no tokens");
    }

    fn encode_element(&mut self, name: &str, value: &ParamValue) {
        self.buffer.push(Token::open_ns(name, self.namespace));
        self.encode(value);
        self.buffer.push(Token::close(name));
    }
}
