//! Parameter values accepted by a SOAP call.
//!
//! [`ParamValue`] is a closed sum type. Each variant has exactly one encoding
//! rule (see [`crate::encode`]), so there is no guessing based on the runtime
//! shape of a value.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::ProtocolError;
use crate::token::Token;
use crate::writer::tokenize;

/// Root element wrapped around serialized values; stripped again after
/// tokenizing.
const SERIALIZED_ROOT: &str = "params";

/// A parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamValue {
    /// Element name → value. Entries are emitted in key order; use
    /// [`ParamValue::Pairs`] when the wire order matters.
    Map(BTreeMap<String, ParamValue>),
    /// Ordered `(element name, value)` pairs. Duplicate names are allowed and
    /// produce sibling elements with the same tag.
    Pairs(Vec<(String, ParamValue)>),
    /// Values emitted one after the other with no wrapping element.
    List(Vec<ParamValue>),
    /// Pre-built tokens appended verbatim.
    Raw(Vec<Token>),
    /// Scalar text.
    Text(String),
    /// A value with no wire representation. Encodes to nothing.
    #[default]
    Nil,
}

impl ParamValue {
    /// A scalar text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// A mapping built from `(name, value)` entries.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Ordered pairs built from `(name, value)` entries.
    pub fn pairs<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::Pairs(
            entries
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// A list of sibling values.
    pub fn list<V: Into<ParamValue>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Serializes `value` with the XML serializer and keeps the resulting
    /// elements as a raw fragment.
    ///
    /// Struct fields become child elements named after the field (honoring
    /// `#[serde(rename)]`); the struct's own name is not emitted, the
    /// operation element plays that role.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, ProtocolError> {
        let xml = quick_xml::se::to_string_with_root(SERIALIZED_ROOT, value)
            .map_err(|err| ProtocolError::malformed(err.to_string()))?;
        let mut tokens = tokenize(&xml)?;

        let wrapped = matches!(tokens.first(), Some(Token::Open { name, .. }) if name == SERIALIZED_ROOT)
            && matches!(tokens.last(), Some(Token::Close { name }) if name == SERIALIZED_ROOT);
        if wrapped {
            tokens.pop();
            tokens.remove(0);
        }
        Ok(Self::Raw(tokens))
    }

    /// Returns `true` if encoding this value produces no tokens.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Map(entries) => entries.is_empty(),
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::List(items) => items.iter().all(ParamValue::is_empty),
            Self::Raw(tokens) => tokens.is_empty(),
            Self::Text(_) => false,
            Self::Nil => true,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Token>> for ParamValue {
    fn from(tokens: Vec<Token>) -> Self {
        Self::Raw(tokens)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(entries: BTreeMap<String, ParamValue>) -> Self {
        Self::Map(entries)
    }
}

/// JSON objects become [`ParamValue::Map`], arrays [`ParamValue::List`],
/// strings, numbers and booleans [`ParamValue::Text`], and `null`
/// [`ParamValue::Nil`].
impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Nil,
            Value::Bool(flag) => Self::Text(flag.to_string()),
            Value::Number(number) => Self::Text(number.to_string()),
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(name, value)| (name, value.into()))
                    .collect(),
            ),
        }
    }
}
