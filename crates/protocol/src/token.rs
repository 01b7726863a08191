//! Token stream: the intermediate form between parameter values and wire bytes.
//!
//! A token stream is an ordered list of [`Token`] events. It must be
//! well-nested: every [`Token::Open`] has exactly one matching
//! [`Token::Close`] in LIFO order. The writer enforces this when the stream is
//! serialized; nothing reorders tokens between emission and the wire.

/// An attribute carried by an [`Token::Open`] event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name as written (`xmlns:soap`, `xsi:type`, ...).
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One event in a token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Start of an element.
    Open {
        /// Qualified element name as written.
        name: String,
        /// Namespace the element belongs to. Empty means "inherit the default
        /// namespace in scope"; the writer only declares it when it differs.
        namespace: String,
        /// Attributes in emission order.
        attributes: Vec<Attribute>,
    },
    /// Character data, unescaped. Escaping happens in the writer.
    Text(String),
    /// End of the innermost open element.
    Close {
        /// Name of the element being closed.
        name: String,
    },
}

impl Token {
    /// An open event with no namespace and no attributes.
    pub fn open(name: impl Into<String>) -> Self {
        Self::Open {
            name: name.into(),
            namespace: String::new(),
            attributes: Vec::new(),
        }
    }

    /// An open event attributed to `namespace`.
    pub fn open_ns(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::Open {
            name: name.into(),
            namespace: namespace.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute to an open event. Other events are returned unchanged.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Open { attributes, .. } = &mut self {
            attributes.push(Attribute::new(name, value));
        }
        self
    }

    /// A text event.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// A close event.
    pub fn close(name: impl Into<String>) -> Self {
        Self::Close { name: name.into() }
    }
}

/// Returns `true` if every open has a matching close in LIFO order.
pub fn is_balanced(tokens: &[Token]) -> bool {
    let mut open: Vec<&str> = Vec::new();
    for token in tokens {
        match token {
            Token::Open { name, .. } => open.push(name),
            Token::Close { name } => {
                if open.pop() != Some(name.as_str()) {
                    return false;
                }
            }
            Token::Text(_) => {}
        }
    }
    open.is_empty()
}

/// Append-only token buffer owned by a single call.
///
/// A fresh buffer is created for every envelope; buffers are never shared
/// between concurrent calls.
#[derive(Debug, Default)]
pub struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single token.
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Appends tokens in order.
    pub fn extend(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.tokens.extend(tokens);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Consumes the buffer, returning the tokens in emission order.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}
