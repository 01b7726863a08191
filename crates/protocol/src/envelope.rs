//! Envelope framing.
//!
//! [`EnvelopeBuilder::build`] wraps already-encoded header and body tokens in
//! the SOAP 1.1 `Envelope`, `Header` and `Body` elements. The emitted order is
//! fixed:
//!
//! ```text
//! Envelope-open
//!   [Header-open [inner-open] header-tokens [inner-close] Header-close]
//!   Body-open method-open body-tokens method-close Body-close
//! Envelope-close
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;
use crate::token::{Attribute, Token};

/// Namespace of the SOAP 1.1 envelope.
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace bound to `xsi` by the default attribute set.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace bound to `xsd` by the default attribute set.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Prefix used for the envelope elements unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "soap";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Envelope prefix and attribute set.
///
/// When `attributes` is `None` the envelope declares `xmlns:xsi`, `xmlns:xsd`
/// and `xmlns:{prefix}`. When it is `Some`, exactly those attributes are
/// written instead; the two sets are never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Prefix of the `Envelope`, `Header` and `Body` elements. An empty
    /// prefix writes the elements unqualified.
    pub prefix: String,

    /// Replacement attribute set for the `Envelope` element.
    pub attributes: Option<BTreeMap<String, String>>,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            attributes: None,
        }
    }
}

impl EnvelopeConfig {
    /// A configuration with a custom prefix and attribute set.
    pub fn custom(prefix: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        Self {
            prefix: prefix.into(),
            attributes: Some(attributes),
        }
    }

    fn qualified(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_owned()
        } else {
            format!("{}:{}", self.prefix, local)
        }
    }

    fn envelope_attributes(&self) -> Vec<Attribute> {
        match &self.attributes {
            Some(custom) => custom
                .iter()
                .map(|(name, value)| Attribute::new(name.clone(), value.clone()))
                .collect(),
            None => {
                let envelope_binding = if self.prefix.is_empty() {
                    "xmlns".to_owned()
                } else {
                    format!("xmlns:{}", self.prefix)
                };
                vec![
                    Attribute::new("xmlns:xsi", XSI_NAMESPACE),
                    Attribute::new("xmlns:xsd", XSD_NAMESPACE),
                    Attribute::new(envelope_binding, SOAP_ENVELOPE_NAMESPACE),
                ]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds the framed token stream for one call.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeBuilder<'a> {
    config: &'a EnvelopeConfig,
}

impl<'a> EnvelopeBuilder<'a> {
    pub fn new(config: &'a EnvelopeConfig) -> Self {
        Self { config }
    }

    /// Wraps `header` and `body` tokens in envelope framing.
    ///
    /// The header block is emitted only when `header` is non-empty. Its inner
    /// element (`header_name`, declaring `header_namespace` as default
    /// namespace) is emitted only when both are non-empty.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::EnvelopeConfiguration`] when `method` or
    /// `body_namespace` is empty. The check runs before anything is built.
    pub fn build(
        &self,
        header: &[Token],
        body: &[Token],
        method: &str,
        body_namespace: &str,
        header_name: &str,
        header_namespace: &str,
    ) -> Result<Vec<Token>, ProtocolError> {
        if method.is_empty() || body_namespace.is_empty() {
            return Err(ProtocolError::EnvelopeConfiguration {
                message: "method or namespace is empty".to_owned(),
            });
        }

        let envelope = self.config.qualified("Envelope");
        let mut tokens = Vec::with_capacity(header.len() + body.len() + 10);

        tokens.push(Token::Open {
            name: envelope.clone(),
            namespace: String::new(),
            attributes: self.config.envelope_attributes(),
        });

        if !header.is_empty() {
            let header_element = self.config.qualified("Header");
            let inner = (!header_name.is_empty() && !header_namespace.is_empty())
                .then_some(header_name);

            tokens.push(Token::open(header_element.clone()));
            if let Some(inner) = inner {
                tokens.push(Token::open(inner).with_attribute("xmlns", header_namespace));
            }
            tokens.extend_from_slice(header);
            if let Some(inner) = inner {
                tokens.push(Token::close(inner));
            }
            tokens.push(Token::close(header_element));
        }

        let body_element = self.config.qualified("Body");
        tokens.push(Token::open(body_element.clone()));
        tokens.push(Token::open(method).with_attribute("xmlns", body_namespace));
        tokens.extend_from_slice(body);
        tokens.push(Token::close(method));
        tokens.push(Token::close(body_element));

        tokens.push(Token::close(envelope));
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::is_balanced;
    use crate::writer::write_tokens;

    const NS: &str = "urn:ec.europa.eu:taxud:vies:services:checkVat:types";

    fn body_tokens() -> Vec<Token> {
        vec![
            Token::open_ns("countryCode", NS),
            Token::text("IE"),
            Token::close("countryCode"),
        ]
    }

    fn xml(tokens: &[Token]) -> String {
        String::from_utf8(write_tokens(tokens).expect("envelope writes")).expect("utf-8")
    }

    #[test]
    fn default_envelope_has_three_namespace_declarations() {
        let config = EnvelopeConfig::default();
        let tokens = EnvelopeBuilder::new(&config)
            .build(&[], &body_tokens(), "checkVat", NS, "", "")
            .expect("envelope builds");

        assert_eq!(
            xml(&tokens),
            concat!(
                r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
                r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
                r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
                r#"<soap:Body><checkVat xmlns="urn:ec.europa.eu:taxud:vies:services:checkVat:types">"#,
                r#"<countryCode>IE</countryCode></checkVat></soap:Body></soap:Envelope>"#
            )
        );
    }

    #[test]
    fn empty_method_or_namespace_is_a_configuration_error() {
        let config = EnvelopeConfig::default();
        let builder = EnvelopeBuilder::new(&config);
        for (method, namespace) in [("", NS), ("checkVat", ""), ("", "")] {
            let err = builder
                .build(&[], &body_tokens(), method, namespace, "", "")
                .unwrap_err();
            assert!(matches!(err, ProtocolError::EnvelopeConfiguration { .. }));
        }
    }

    #[test]
    fn custom_attributes_replace_the_defaults() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "xmlns:soapenv".to_owned(),
            SOAP_ENVELOPE_NAMESPACE.to_owned(),
        );
        attributes.insert("xmlns:tem".to_owned(), "http://tempuri.org/".to_owned());
        let config = EnvelopeConfig::custom("soapenv", attributes);

        let tokens = EnvelopeBuilder::new(&config)
            .build(&[], &[], "Ping", "http://tempuri.org/", "", "")
            .expect("envelope builds");

        let Token::Open {
            name, attributes, ..
        } = &tokens[0]
        else {
            panic!("first token must open the envelope");
        };
        assert_eq!(name, "soapenv:Envelope");
        assert_eq!(attributes.len(), 2);
        assert!(attributes.iter().all(|a| a.name != "xmlns:xsi"));
        assert_eq!(tokens[1], Token::open("soapenv:Body"));
    }

    #[test]
    fn header_block_is_omitted_without_header_tokens() {
        let config = EnvelopeConfig::default();
        let tokens = EnvelopeBuilder::new(&config)
            .build(&[], &[], "Ping", NS, "AuthHeader", "urn:auth")
            .expect("envelope builds");
        assert!(!tokens.contains(&Token::open("soap:Header")));
    }

    #[test]
    fn header_inner_element_requires_name_and_namespace() {
        let config = EnvelopeConfig::default();
        let builder = EnvelopeBuilder::new(&config);
        let header = vec![Token::open("token"), Token::text("abc"), Token::close("token")];

        let tokens = builder
            .build(&header, &[], "Ping", NS, "AuthHeader", "urn:auth")
            .expect("envelope builds");
        assert_eq!(tokens[1], Token::open("soap:Header"));
        assert_eq!(
            tokens[2],
            Token::open("AuthHeader").with_attribute("xmlns", "urn:auth")
        );
        assert!(is_balanced(&tokens));

        for (name, namespace) in [("AuthHeader", ""), ("", "urn:auth")] {
            let tokens = builder
                .build(&header, &[], "Ping", NS, name, namespace)
                .expect("envelope builds");
            assert_eq!(tokens[1], Token::open("soap:Header"));
            assert_eq!(tokens[2], Token::open("token"));
            assert_eq!(tokens[5], Token::close("soap:Header"));
            assert!(is_balanced(&tokens));
        }
    }

    #[test]
    fn framing_order_is_fixed() {
        let config = EnvelopeConfig::default();
        let header = vec![Token::text("h")];
        let tokens = EnvelopeBuilder::new(&config)
            .build(&header, &[Token::text("b")], "Ping", NS, "Auth", "urn:auth")
            .expect("envelope builds");

        let shape: Vec<String> = tokens
            .iter()
            .map(|token| match token {
                Token::Open { name, .. } => format!("+{name}"),
                Token::Close { name } => format!("-{name}"),
                Token::Text(text) => text.clone(),
            })
            .collect();
        assert_eq!(
            shape,
            [
                "+soap:Envelope",
                "+soap:Header",
                "+Auth",
                "h",
                "-Auth",
                "-soap:Header",
                "+soap:Body",
                "+Ping",
                "b",
                "-Ping",
                "-soap:Body",
                "-soap:Envelope",
            ]
        );
    }
}
