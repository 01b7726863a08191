//! Description parser.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use super::model::Definitions;
use super::DescriptionError;
use crate::charset::decode_document;

/// Namespace of the WSDL 1.1 vocabulary.
pub const WSDL_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/";

/// Parses a WSDL 1.1 document.
///
/// The document is transcoded to UTF-8 first. Its root must be `definitions`
/// bound to [`WSDL_NAMESPACE`]; elements outside the model are ignored.
pub fn parse_definitions(bytes: &[u8]) -> Result<Definitions, DescriptionError> {
    let text = decode_document(bytes)?;
    verify_root(&text)?;

    let definitions: Definitions =
        quick_xml::de::from_str(&text).map_err(|err| DescriptionError::Parse(err.to_string()))?;
    tracing::debug!(
        name = %definitions.name,
        target_namespace = %definitions.target_namespace,
        bindings = definitions.bindings.len(),
        services = definitions.services.len(),
        "parsed service description"
    );
    Ok(definitions)
}

fn verify_root(text: &str) -> Result<(), DescriptionError> {
    let mut reader = NsReader::from_str(text);

    loop {
        let (namespace, event) = reader
            .read_resolved_event()
            .map_err(|err| DescriptionError::Parse(err.to_string()))?;
        let root = match event {
            Event::Start(start) | Event::Empty(start) => start,
            Event::Eof => {
                return Err(DescriptionError::NotWsdl {
                    found: String::new(),
                })
            }
            _ => continue,
        };

        let in_wsdl_namespace = matches!(
            namespace,
            ResolveResult::Bound(Namespace(uri)) if uri == WSDL_NAMESPACE.as_bytes()
        );
        if in_wsdl_namespace && root.local_name().as_ref() == b"definitions" {
            return Ok(());
        }
        return Err(DescriptionError::NotWsdl {
            found: String::from_utf8_lossy(root.name().as_ref()).into_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_VAT: &[u8] = include_bytes!("../../testdata/check_vat.wsdl");

    #[test]
    fn parses_the_check_vat_description() {
        let definitions = parse_definitions(CHECK_VAT).expect("description parses");

        assert_eq!(
            definitions.target_namespace,
            "urn:ec.europa.eu:taxud:vies:services:checkVat"
        );
        let schema = definitions.first_schema().expect("schema present");
        assert_eq!(
            schema.target_namespace,
            "urn:ec.europa.eu:taxud:vies:services:checkVat:types"
        );
        assert_eq!(schema.element_form_default, "qualified");

        let check_vat = schema
            .elements
            .iter()
            .find(|element| element.name == "checkVat")
            .expect("checkVat element");
        let fields: Vec<&str> = check_vat
            .complex_type
            .as_ref()
            .and_then(|complex| complex.sequence.as_ref())
            .map(|sequence| sequence.elements.iter().map(|e| e.name.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(fields, ["countryCode", "vatNumber"]);

        let restriction = schema.simple_types[0]
            .restriction
            .as_ref()
            .expect("restriction present");
        assert_eq!(restriction.pattern.as_ref().map(|p| p.value.as_str()), Some("[A-Z]{2}"));

        assert_eq!(definitions.operation_names(), ["checkVat"]);
        let operation = definitions
            .find_binding_operation("checkVat")
            .expect("binding operation");
        assert_eq!(
            operation.soap_operation.as_ref().map(|op| op.soap_action.as_str()),
            Some("")
        );
        assert_eq!(
            definitions.bindings[0]
                .soap_binding
                .as_ref()
                .map(|binding| binding.transport.as_str()),
            Some("http://schemas.xmlsoap.org/soap/http")
        );
        assert_eq!(
            definitions.service_url(),
            Some("http://ec.europa.eu/taxation_customs/vies/services/checkVatService")
        );
        assert_eq!(definitions.services[0].name, "checkVatService");
    }

    #[test]
    fn declared_latin1_descriptions_parse() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?>"#.to_vec();
        bytes.extend_from_slice(
            br#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" name="Caf"#,
        );
        bytes.push(0xE9);
        bytes.extend_from_slice(br#"" targetNamespace="urn:cafe"/>"#);

        let definitions = parse_definitions(&bytes).expect("description parses");
        assert_eq!(definitions.name, "Café");
        assert_eq!(definitions.target_namespace, "urn:cafe");
    }

    #[test]
    fn a_foreign_root_is_rejected() {
        let err = parse_definitions(b"<html><body/></html>").unwrap_err();
        assert!(matches!(err, DescriptionError::NotWsdl { found } if found == "html"));

        let err = parse_definitions(br#"<definitions xmlns="urn:not-wsdl"/>"#).unwrap_err();
        assert!(matches!(err, DescriptionError::NotWsdl { .. }));
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        let err = parse_definitions(
            br#"<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"><wsdl:types>"#,
        )
        .unwrap_err();
        assert!(matches!(err, DescriptionError::Parse(_)));
    }
}
