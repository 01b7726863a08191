//! Service description model.
//!
//! Plain serde structs mirroring the WSDL 1.1 and XML Schema vocabulary the
//! client needs. Elements are matched by local name; attributes use the `@`
//! prefix understood by `quick-xml`'s deserializer. Every field defaults, so a
//! description that omits a section still parses.

use serde::{Deserialize, Serialize};

/// Root `wsdl:definitions` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Definitions {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@targetNamespace")]
    pub target_namespace: String,
    #[serde(rename = "import")]
    pub imports: Vec<Import>,
    #[serde(rename = "types")]
    pub types: Vec<Types>,
    #[serde(rename = "message")]
    pub messages: Vec<Message>,
    #[serde(rename = "portType")]
    pub port_types: Vec<PortType>,
    #[serde(rename = "binding")]
    pub bindings: Vec<Binding>,
    #[serde(rename = "service")]
    pub services: Vec<Service>,
}

impl Definitions {
    /// First schema of the first `types` section.
    pub fn first_schema(&self) -> Option<&Schema> {
        self.types.iter().flat_map(|types| types.schemas.iter()).next()
    }

    /// The operation called `name` in the first binding.
    pub fn find_binding_operation(&self, name: &str) -> Option<&Operation> {
        self.bindings
            .first()?
            .operations
            .iter()
            .find(|operation| operation.name == name)
    }

    /// Operation names of every port type, in document order.
    pub fn operation_names(&self) -> Vec<&str> {
        self.port_types
            .iter()
            .flat_map(|port_type| port_type.operations.iter())
            .map(|operation| operation.name.as_str())
            .collect()
    }

    /// Address of the first port of the first service.
    pub fn service_url(&self) -> Option<&str> {
        self.services
            .first()?
            .ports
            .first()?
            .addresses
            .first()
            .map(|address| address.location.as_str())
    }
}

/// `wsdl:import`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Import {
    #[serde(rename = "@namespace")]
    pub namespace: String,
    #[serde(rename = "@location")]
    pub location: String,
}

/// `wsdl:types`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Types {
    #[serde(rename = "schema")]
    pub schemas: Vec<Schema>,
}

// ---------------------------------------------------------------------------
// XML Schema
// ---------------------------------------------------------------------------

/// `xs:schema`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "@targetNamespace")]
    pub target_namespace: String,
    #[serde(rename = "@elementFormDefault")]
    pub element_form_default: String,
    #[serde(rename = "import")]
    pub imports: Vec<SchemaImport>,
    #[serde(rename = "element")]
    pub elements: Vec<SchemaElement>,
    #[serde(rename = "complexType")]
    pub complex_types: Vec<ComplexType>,
    #[serde(rename = "simpleType")]
    pub simple_types: Vec<SimpleType>,
}

/// `xs:import`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaImport {
    #[serde(rename = "@schemaLocation")]
    pub schema_location: String,
    #[serde(rename = "@namespace")]
    pub namespace: String,
}

/// `xs:element`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaElement {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type")]
    pub type_name: String,
    #[serde(rename = "@nillable")]
    pub nillable: bool,
    #[serde(rename = "@minOccurs")]
    pub min_occurs: String,
    #[serde(rename = "@maxOccurs")]
    pub max_occurs: String,
    #[serde(rename = "complexType")]
    pub complex_type: Option<ComplexType>,
    #[serde(rename = "simpleType")]
    pub simple_type: Option<SimpleType>,
    #[serde(rename = "attribute")]
    pub attributes: Vec<SchemaAttribute>,
}

/// `xs:complexType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexType {
    #[serde(rename = "@name")]
    pub name: String,
    pub sequence: Option<Sequence>,
    #[serde(rename = "attribute")]
    pub attributes: Vec<SchemaAttribute>,
}

/// `xs:sequence`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequence {
    #[serde(rename = "element")]
    pub elements: Vec<SchemaElement>,
}

/// `xs:attribute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaAttribute {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "simpleType")]
    pub simple_type: Option<SimpleType>,
}

/// `xs:simpleType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleType {
    #[serde(rename = "@name")]
    pub name: String,
    pub restriction: Option<Restriction>,
}

/// `xs:restriction` with the facets the model keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restriction {
    #[serde(rename = "@base")]
    pub base: String,
    pub pattern: Option<Facet>,
    #[serde(rename = "minInclusive")]
    pub min_inclusive: Option<Facet>,
    #[serde(rename = "maxInclusive")]
    pub max_inclusive: Option<Facet>,
}

/// A restriction facet carrying a single `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facet {
    #[serde(rename = "@value")]
    pub value: String,
}

// ---------------------------------------------------------------------------
// Messages, port types and bindings
// ---------------------------------------------------------------------------

/// `wsdl:message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "part")]
    pub parts: Vec<Part>,
}

/// `wsdl:part`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@element")]
    pub element: String,
    #[serde(rename = "@type")]
    pub type_name: String,
}

/// `wsdl:portType`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortType {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "operation")]
    pub operations: Vec<Operation>,
}

/// `wsdl:operation`, inside either a port type or a binding.
///
/// `soap_operation` is only present on binding operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    #[serde(rename = "@name")]
    pub name: String,
    pub input: Option<OperationMessage>,
    pub output: Option<OperationMessage>,
    #[serde(rename = "fault")]
    pub faults: Vec<OperationFault>,
    /// `soap:operation`; shares its local name with the enclosing element.
    #[serde(rename = "operation")]
    pub soap_operation: Option<SoapOperation>,
}

/// `wsdl:input` or `wsdl:output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationMessage {
    #[serde(rename = "@message")]
    pub message: String,
    /// `wsaw:Action`.
    #[serde(rename = "@Action")]
    pub action: String,
}

/// `wsdl:fault` of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationFault {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@message")]
    pub message: String,
    #[serde(rename = "@Action")]
    pub action: String,
}

/// `soap:operation`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapOperation {
    #[serde(rename = "@soapAction")]
    pub soap_action: String,
    #[serde(rename = "@style")]
    pub style: String,
}

/// `wsdl:binding`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Binding {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@type")]
    pub type_name: String,
    /// `soap:binding`.
    #[serde(rename = "binding")]
    pub soap_binding: Option<SoapBinding>,
    #[serde(rename = "operation")]
    pub operations: Vec<Operation>,
}

/// `soap:binding`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapBinding {
    #[serde(rename = "@transport")]
    pub transport: String,
    #[serde(rename = "@style")]
    pub style: String,
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// `wsdl:service`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "port")]
    pub ports: Vec<Port>,
}

/// `wsdl:port`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@binding")]
    pub binding: String,
    /// `soap:address`.
    #[serde(rename = "address")]
    pub addresses: Vec<SoapAddress>,
}

/// `soap:address`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapAddress {
    #[serde(rename = "@location")]
    pub location: String,
}
