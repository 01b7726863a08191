//! Per-call resolution of action, namespaces and endpoint.

use super::model::Definitions;
use crate::errors::SoapError;

/// Client-level switches that influence resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOptions {
    /// Construct a `SOAPAction` when the description declares none.
    pub auto_action: bool,
    /// Name of the element wrapping header parameters. Empty means none.
    pub header_name: String,
}

/// Everything a call needs from the description, computed fresh per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingContext {
    /// `SOAPAction` header value; `None` omits the header.
    pub action: Option<String>,
    pub body_namespace: String,
    pub endpoint: String,
    pub header_name: String,
    pub header_namespace: String,
}

/// Resolves binding-specific details of an operation.
///
/// Implement this to override how actions, namespaces or endpoints are picked
/// from a description. [`FirstBindingResolver`] is the default.
pub trait ActionResolver: Send + Sync {
    /// Declared `SOAPAction` of `operation`, empty when none is declared.
    fn soap_action(&self, definitions: &Definitions, operation: &str) -> String;

    /// Namespace of the element wrapping the body parameters.
    fn body_namespace(&self, definitions: &Definitions, operation: &str) -> String;

    /// Namespace of the element wrapping the header parameters.
    fn header_namespace(&self, definitions: &Definitions) -> String;

    /// Address the envelope is posted to.
    fn endpoint(&self, definitions: &Definitions) -> Option<String>;

    /// Assembles the binding context of one call.
    ///
    /// # Errors
    ///
    /// [`SoapError::NoServiceDefined`] when the description has no endpoint.
    fn binding_context(
        &self,
        definitions: &Definitions,
        operation: &str,
        options: &BindingOptions,
    ) -> Result<BindingContext, SoapError> {
        let endpoint = self
            .endpoint(definitions)
            .ok_or(SoapError::NoServiceDefined)?;

        let mut action = self.soap_action(definitions, operation);
        if action.is_empty() && options.auto_action {
            action = auto_action(definitions, operation);
        }

        Ok(BindingContext {
            action: (!action.is_empty()).then_some(action),
            body_namespace: self.body_namespace(definitions, operation),
            endpoint,
            header_name: options.header_name.clone(),
            header_namespace: self.header_namespace(definitions),
        })
    }
}

/// `{targetNamespace without trailing '/'}/{first service}/{operation}`.
fn auto_action(definitions: &Definitions, operation: &str) -> String {
    let service = definitions
        .services
        .first()
        .map(|service| service.name.as_str())
        .unwrap_or_default();
    format!(
        "{}/{}/{}",
        definitions.target_namespace.trim_end_matches('/'),
        service,
        operation
    )
}

/// Resolves everything from the first binding, the first schema and the first
/// service port of the description.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstBindingResolver;

impl ActionResolver for FirstBindingResolver {
    fn soap_action(&self, definitions: &Definitions, operation: &str) -> String {
        definitions
            .find_binding_operation(operation)
            .and_then(|operation| operation.soap_operation.as_ref())
            .map(|soap| soap.soap_action.clone())
            .unwrap_or_default()
    }

    fn body_namespace(&self, definitions: &Definitions, _operation: &str) -> String {
        let Some(schema) = definitions.first_schema() else {
            return String::new();
        };
        if !schema.target_namespace.is_empty() {
            return schema.target_namespace.clone();
        }
        schema
            .imports
            .first()
            .map(|import| import.namespace.clone())
            .unwrap_or_default()
    }

    fn header_namespace(&self, definitions: &Definitions) -> String {
        definitions
            .first_schema()
            .map(|schema| schema.target_namespace.clone())
            .unwrap_or_default()
    }

    fn endpoint(&self, definitions: &Definitions) -> Option<String> {
        definitions.service_url().map(str::to_owned)
    }
}
