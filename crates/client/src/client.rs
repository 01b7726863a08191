//! The SOAP client and its call pipeline.
//!
//! A call runs these steps under one lease of the current description
//! snapshot:
//!
//! 1. resolve the binding context (action, namespaces, endpoint);
//! 2. encode body and header parameters into a per-call token buffer;
//! 3. frame the envelope and write it to bytes;
//! 4. post it through the [`Transport`], bounded by the call timeout;
//! 5. unwrap the response envelope and check it for a fault.

use std::sync::Arc;
use std::time::Duration;

use protocol::{
    encode_into, parse_envelope, write_tokens, ActionResolver, BindingContext, BuildRequest,
    CallId, DescriptionFetcher, DumpLogger, EnvelopeBuilder, FirstBindingResolver, ParamValue,
    Request, Response, SoapError, TokenBuffer, Transport, TransportError, TransportRequest,
};
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::config::ClientConfig;
use crate::definitions::{DefinitionsManager, DefinitionsPhase, DefinitionsStatus};
use crate::dump::TracingDumpLogger;

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Deadline of the transport call; overrides the configured timeout.
    pub timeout: Option<Duration>,
}

/// A client bound to one service description.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and calls may
/// run concurrently.
pub struct SoapClient {
    definitions: Arc<DefinitionsManager>,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn ActionResolver>,
    dump_logger: Option<Arc<dyn DumpLogger>>,
    config: ClientConfig,
    header_params: ParamValue,
}

impl SoapClient {
    /// Starts building a client for the description at `location`.
    pub fn builder(
        location: impl Into<String>,
        fetcher: Arc<dyn DescriptionFetcher>,
        transport: Arc<dyn Transport>,
    ) -> SoapClientBuilder {
        SoapClientBuilder {
            location: location.into(),
            fetcher,
            transport,
            resolver: None,
            dump_logger: None,
            config: ClientConfig::default(),
            header_params: ParamValue::Nil,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invokes `method` with `params`.
    pub async fn call(
        &self,
        method: &str,
        params: impl Into<ParamValue>,
    ) -> Result<Response, SoapError> {
        self.call_with(Request::new(method, params), CallOptions::default())
            .await
    }

    pub async fn call_request(&self, request: Request) -> Result<Response, SoapError> {
        self.call_with(request, CallOptions::default()).await
    }

    /// Invokes the request a caller type builds for itself.
    pub async fn call_by<R: BuildRequest + ?Sized>(
        &self,
        request: &R,
    ) -> Result<Response, SoapError> {
        let request = request.build_request()?;
        self.call_request(request).await
    }

    /// Invokes `method` and binds the response body to `T`.
    pub async fn call_and_decode<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Into<ParamValue>,
    ) -> Result<T, SoapError> {
        let response = self.call(method, params).await?;
        response
            .unmarshal()
            .map_err(|err| SoapError::from_response(err, response.payload.clone()))
    }

    /// Invokes a request with per-call options.
    pub async fn call_with(
        &self,
        request: Request,
        options: CallOptions,
    ) -> Result<Response, SoapError> {
        let call_id = CallId::new_random();
        let span = tracing::info_span!(
            "soap_call",
            %call_id,
            operation = %request.method,
            endpoint = tracing::field::Empty,
        );
        let result = self.execute(request, options).instrument(span.clone()).await;
        if let Err(err) = &result {
            span.in_scope(|| tracing::warn!(error = %err, fault = err.is_fault(), "call failed"));
        }
        result
    }

    /// Points the client at another description and loads it. Waits for
    /// in-flight calls first; calls arriving meanwhile wait for the new
    /// description.
    pub async fn set_description_url(&self, location: impl Into<String>) -> Result<(), SoapError> {
        self.definitions.set_description_url(location).await
    }

    /// Re-fetches the description now.
    pub async fn refresh_definitions(&self) -> Result<(), SoapError> {
        self.definitions.refresh().await
    }

    pub fn definitions_phase(&self) -> DefinitionsPhase {
        self.definitions.phase()
    }

    pub async fn definitions_status(&self) -> DefinitionsStatus {
        self.definitions.status().await
    }

    async fn execute(&self, request: Request, options: CallOptions) -> Result<Response, SoapError> {
        let definitions = self.definitions.acquire().await?;
        let context = self.resolver.binding_context(
            &definitions,
            &request.method,
            &self.config.binding_options(),
        )?;
        tracing::Span::current().record("endpoint", context.endpoint.as_str());

        let payload = self.envelope(&request, &context)?;
        if let Some(dump) = &self.dump_logger {
            dump.log_request(&request.method, &payload);
        }

        let sent = self.transport.send(TransportRequest {
            url: context.endpoint.clone(),
            payload: payload.clone(),
            soap_action: context.action.clone(),
            credentials: self.config.credentials(),
        });
        let outcome = match options.timeout.or_else(|| self.config.call_timeout()) {
            Some(limit) => tokio::time::timeout(limit, sent)
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => sent.await,
        };
        let bytes = outcome.map_err(|source| SoapError::Transport {
            source,
            payload: payload.clone(),
        })?;

        if let Some(dump) = &self.dump_logger {
            dump.log_response(&request.method, &bytes);
        }
        tracing::debug!(bytes = bytes.len(), "response received");

        let envelope = match parse_envelope(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => return Err(SoapError::from_response(err, payload)),
        };
        let response = Response::new(envelope, payload);
        match response.fault() {
            Ok(None) => Ok(response),
            Ok(Some(fault)) => Err(SoapError::Fault {
                fault,
                payload: response.payload,
            }),
            Err(err) => Err(SoapError::from_response(err, response.payload)),
        }
    }

    fn envelope(&self, request: &Request, context: &BindingContext) -> Result<Vec<u8>, SoapError> {
        let mut body = TokenBuffer::new();
        encode_into(&mut body, &request.params, &context.body_namespace);

        let mut header = TokenBuffer::new();
        let header_params = request.header.as_ref().unwrap_or(&self.header_params);
        encode_into(&mut header, header_params, "");

        let tokens = EnvelopeBuilder::new(&self.config.envelope).build(
            header.as_slice(),
            body.as_slice(),
            &request.method,
            &context.body_namespace,
            &context.header_name,
            &context.header_namespace,
        )?;
        Ok(write_tokens(&tokens)?)
    }
}

/// Builder for [`SoapClient`].
pub struct SoapClientBuilder {
    location: String,
    fetcher: Arc<dyn DescriptionFetcher>,
    transport: Arc<dyn Transport>,
    resolver: Option<Arc<dyn ActionResolver>>,
    dump_logger: Option<Arc<dyn DumpLogger>>,
    config: ClientConfig,
    header_params: ParamValue,
}

impl SoapClientBuilder {
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the default [`FirstBindingResolver`].
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn ActionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sink for request and response bytes. Without one, a
    /// [`TracingDumpLogger`] is used when `dump` is enabled in the config.
    #[must_use]
    pub fn dump_logger(mut self, dump_logger: Arc<dyn DumpLogger>) -> Self {
        self.dump_logger = Some(dump_logger);
        self
    }

    /// Header parameters sent with every call that brings none of its own.
    #[must_use]
    pub fn header_params(mut self, header_params: impl Into<ParamValue>) -> Self {
        self.header_params = header_params.into();
        self
    }

    pub fn build(self) -> SoapClient {
        let dump_logger = match self.dump_logger {
            Some(logger) => Some(logger),
            None if self.config.dump => Some(Arc::new(TracingDumpLogger) as Arc<dyn DumpLogger>),
            None => None,
        };

        SoapClient {
            definitions: DefinitionsManager::new(
                self.fetcher,
                self.location,
                self.config.refresh_interval(),
            ),
            transport: self.transport,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(FirstBindingResolver)),
            dump_logger,
            config: self.config,
            header_params: self.header_params,
        }
    }
}
