//! HTTP envelope transport.

use async_trait::async_trait;
use protocol::{Transport, TransportError, TransportRequest, ACCEPT_TYPE, SOAP_CONTENT_TYPE};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

/// Posts envelopes with a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, TLS roots, connection timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Vec<u8>, TransportError> {
        let url = Url::parse(&request.url).map_err(|err| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason: err.to_string(),
        })?;

        let mut builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(ACCEPT, ACCEPT_TYPE)
            .body(request.payload);
        if let Some(action) = &request.soap_action {
            builder = builder.header("SOAPAction", action);
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = builder.send().await.map_err(|err| request_error(&request.url, err))?;
        let status = response.status();
        tracing::debug!(url = %request.url, status = status.as_u16(), "envelope posted");

        if !(200..400).contains(&status.as_u16()) {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| request_error(&request.url, err))?;
        Ok(body.to_vec())
    }
}

fn request_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    TransportError::Request {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use protocol::Credentials;

    fn request(url: String) -> TransportRequest {
        TransportRequest {
            url,
            payload: b"<soap:Envelope/>".to_vec(),
            soap_action: None,
            credentials: None,
        }
    }

    #[tokio::test]
    async fn posts_the_envelope_with_soap_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/service")
            .match_header("content-type", "text/xml;charset=UTF-8")
            .match_header("accept", "text/xml")
            .match_header("soapaction", "urn:checkVat")
            .match_header("authorization", Matcher::Missing)
            .match_body("<soap:Envelope/>")
            .with_status(200)
            .with_body("<response/>")
            .create_async()
            .await;

        let mut request = request(format!("{}/service", server.url()));
        request.soap_action = Some("urn:checkVat".into());
        let body = HttpTransport::new().send(request).await.expect("post succeeds");

        assert_eq!(body, b"<response/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_the_action_header_when_absent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/service")
            .match_header("soapaction", Matcher::Missing)
            .with_status(200)
            .create_async()
            .await;

        HttpTransport::new()
            .send(request(format!("{}/service", server.url())))
            .await
            .expect("post succeeds");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_basic_auth_when_credentials_are_set() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/service")
            .match_header("authorization", "Basic dXNlcjpwYXNz")
            .with_status(200)
            .create_async()
            .await;

        let mut request = request(format!("{}/service", server.url()));
        request.credentials = Credentials::new("user", "pass");
        HttpTransport::new().send(request).await.expect("post succeeds");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_transport_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/service")
            .with_status(500)
            .with_body("<soap:Fault/>")
            .create_async()
            .await;

        let err = HttpTransport::new()
            .send(request(format!("{}/service", server.url())))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Status { status: 500 });
    }

    #[tokio::test]
    async fn redirect_statuses_are_not_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/service")
            .with_status(304)
            .create_async()
            .await;

        let body = HttpTransport::new()
            .send(request(format!("{}/service", server.url())))
            .await
            .expect("3xx is accepted");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn rejects_an_unparsable_endpoint() {
        let err = HttpTransport::new()
            .send(request("not a url".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
