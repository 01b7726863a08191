//! Description fetching over HTTP or from the local filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use protocol::{DescriptionError, DescriptionFetcher};
use url::Url;

/// Fetches descriptions by location.
///
/// | Location | Source |
/// |----------|--------|
/// | `http://…`, `https://…` | GET; a status outside 200..=399 is an error |
/// | `file://…` | local file named by the URL path |
/// | a path without a scheme | local file |
///
/// Anything else is [`DescriptionError::InvalidLocation`].
#[derive(Debug, Clone, Default)]
pub struct DescriptionLoader {
    client: reqwest::Client,
}

impl DescriptionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_http(&self, location: &str, url: Url) -> Result<Vec<u8>, DescriptionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| fetch_error(location, err))?;

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(DescriptionError::Status {
                location: location.to_owned(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| fetch_error(location, err))?;
        Ok(body.to_vec())
    }

    async fn fetch_file(&self, location: &str, path: PathBuf) -> Result<Vec<u8>, DescriptionError> {
        tokio::fs::read(&path)
            .await
            .map_err(|err| fetch_error(location, err))
    }
}

#[async_trait]
impl DescriptionFetcher for DescriptionLoader {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, DescriptionError> {
        if location.trim().is_empty() {
            return Err(invalid(location, "location is empty"));
        }
        if !location.contains("://") {
            return self.fetch_file(location, PathBuf::from(location)).await;
        }

        let url = Url::parse(location).map_err(|err| invalid(location, err))?;
        match url.scheme() {
            "http" | "https" => self.fetch_http(location, url).await,
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| invalid(location, "file URL does not name a local path"))?;
                self.fetch_file(location, path).await
            }
            scheme => Err(invalid(location, format!("unsupported scheme '{scheme}'"))),
        }
    }
}

fn invalid(location: &str, reason: impl ToString) -> DescriptionError {
    DescriptionError::InvalidLocation {
        location: location.to_owned(),
        reason: reason.to_string(),
    }
}

fn fetch_error(location: &str, reason: impl ToString) -> DescriptionError {
    DescriptionError::Fetch {
        location: location.to_owned(),
        reason: reason.to_string(),
    }
}
