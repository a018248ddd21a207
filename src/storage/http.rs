//! S3-compatible HTTP object store (path-style addressing)

use super::{ObjectLocation, ObjectStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use url::Url;

/// Object store speaking plain GET/PUT against `{endpoint}/{bucket}/{key}`
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: Url,
    token: Option<String>,
    max_download_bytes: u64,
    client: reqwest::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: &str, token: Option<String>, max_download_bytes: u64) -> Result<Self> {
        let mut endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Configuration {
                reason: format!("Storage endpoint cannot be a base URL: {}", endpoint),
            });
        }
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            endpoint,
            token,
            max_download_bytes,
            client,
        })
    }

    /// URL of an object, each key segment percent-encoded
    fn object_url(&self, location: &ObjectLocation) -> Result<Url> {
        if location.bucket.is_empty() || location.bucket.contains('/') {
            return Err(Error::PathAccessDenied {
                path: location.to_string(),
            });
        }
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| Error::Configuration {
                reason: "Storage endpoint cannot be a base URL".to_string(),
            })?;
            segments.pop_if_empty();
            segments.push(&location.bucket);
            segments.extend(location.key.split('/'));
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let url = self.object_url(location)?;
        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ObjectNotFound {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
            });
        }
        if !response.status().is_success() {
            return Err(Error::Storage {
                reason: format!("GET {} failed with status: {}", location, response.status()),
            });
        }

        // Check Content-Length header for early rejection
        if let Some(content_length) = response.content_length() {
            if content_length > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: content_length,
                    max_size: self.max_download_bytes,
                });
            }
        }

        // Stream the body with incremental size checking to bound memory
        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::HttpRequest)?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: data.len() as u64,
                    max_size: self.max_download_bytes,
                });
            }
        }

        Ok(data)
    }

    async fn store(&self, location: &ObjectLocation, data: Vec<u8>) -> Result<()> {
        let url = self.object_url(location)?;
        let response = self
            .authorize(self.client.put(url))
            .header(reqwest::header::CONTENT_TYPE, "application/pdf")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Storage {
                reason: format!("PUT {} failed with status: {}", location, response.status()),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}
