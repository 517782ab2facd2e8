//! Supabase Storage backend
//!
//! Talks to the Storage REST API (`/storage/v1`) with the service key sent
//! both as `apikey` and as a bearer token.

use super::{ListOptions, ObjectStore, StorageEntry, UploadOptions};
use crate::error::StorageError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Supabase Storage client
pub struct SupabaseStorage {
    base_url: Url,
    service_key: String,
    client: Client,
}

impl SupabaseStorage {
    /// Create a client for the project at `project_url`
    pub fn new(project_url: &str, service_key: impl Into<String>) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Self::with_client(project_url, service_key, client)
    }

    pub fn with_client(
        project_url: &str,
        service_key: impl Into<String>,
        client: Client,
    ) -> Result<Self, StorageError> {
        let base_url = Url::parse(project_url.trim_end_matches('/'))
            .map_err(|e| StorageError::InvalidRequest(format!("invalid storage URL '{}': {}", project_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::InvalidRequest(format!(
                "storage URL '{}' cannot be used as a base",
                project_url
            )));
        }
        Ok(Self {
            base_url,
            service_key: service_key.into(),
            client,
        })
    }

    /// `{base}/storage/v1/object/{segments...}` with each segment escaped
    fn object_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidRequest("storage URL cannot be a base".to_string()))?;
            path.pop_if_empty().extend(["storage", "v1", "object"]);
            for segment in segments {
                path.extend(segment.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn check(response: Response, bucket: &str, path: &str) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                path: path.to_string(),
            });
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StorageError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn list(
        &self,
        bucket: &str,
        prefix: &str,
        options: ListOptions,
    ) -> Result<Vec<StorageEntry>, StorageError> {
        let url = self.object_url(["list", bucket])?;
        let body = json!({
            "prefix": prefix,
            "limit": options.limit,
            "offset": options.offset,
            "sortBy": { "column": "name", "order": "asc" },
        });
        debug!("Listing {}/{} (offset {})", bucket, prefix, options.offset);

        let response = self.authorized(self.client.post(url)).json(&body).send().await?;
        let response = Self::check(response, bucket, prefix).await?;
        Ok(response.json::<Vec<StorageEntry>>().await?)
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url([bucket, path])?;
        let response = self.authorized(self.client.get(url)).send().await?;
        let response = Self::check(response, bucket, path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        let url = self.object_url([bucket, path])?;
        let response = self
            .authorized(self.client.post(url))
            .header("content-type", &options.content_type)
            .header("cache-control", &options.cache_control)
            .header("x-upsert", if options.overwrite { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;
        Self::check(response, bucket, path).await?;
        Ok(())
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.object_url([bucket])?;
        let response = self
            .authorized(self.client.delete(url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;
        Self::check(response, bucket, &paths.join(",")).await?;
        Ok(())
    }
}
