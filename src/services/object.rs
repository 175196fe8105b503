use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::warn;

use crate::{config::AppConfig, error::AppError, models::trip::NewImage};

/// Binary-attachment side of the trip lifecycle: a named bucket reachable
/// over HTTP, addressed by `{owner_id}/{unix_millis}-{file_name}` paths.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads the files one at a time, in input order, and returns one
    /// public URL per file. Aborts on the first failed upload; files stored
    /// before the failure are not rolled back.
    async fn upload(&self, files: &[NewImage], owner_id: &str) -> Result<Vec<String>, AppError>;
    /// Removes the objects behind the given public URLs. No backend call at
    /// all for an empty slice.
    async fn remove(&self, urls: &[String]) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpObjectStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.object_store_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.object_store_key.clone(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            request
        } else {
            request.bearer_auth(&self.api_key)
        }
    }
}

/// Maps a public URL back to its storage path by stripping everything up to
/// and including the bucket segment. `None` when the URL never mentions the
/// bucket.
pub fn object_path<'a>(url: &'a str, bucket: &str) -> Option<&'a str> {
    let marker = format!("{bucket}/");
    url.split_once(marker.as_str())
        .map(|(_, path)| path)
        .filter(|path| !path.is_empty())
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, files: &[NewImage], owner_id: &str) -> Result<Vec<String>, AppError> {
        let mut urls = Vec::with_capacity(files.len());

        for file in files {
            let path = format!(
                "{owner_id}/{}-{}",
                Utc::now().timestamp_millis(),
                file.file_name
            );
            let response = self
                .authorize(self.client.post(self.object_url(&path)))
                .header(reqwest::header::CONTENT_TYPE, &file.content_type)
                .body(file.bytes.clone())
                .send()
                .await
                .map_err(|err| AppError::Storage(format!("upload of {path} failed: {err}")))?;

            if !response.status().is_success() {
                return Err(AppError::Storage(format!(
                    "upload of {path} rejected: {}",
                    response.status()
                )));
            }

            urls.push(self.public_url(&path));
        }

        Ok(urls)
    }

    async fn remove(&self, urls: &[String]) -> Result<(), AppError> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut paths = Vec::with_capacity(urls.len());
        for url in urls {
            match object_path(url, &self.bucket) {
                Some(path) => paths.push(path.to_string()),
                // A URL from outside our bucket cannot be mapped to a path;
                // skip it rather than handing the backend garbage.
                None => warn!(%url, "skipping removal of URL outside bucket"),
            }
        }
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .authorize(
                self.client
                    .delete(format!("{}/object/{}", self.base_url, self.bucket)),
            )
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|err| AppError::Storage(format!("image removal failed: {err}")))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "image removal rejected: {}",
                response.status()
            )));
        }

        Ok(())
    }
}
