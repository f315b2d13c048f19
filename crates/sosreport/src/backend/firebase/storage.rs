//! Firebase Storage blob store.

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

use super::{json_or_message, FirebaseClient};
use crate::backend::BlobStore;
use crate::error::{Error, Result};

/// Media stored as objects in the project's storage bucket.
#[derive(Debug, Clone)]
pub struct FirebaseStorage {
    client: FirebaseClient,
}

impl FirebaseStorage {
    /// Create a blob store on top of `client`.
    #[must_use]
    pub fn new(client: FirebaseClient) -> Self {
        Self { client }
    }

    fn bucket_url(&self) -> String {
        let config = self.client.config();
        format!(
            "{}/b/{}/o",
            config.storage_endpoint.trim_end_matches('/'),
            config.storage_bucket
        )
    }

    fn upload_url(&self, key: &str) -> String {
        self.client.with_key(format!(
            "{}?uploadType=media&name={}",
            self.bucket_url(),
            urlencoding::encode(key)
        ))
    }

    /// Public download URL for an uploaded object.
    ///
    /// The first download token is appended when the service issued one.
    #[must_use]
    pub fn download_url(&self, key: &str, token: Option<&str>) -> String {
        let base = format!("{}/{}?alt=media", self.bucket_url(), urlencoding::encode(key));
        match token {
            Some(token) => format!("{base}&token={token}"),
            None => base,
        }
    }
}

/// First token of the comma-separated `downloadTokens` field.
fn first_download_token(metadata: &Value) -> Option<&str> {
    metadata
        .get("downloadTokens")
        .and_then(Value::as_str)
        .and_then(|tokens| tokens.split(',').next())
        .filter(|token| !token.is_empty())
}

#[async_trait::async_trait]
impl BlobStore for FirebaseStorage {
    fn name(&self) -> &'static str {
        "firebase-storage"
    }

    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        let response = self
            .client
            .http()
            .post(self.upload_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::upload(key, e.to_string()))?;

        let metadata = json_or_message(response)
            .await
            .map_err(|message| Error::upload(key, message))?;

        debug!("Uploaded {} ({} bytes) to Firebase Storage", key, bytes.len());
        Ok(self.download_url(key, first_download_token(&metadata)))
    }
}
