//! Remote blob channel.
//!
//! The sync engine treats the cloud side as an opaque keyed file store:
//! resolve-or-create a file by name, read the whole blob, overwrite the
//! whole blob. [`HttpBlobStore`] implements this against a Drive-style
//! REST API with an app-data folder; tests use [`MemoryBlobStore`].

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use super::SyncError;

/// Opaque remote file store holding the cloud snapshot.
#[async_trait]
pub trait RemoteBlobChannel: Send + Sync {
    /// Return the id of the named file, creating it if absent.
    async fn resolve_or_create_file(&self, name: &str) -> Result<String, SyncError>;

    /// Read the full file contents. `None` means the file exists but has
    /// never been written (first-ever sync).
    async fn read_file(&self, file_id: &str) -> Result<Option<Vec<u8>>, SyncError>;

    /// Overwrite the full file contents.
    async fn write_file(&self, file_id: &str, contents: Vec<u8>) -> Result<(), SyncError>;
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileMetadata>,
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: String,
}

/// Drive-style HTTP blob store scoped to the application data folder.
pub struct HttpBlobStore {
    client: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
    access_token: String,
}

impl HttpBlobStore {
    pub fn new(api_base_url: String, upload_base_url: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url,
            upload_base_url,
            access_token,
        }
    }
}

#[async_trait]
impl RemoteBlobChannel for HttpBlobStore {
    async fn resolve_or_create_file(&self, name: &str) -> Result<String, SyncError> {
        let name_query = format!("name = '{}'", name);
        let response = self
            .client
            .get(format!("{}/files", self.api_base_url))
            .bearer_auth(&self.access_token)
            .query(&[
                ("spaces", "appDataFolder"),
                ("fields", "files(id, name)"),
                ("q", name_query.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SyncError::Protocol(format!(
                "file list failed with status {}",
                response.status()
            )));
        }
        let list: FileList = response.json().await?;
        if let Some(file) = list.files.into_iter().next() {
            debug!("Resolved remote snapshot file {}", file.id);
            return Ok(file.id);
        }

        // Not found: create it in the app data folder.
        let response = self
            .client
            .post(format!("{}/files", self.api_base_url))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "name": name,
                "parents": ["appDataFolder"],
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SyncError::Protocol(format!(
                "file create failed with status {}",
                response.status()
            )));
        }
        let created: FileMetadata = response.json().await?;
        debug!("Created remote snapshot file {}", created.id);
        Ok(created.id)
    }

    async fn read_file(&self, file_id: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let response = self
            .client
            .get(format!("{}/files/{}", self.api_base_url, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SyncError::Protocol(format!(
                "file download failed with status {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }

    async fn write_file(&self, file_id: &str, contents: Vec<u8>) -> Result<(), SyncError> {
        let response = self
            .client
            .patch(format!("{}/files/{}", self.upload_base_url, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(contents)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SyncError::Protocol(format!(
                "file upload failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
