use async_trait::async_trait;
use reqwest::Method;
use tracing::info;

use crate::auth::Credentials;
use crate::config::ApiOptions;
use crate::error::{Error, RemoteApiError, RemoteErrorKind, Result};
use crate::http::ApiClient;
use crate::types::{DriveFile, FileList, FileMetadata, Media};

/// Fields requested on listings: just enough to find a file again.
pub const LIST_FIELDS: &str = "nextPageToken, files(id, name)";
pub const FILE_FIELDS: &str = "id, name";

// Define a trait for the Drive v3 endpoints to allow mocking
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// One page of files matching `query`.
    async fn list_files(&self, query: &str, page_token: Option<String>) -> Result<FileList>;

    /// Creates a file from metadata, with content when `media` is given.
    async fn create_file(&self, metadata: FileMetadata, media: Option<Media>) -> Result<DriveFile>;

    async fn copy_file(&self, file_id: &str, metadata: FileMetadata) -> Result<DriveFile>;

    /// Replaces the content and metadata of an existing file. A parent in
    /// `metadata` is added to the file's parents.
    async fn update_file(
        &self,
        file_id: &str,
        metadata: FileMetadata,
        media: Media,
    ) -> Result<DriveFile>;

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;
}

/// The Drive v3 REST API.
pub struct DriveService {
    api: ApiClient,
    base_url: String,
    upload_url: String,
}

impl DriveService {
    pub fn new(client: reqwest::Client, credentials: Credentials, options: &ApiOptions) -> Self {
        info!("Instantiating google drive service");
        Self {
            api: ApiClient::new(client, credentials, options.retry.clone()),
            base_url: options.drive_base_url.trim_end_matches('/').to_string(),
            upload_url: options.drive_upload_url.trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.base_url, file_id)
    }
}

/// Body of a `multipart/related` upload: JSON metadata, then the content.
fn multipart_related(metadata: &FileMetadata, media: &Media) -> Result<(String, Vec<u8>)> {
    let boundary = format!("==============={}", uuid::Uuid::new_v4().simple());
    let metadata = serde_json::to_string(metadata).map_err(|e| {
        Error::from(RemoteApiError::new(
            RemoteErrorKind::BadRequest,
            None,
            format!("Failed to serialize metadata: {}", e),
        ))
    })?;

    let mut body = Vec::with_capacity(media.data.len() + metadata.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.mime_type).as_bytes());
    body.extend_from_slice(&media.data);
    body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());

    Ok((format!("multipart/related; boundary={}", boundary), body))
}

#[async_trait]
impl DriveApi for DriveService {
    async fn list_files(&self, query: &str, page_token: Option<String>) -> Result<FileList> {
        let mut params = vec![("q", query.to_string()), ("fields", LIST_FIELDS.to_string())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.api
            .get_json(&format!("{}/files", self.base_url), &params)
            .await
    }

    async fn create_file(&self, metadata: FileMetadata, media: Option<Media>) -> Result<DriveFile> {
        let fields = ("fields", FILE_FIELDS.to_string());
        match media {
            None => {
                self.api
                    .post_json(&format!("{}/files", self.base_url), &[fields], &metadata)
                    .await
            }
            Some(media) => {
                let (content_type, body) = multipart_related(&metadata, &media)?;
                self.api
                    .send_bytes(
                        Method::POST,
                        &format!("{}/files", self.upload_url),
                        &[("uploadType", "multipart".to_string()), fields],
                        content_type,
                        body,
                    )
                    .await
            }
        }
    }

    async fn copy_file(&self, file_id: &str, metadata: FileMetadata) -> Result<DriveFile> {
        self.api
            .post_json(
                &format!("{}/copy", self.file_url(file_id)),
                &[("fields", FILE_FIELDS.to_string())],
                &metadata,
            )
            .await
    }

    async fn update_file(
        &self,
        file_id: &str,
        mut metadata: FileMetadata,
        media: Media,
    ) -> Result<DriveFile> {
        let mut params = vec![
            ("uploadType", "multipart".to_string()),
            ("fields", FILE_FIELDS.to_string()),
        ];
        // Parents are not writable on update, they go through addParents.
        if let Some(parents) = metadata.parents.take() {
            params.push(("addParents", parents.join(",")));
        }
        let (content_type, body) = multipart_related(&metadata, &media)?;
        self.api
            .send_bytes(
                Method::PATCH,
                &format!("{}/files/{}", self.upload_url, file_id),
                &params,
                content_type,
                body,
            )
            .await
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.api
            .get_bytes(&self.file_url(file_id), &[("alt", "media".to_string())])
            .await
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.api.delete(&self.file_url(file_id)).await
    }
}
