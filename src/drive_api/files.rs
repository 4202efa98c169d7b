//! High-level Drive operations.
//!
//! Every operation takes an optional service handle; when it is `None` the
//! facade's default service is used, which is built on first use.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::expand_home;
use crate::defaults::DeferredDefault;
use crate::error::{Error, Result};
use crate::pagination::{collect_pages, Page};
use crate::types::{DriveFile, FileMetadata, Media};

use super::service::DriveApi;

pub type DriveHandle = Arc<dyn DriveApi>;

const UPLOAD_MIME_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
pub struct Drive {
    service: DeferredDefault<DriveHandle>,
}

impl Drive {
    pub fn new(service: DeferredDefault<DriveHandle>) -> Self {
        Self { service }
    }

    /// Operations that default to an already built service.
    pub fn with_service(service: DriveHandle) -> Self {
        Self::new(DeferredDefault::value("service", service))
    }

    /// All files matching `query`, across every result page. Empty when
    /// nothing accessible matches.
    ///
    /// Query syntax: https://developers.google.com/drive/api/v3/search-parameters
    pub async fn get_files(&self, query: &str, service: Option<DriveHandle>) -> Result<Vec<DriveFile>> {
        self.service
            .apply(service, |service| async move {
                info!("Getting files");
                debug!("Query: {}", query);
                collect_pages(|page_token| {
                    let service = Arc::clone(&service);
                    async move {
                        let list = service.list_files(query, page_token).await?;
                        Ok::<_, Error>(Page::new(list.files, list.next_page_token))
                    }
                })
                .await
            })
            .await
    }

    pub async fn create_folder(&self, folder_name: &str, service: Option<DriveHandle>) -> Result<DriveFile> {
        self.service
            .apply(service, |service| async move {
                info!("Creating folder");
                debug!("Folder name: {}", folder_name);
                service
                    .create_file(FileMetadata::folder(folder_name), None)
                    .await
            })
            .await
    }

    /// Duplicates a file. Without a parent folder the copy lands at the root
    /// of the drive.
    pub async fn copy_file(
        &self,
        source_file_id: &str,
        new_file_name: &str,
        parent_folder_id: Option<&str>,
        service: Option<DriveHandle>,
    ) -> Result<DriveFile> {
        self.service
            .apply(service, |service| async move {
                info!("Copying file");
                debug!("Source: {}, new name: {}", source_file_id, new_file_name);
                let metadata = FileMetadata::named(new_file_name).in_folder(parent_folder_id);
                service.copy_file(source_file_id, metadata).await
            })
            .await
    }

    /// Uploads a local file into a new drive file, named after the local
    /// file unless `file_name` is given.
    pub async fn create_file(
        &self,
        source_file_path: &Path,
        file_name: Option<&str>,
        parent_folder_id: Option<&str>,
        service: Option<DriveHandle>,
    ) -> Result<DriveFile> {
        self.service
            .apply(service, |service| async move {
                info!("Creating file");
                let (metadata, media) =
                    read_upload(source_file_path, file_name, parent_folder_id).await?;
                service.create_file(metadata, Some(media)).await
            })
            .await
    }

    /// Replaces the content of an existing drive file with a local file.
    pub async fn update_file(
        &self,
        source_file_path: &Path,
        file_id: &str,
        file_name: Option<&str>,
        parent_folder_id: Option<&str>,
        service: Option<DriveHandle>,
    ) -> Result<DriveFile> {
        self.service
            .apply(service, |service| async move {
                info!("Updating file");
                debug!("File id: {}", file_id);
                let (metadata, media) =
                    read_upload(source_file_path, file_name, parent_folder_id).await?;
                service.update_file(file_id, metadata, media).await
            })
            .await
    }

    pub async fn download_file(&self, file_id: &str, service: Option<DriveHandle>) -> Result<Vec<u8>> {
        self.service
            .apply(service, |service| async move {
                info!("Downloading file");
                debug!("File id: {}", file_id);
                service.download_file(file_id).await
            })
            .await
    }

    pub async fn delete_file(&self, file_id: &str, service: Option<DriveHandle>) -> Result<()> {
        self.service
            .apply(service, |service| async move {
                info!("Deleting file");
                debug!("File id: {}", file_id);
                service.delete_file(file_id).await
            })
            .await
    }
}

async fn read_upload(
    source_file_path: &Path,
    file_name: Option<&str>,
    parent_folder_id: Option<&str>,
) -> Result<(FileMetadata, Media)> {
    let path = expand_home(source_file_path);
    let name = match file_name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::configuration(format!("{} has no file name", path.display()))
            })?,
    };
    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::local_io(&path, e))?;

    let metadata = FileMetadata::named(name).in_folder(parent_folder_id);
    let media = Media {
        mime_type: UPLOAD_MIME_TYPE.to_string(),
        data,
    };
    Ok((metadata, media))
}
