use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::instrument;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Storage for uploaded files. Blobs are grouped in containers.
 */
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /**
     * Stores the contents under the blob name, replacing an existing blob.
     */
    async fn upload(&self, container: &str, blob_name: &str, contents: &[u8]) -> Result<(), ApplicationError>;

    /**
     * Reads a blob.
     */
    async fn get(&self, container: &str, blob_name: &str) -> Result<Vec<u8>, ApplicationError>;

    /**
     * Deletes a blob. Deleting a missing blob yields `NotFound`.
     */
    async fn delete(&self, container: &str, blob_name: &str) -> Result<(), ApplicationError>;

    /**
     * Decodes base64 contents and stores them.
     */
    async fn upload_base64(&self, container: &str, blob_name: &str, base64: &str) -> Result<(), ApplicationError> {
        let contents = STANDARD.decode(base64.trim()).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid base64 content: {err}")))?;
        self.upload(container, blob_name, &contents).await
    }

    /**
     * Reads a blob and encodes it as base64.
     */
    async fn get_base64(&self, container: &str, blob_name: &str) -> Result<String, ApplicationError> {
        let contents = self.get(container, blob_name).await?;
        Ok(STANDARD.encode(contents))
    }
}

/**
 * Blob storage on the local filesystem. Each container is a directory below the root.
 */
pub struct FileSystemBlobStorage {
    root: PathBuf,
}

impl FileSystemBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSystemBlobStorage { root: root.into() }
    }

    /**
     * Resolves the path of a blob. Names must be single path components.
     */
    fn blob_path(&self, container: &str, blob_name: &str) -> Result<PathBuf, ApplicationError> {
        validate_name(container)?;
        validate_name(blob_name)?;
        Ok(self.root.join(container).join(blob_name))
    }
}

fn validate_name(name: &str) -> Result<(), ApplicationError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) || Path::new(name).is_absolute() {
        return Err(ApplicationError::new(ErrorType::Validation, format!("Invalid blob name {name}")));
    }
    Ok(())
}

fn map_io_error(err: std::io::Error, blob_name: &str) -> ApplicationError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return ApplicationError::not_found(&format!("Blob {blob_name}"));
    }
    ApplicationError::new(ErrorType::BlobStorage, format!("Blob storage failure for {blob_name}: {err}"))
}

#[async_trait]
impl BlobStorage for FileSystemBlobStorage {
    #[instrument(skip(self, contents), fields(size = contents.len()))]
    async fn upload(&self, container: &str, blob_name: &str, contents: &[u8]) -> Result<(), ApplicationError> {
        let path = self.blob_path(container, blob_name)?;
        tokio::fs::create_dir_all(self.root.join(container)).await.map_err(|err| map_io_error(err, container))?;
        tokio::fs::write(&path, contents).await.map_err(|err| map_io_error(err, blob_name))?;
        tracing::debug!("Stored blob {} in {}", blob_name, container);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, container: &str, blob_name: &str) -> Result<Vec<u8>, ApplicationError> {
        let path = self.blob_path(container, blob_name)?;
        tokio::fs::read(&path).await.map_err(|err| map_io_error(err, blob_name))
    }

    #[instrument(skip(self))]
    async fn delete(&self, container: &str, blob_name: &str) -> Result<(), ApplicationError> {
        let path = self.blob_path(container, blob_name)?;
        tokio::fs::remove_file(&path).await.map_err(|err| map_io_error(err, blob_name))
    }
}
