use std::sync::Arc;

use sqlx::{Pool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    dao::document::DocumentDao,
    integration::blobstorage::BlobStorage,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AuthenticatedUser, DocumentAddInputType, DocumentDetailType, DocumentOwner, DocumentType},
    },
    service::{
        access::AccessService,
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for documents of cities and clubs. File contents live in blob storage, one container per
 * owner kind; the database keeps the blob name.
 */
pub struct DocumentsService {
    document_dao: DocumentDao,
    blob_storage: Arc<dyn BlobStorage>,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl DocumentsService {
    pub fn new(document_dao: DocumentDao, blob_storage: Arc<dyn BlobStorage>, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        DocumentsService { document_dao, blob_storage, access_service, connection_pool }
    }

    pub async fn get_document_types(&self, owner: DocumentOwner) -> Result<Vec<DocumentType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.document_dao.get_document_types(&mut connection, owner).await
    }

    pub async fn get_documents(&self, owner: DocumentOwner, owner_id: i64) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.document_dao.get_documents(&mut connection, owner, owner_id).await
    }

    /**
     * Stores an uploaded document. The data url payload is written to a new blob named after a
     * random uuid and the extension of the file name.
     *
     * # Returns
     * The stored document.
     */
    #[instrument(skip(self, input), fields(file_name = %input.file_name))]
    pub async fn add_document(&self, user: &AuthenticatedUser, owner: DocumentOwner, owner_id: i64, input: DocumentAddInputType) -> Result<DocumentDetailType, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<DocumentDetailType, ApplicationError> = async {
            self.access_service.ensure_owner_access(&mut transaction, user, owner, owner_id).await?;
            let document_type = self
                .document_dao
                .get_document_types(&mut transaction, owner)
                .await?
                .into_iter()
                .find(|document_type| document_type.name == input.document_type_name)
                .ok_or_else(|| ApplicationError::new(ErrorType::Validation, format!("Unknown document type {}", input.document_type_name)))?;
            let blob_name = format!("{}{}", Uuid::new_v4(), input.extension());
            let id = self.document_dao.add_document(&mut transaction, owner, owner_id, document_type.id, &blob_name, &input.file_name, input.submit_date).await?;
            self.blob_storage.upload_base64(owner.container(), &blob_name, input.base64_payload()?).await?;
            self.document_dao.get_document(&mut transaction, owner, id).await?.ok_or_else(|| ApplicationError::not_found("Document"))
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Reads a stored file as base64.
     */
    pub async fn download_file(&self, owner: DocumentOwner, blob_name: &str) -> Result<String, ApplicationError> {
        self.blob_storage.get_base64(owner.container(), blob_name).await
    }

    /**
     * Deletes a document row and its blob. A blob that is already gone does not block the delete.
     */
    #[instrument(skip(self))]
    pub async fn delete_file(&self, user: &AuthenticatedUser, owner: DocumentOwner, document_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let document = self.document_dao.get_document(&mut transaction, owner, document_id).await?.ok_or_else(|| ApplicationError::not_found("Document"))?;
            self.access_service.ensure_owner_access(&mut transaction, user, owner, document.owner_id).await?;
            match self.blob_storage.delete(owner.container(), &document.blob_name).await {
                Err(err) if err.error_type == ErrorType::NotFound => tracing::warn!("Blob {} of document {} was already removed", document.blob_name, document_id),
                other => other?,
            }
            self.document_dao.delete_document(&mut transaction, owner, document_id).await
        }
        .await;
        finish(transaction, result).await
    }
}
