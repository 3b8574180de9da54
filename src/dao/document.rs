use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{expect_single_row, handle_database_error},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{DocumentDetailType, DocumentOwner, DocumentType},
    },
};

/**
 * Database response type for querying documents.
 */
pub type QueryDocumentDbResp = (i64, i64, i64, String, String, String, Option<DateTime<Utc>>);

/**
 * Table names for one kind of document owner.
 */
struct DocumentTables {
    documents: &'static str,
    types: &'static str,
    owner_column: &'static str,
}

fn tables(owner: DocumentOwner) -> DocumentTables {
    match owner {
        DocumentOwner::City => DocumentTables { documents: "city_documents", types: "city_document_types", owner_column: "city_id" },
        DocumentOwner::Club => DocumentTables { documents: "club_documents", types: "club_document_types", owner_column: "club_id" },
    }
}

impl From<QueryDocumentDbResp> for DocumentDetailType {
    fn from(row: QueryDocumentDbResp) -> Self {
        DocumentDetailType { id: row.0, owner_id: row.1, document_type: DocumentType { id: row.2, name: row.3 }, blob_name: row.4, file_name: row.5, submit_date: row.6 }
    }
}

/**
 * DAO for city and club documents. The owner selects the tables.
 */
pub struct DocumentDao {}

impl DocumentDao {
    pub fn new() -> Self {
        DocumentDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_document_types(&self, connection: &mut PgConnection, owner: DocumentOwner) -> Result<Vec<DocumentType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("SELECT id, name FROM {} ORDER BY name", tables(owner).types);
        let results: Vec<(i64, String)> = sqlx::query_as(&query)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get document types: {err}")))?;
        Ok(results.into_iter().map(|(id, name)| DocumentType { id, name }).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_documents(&self, connection: &mut PgConnection, owner: DocumentOwner, owner_id: i64) -> Result<Vec<DocumentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let tables = tables(owner);
        let query = format!(
            "SELECT d.id, d.{owner_column}, t.id, t.name, d.blob_name, d.file_name, d.submit_date FROM {documents} d JOIN {types} t ON t.id = d.document_type_id WHERE d.{owner_column} = $1 ORDER BY d.id",
            owner_column = tables.owner_column,
            documents = tables.documents,
            types = tables.types
        );
        let results: Vec<QueryDocumentDbResp> = sqlx::query_as(&query)
            .bind(owner_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get documents: {err}")))?;
        Ok(results.into_iter().map(DocumentDetailType::from).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_document(&self, connection: &mut PgConnection, owner: DocumentOwner, document_id: i64) -> Result<Option<DocumentDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let tables = tables(owner);
        let query = format!(
            "SELECT d.id, d.{owner_column}, t.id, t.name, d.blob_name, d.file_name, d.submit_date FROM {documents} d JOIN {types} t ON t.id = d.document_type_id WHERE d.id = $1",
            owner_column = tables.owner_column,
            documents = tables.documents,
            types = tables.types
        );
        let result: Option<QueryDocumentDbResp> = sqlx::query_as(&query)
            .bind(document_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get document: {err}")))?;
        Ok(result.map(DocumentDetailType::from))
    }

    /**
     * Adds a document row referencing an uploaded blob.
     *
     * # Returns
     * The id of the new document.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_document(
        &self,
        transaction: &mut PgConnection,
        owner: DocumentOwner,
        owner_id: i64,
        document_type_id: i64,
        blob_name: &str,
        file_name: &str,
        submit_date: Option<DateTime<Utc>>,
    ) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let tables = tables(owner);
        let query = format!(
            "INSERT INTO {} ({}, document_type_id, blob_name, file_name, submit_date) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            tables.documents, tables.owner_column
        );
        let id: (i64,) = sqlx::query_as(&query)
            .bind(owner_id)
            .bind(document_type_id)
            .bind(blob_name)
            .bind(file_name)
            .bind(submit_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_document(&self, transaction: &mut PgConnection, owner: DocumentOwner, document_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("DELETE FROM {} WHERE id = $1", tables(owner).documents);
        let result = sqlx::query(&query)
            .bind(document_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete document: {err}")))?;
        expect_single_row(result.rows_affected(), "Document")
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::test_support::{init_db, insert_club};

    #[sqlx::test]
    async fn test_add_then_delete_club_document() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = DocumentDao::new();
        let club_id = insert_club(&mut transaction, "Document Club").await;
        let type_id: (i64,) = sqlx::query_as("INSERT INTO club_document_types (name) VALUES ('Statute') RETURNING id").fetch_one(&mut *transaction).await.unwrap();
        assert!(dao.get_document_types(&mut transaction, DocumentOwner::Club).await.unwrap().iter().any(|t| t.name == "Statute"));
        let document_id = dao.add_document(&mut transaction, DocumentOwner::Club, club_id, type_id.0, "blob.pdf", "statute.pdf", None).await.unwrap();
        let documents = dao.get_documents(&mut transaction, DocumentOwner::Club, club_id).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].blob_name, "blob.pdf");
        dao.delete_document(&mut transaction, DocumentOwner::Club, document_id).await.unwrap();
        assert!(dao.get_document(&mut transaction, DocumentOwner::Club, document_id).await.unwrap().is_none());
        transaction.rollback().await.unwrap();
    }
}
