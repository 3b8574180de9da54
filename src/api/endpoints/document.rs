use actix_web::{
    HttpRequest, HttpResponse, delete, get, post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{DocumentAddRequest, DocumentListResponse, DocumentResponse, DocumentTypeListResponse, FileResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{DocumentAddInputType, DocumentOwner},
    },
};

/*
 * City and club documents share the handling below; the endpoints only fix the owner kind.
 */

async fn document_types(http_request: &HttpRequest, app_state: &AppState, owner: DocumentOwner) -> Result<HttpResponse, ApplicationError> {
    app_state.jwt_service.validate(http_request)?;
    let document_types = app_state.documents_service.get_document_types(owner).await?;
    Ok(HttpResponse::Ok().json(DocumentTypeListResponse::from(document_types)))
}

async fn documents(http_request: &HttpRequest, app_state: &AppState, owner: DocumentOwner, owner_id: i64) -> Result<HttpResponse, ApplicationError> {
    app_state.jwt_service.validate(http_request)?;
    let documents = app_state.documents_service.get_documents(owner, owner_id).await?;
    Ok(HttpResponse::Ok().json(DocumentListResponse::from(documents)))
}

async fn document_add(http_request: &HttpRequest, app_state: &AppState, owner: DocumentOwner, owner_id: i64, request_body: web::Json<DocumentAddRequest>) -> Result<HttpResponse, ApplicationError> {
    let user = app_state.jwt_service.validate(http_request)?;
    let input = DocumentAddInputType::from(request_body).validate()?;
    let document = app_state.documents_service.add_document(&user, owner, owner_id, input).await?;
    Ok(HttpResponse::Created().json(DocumentResponse::from(document)))
}

async fn document_download(http_request: &HttpRequest, app_state: &AppState, owner: DocumentOwner, blob_name: String) -> Result<HttpResponse, ApplicationError> {
    app_state.jwt_service.validate(http_request)?;
    let content = app_state.documents_service.download_file(owner, &blob_name).await?;
    Ok(HttpResponse::Ok().json(FileResponse { blob_name, content }))
}

async fn document_delete(http_request: &HttpRequest, app_state: &AppState, owner: DocumentOwner, document_id: i64) -> Result<HttpResponse, ApplicationError> {
    let user = app_state.jwt_service.validate(http_request)?;
    app_state.documents_service.delete_file(&user, owner, document_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "getCityDocumentTypes", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/city-documents/types")]
pub async fn city_document_types(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_types(&http_request, &app_state, DocumentOwner::City).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "getCityDocuments", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/documents")]
pub async fn city_documents(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    documents(&http_request, &app_state, DocumentOwner::City, path.into_inner()).instrument(span).await
}

/**
 * Uploads a city document given as data url.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "addCityDocument", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/cities/{cityId}/documents")]
pub async fn city_document_add(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<DocumentAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_add(&http_request, &app_state, DocumentOwner::City, path.into_inner(), request_body).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "downloadCityDocument", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/city-documents/files/{blobName}")]
pub async fn city_document_download(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_download(&http_request, &app_state, DocumentOwner::City, path.into_inner()).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "deleteCityDocument", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/city-documents/{documentId}")]
pub async fn city_document_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_delete(&http_request, &app_state, DocumentOwner::City, path.into_inner()).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "getClubDocumentTypes", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/club-documents/types")]
pub async fn club_document_types(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_types(&http_request, &app_state, DocumentOwner::Club).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "getClubDocuments", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/clubs/{clubId}/documents")]
pub async fn club_documents(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    documents(&http_request, &app_state, DocumentOwner::Club, path.into_inner()).instrument(span).await
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addClubDocument", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/clubs/{clubId}/documents")]
pub async fn club_document_add(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<DocumentAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_add(&http_request, &app_state, DocumentOwner::Club, path.into_inner(), request_body).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "downloadClubDocument", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/club-documents/files/{blobName}")]
pub async fn club_document_download(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_download(&http_request, &app_state, DocumentOwner::Club, path.into_inner()).instrument(span).await
}

#[instrument(skip(http_request, app_state), fields(service = "deleteClubDocument", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/club-documents/{documentId}")]
pub async fn club_document_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    document_delete(&http_request, &app_state, DocumentOwner::Club, path.into_inner()).instrument(span).await
}
