use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{AnnualReportAddRequest, AnnualReportEditRequest, AnnualReportListResponse, AnnualReportResponse, CheckCreatedResponse, IdResponse},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{AnnualReportAddInputType, AnnualReportEditInputType},
    },
};

/**
 * Lists the annual reports of all cities the caller has access to.
 */
#[instrument(skip(http_request, app_state), fields(service = "listAnnualReports", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/annual-reports")]
pub async fn annual_report_list(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let reports = app_state.annual_report_service.get_all(&user).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AnnualReportListResponse::from(reports)))
}

#[instrument(skip(http_request, app_state), fields(service = "getAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/annual-reports/{annualReportId}")]
pub async fn annual_report_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let report = app_state.annual_report_service.get_by_id(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AnnualReportResponse::from(report)))
}

/**
 * Creates an annual report for a city.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "addAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/annual-reports")]
pub async fn annual_report_add(http_request: HttpRequest, request_body: web::Json<AnnualReportAddRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AnnualReportAddInputType::from(request_body).validate()?;
    let id = app_state.annual_report_service.create(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "editAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/annual-reports/{annualReportId}")]
pub async fn annual_report_edit(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<AnnualReportEditRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AnnualReportEditInputType::from(request_body).validate()?;
    app_state.annual_report_service.edit(&user, path.into_inner(), input).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "confirmAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/annual-reports/{annualReportId}/confirm")]
pub async fn annual_report_confirm(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.annual_report_service.confirm(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "cancelAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/annual-reports/{annualReportId}/cancel")]
pub async fn annual_report_cancel(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.annual_report_service.cancel(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "deleteAnnualReport", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/annual-reports/{annualReportId}")]
pub async fn annual_report_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.annual_report_service.delete(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Whether a new annual report for the city would be rejected.
 */
#[instrument(skip(http_request, app_state), fields(service = "checkAnnualReportCreated", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/annual-reports/created")]
pub async fn annual_report_check_created(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let created = app_state.annual_report_service.check_created(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CheckCreatedResponse { created }))
}
