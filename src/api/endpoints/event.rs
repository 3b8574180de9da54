use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{
            EventCategoryListResponse, EventListRequest, EventListResponse, EventRequest, EventResponse, EventTypeListResponse, IdResponse, NameFilterRequest, PaginationQuery, StatusIdResponse,
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{EventFilterType, EventInputType, PaginationInput},
    },
};

#[instrument(skip(http_request, app_state), fields(service = "getEventTypes", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/event-types")]
pub async fn event_types(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let event_types = app_state.event_service.get_event_types().instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventTypeListResponse::from(event_types)))
}

#[instrument(skip(http_request, app_state), fields(service = "getEventCategories", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/event-categories")]
pub async fn event_categories(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let categories = app_state.event_service.get_categories().instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventCategoryListResponse::from(categories)))
}

#[instrument(skip(http_request, app_state), fields(service = "getEventCategoriesByType", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/event-types/{eventTypeId}/categories")]
pub async fn event_categories_by_type(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let categories = app_state.event_service.get_categories_by_type(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventCategoryListResponse::from(categories)))
}

/**
 * Pages through the categories of an event type, optionally filtered by name.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "listEventCategoriesByType", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/event-types/{eventTypeId}/categories:list")]
pub async fn event_categories_by_type_page(
    path: Path<i64>,
    http_request: HttpRequest,
    request_body: web::Json<NameFilterRequest>,
    pagination: web::Query<PaginationQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.event_service.get_categories_by_type_page(path.into_inner(), pagination_input, request_body.into_inner().name).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventCategoryListResponse::from(output)))
}

#[instrument(skip(http_request, app_state), fields(service = "getEventStatusId", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/event-statuses/{statusName}/id")]
pub async fn event_status_id(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let id = app_state.event_service.get_status_id(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(StatusIdResponse { id }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "listEvents", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/events:list")]
pub async fn event_list(http_request: HttpRequest, request_body: web::Json<EventListRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.event_service.list(pagination_input, EventFilterType::from(request_body)).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventListResponse::from(output)))
}

#[instrument(skip(http_request, app_state), fields(service = "getEvent", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/events/{eventId}")]
pub async fn event_get(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let event = app_state.event_service.get_event(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(EventResponse::from(event)))
}

/**
 * Creates an event. It awaits approval until an admin approves it.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "addEvent", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/events")]
pub async fn event_add(http_request: HttpRequest, request_body: web::Json<EventRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = EventInputType::from(request_body).validate()?;
    let id = app_state.event_service.create(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state), fields(service = "approveEvent", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/events/{eventId}/approve")]
pub async fn event_approve(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.event_service.approve(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "deleteEvent", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/events/{eventId}")]
pub async fn event_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.event_service.delete(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}
