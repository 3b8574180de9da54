use actix_web::{
    HttpRequest, HttpResponse, delete, get, post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{RoleCheckRequest, RoleCheckResponse, RoleRequest, RolesResponse, UserResponse},
        state::AppState,
    },
    model::apperror::ApplicationError,
};

#[instrument(skip(http_request, app_state), fields(service = "getUser", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}")]
pub async fn user_get(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let user = app_state.user_service.find_by_id(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[instrument(skip(http_request, app_state), fields(service = "getUserRoles", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/roles")]
pub async fn user_roles(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let roles = app_state.user_service.get_roles(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RolesResponse { roles }))
}

/**
 * Checks whether the user holds any of the given roles.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "checkUserRoles", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/users/{userId}/roles:check")]
pub async fn user_roles_check(path: Path<String>, http_request: HttpRequest, request_body: web::Json<RoleCheckRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let roles: Vec<&str> = request_body.roles.iter().map(String::as_str).collect();
    let in_role = app_state.user_service.is_in_role(&path.into_inner(), &roles).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RoleCheckResponse { in_role }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addUserRole", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/users/{userId}/roles")]
pub async fn user_role_add(path: Path<String>, http_request: HttpRequest, request_body: web::Json<RoleRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.user_service.add_to_role(&user, &path.into_inner(), &request_body.role).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "removeUserRole", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/users/{userId}/roles/{role}")]
pub async fn user_role_remove(path: Path<(String, String)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (user_id, role) = path.into_inner();
    app_state.user_service.remove_from_role(&user, &user_id, &role).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}
