use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{
            AccessResponse, AdministrationListResponse, AdministrationResponse, CityAdministrationRequest, CityListResponse, CityProfileResponse, CityRequest, EndDateRequest, FollowerRequest,
            IdResponse, MemberListResponse, NameFilterRequest, PaginationQuery,
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{AdministrationInputType, CityInputType, PaginationInput},
    },
};

/**
 * Lists cities, optionally filtered by name.
 */
#[instrument(skip(http_request, app_state), fields(service = "listCities", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/cities:list")]
pub async fn city_list(http_request: HttpRequest, request_body: web::Json<NameFilterRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.city_service.list(pagination_input, request_body.into_inner().name).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CityListResponse::from(output)))
}

/**
 * Cities the caller administers, or all cities for admins.
 */
#[instrument(skip(http_request, app_state), fields(service = "listAccessibleCities", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities:accessible")]
pub async fn city_accessible(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let cities = app_state.city_service.get_cities(&user).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CityListResponse::from(cities)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCityProfile", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}")]
pub async fn city_profile(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let profile = app_state.city_service.get_profile(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(CityProfileResponse::from(profile)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCityMembers", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/members")]
pub async fn city_members(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let members = app_state.city_service.get_members(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MemberListResponse::from(members)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCityFollowers", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/followers")]
pub async fn city_followers(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let followers = app_state.city_service.get_followers(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(MemberListResponse::from(followers)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCityAdmins", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/admins")]
pub async fn city_admins(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let admins = app_state.city_service.get_admins(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(admins)))
}

#[instrument(skip(http_request, app_state), fields(service = "getCityAccess", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/cities/{cityId}/access")]
pub async fn city_access(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let has_access = app_state.city_service.has_access(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AccessResponse { has_access }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addCity", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/cities")]
pub async fn city_add(http_request: HttpRequest, request_body: web::Json<CityRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = CityInputType::from(request_body).validate()?;
    let id = app_state.city_service.create(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "updateCity", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/cities/{cityId}")]
pub async fn city_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<CityRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = CityInputType::from(request_body).validate()?;
    app_state.city_service.update(&user, path.into_inner(), input).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "deleteCity", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/cities/{cityId}")]
pub async fn city_delete(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.city_service.delete(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Adds a follower to a city, the caller unless an admin names someone else.
 */
#[instrument(skip(http_request, app_state), fields(service = "addCityFollower", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/cities/{cityId}/followers")]
pub async fn city_follower_add(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<FollowerRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let id = app_state.city_participants_service.add_follower(&user, path.into_inner(), request_body.into_inner().user_id).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state), fields(service = "removeCityFollower", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/cities/{cityId}/followers/{memberId}")]
pub async fn city_follower_remove(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (city_id, member_id) = path.into_inner();
    app_state.city_participants_service.remove_follower(&user, member_id, city_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "toggleCityMemberApproval", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/cities/{cityId}/members/{memberId}/approval")]
pub async fn city_member_toggle_approval(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (city_id, member_id) = path.into_inner();
    app_state.city_participants_service.toggle_is_approved(&user, member_id, city_id).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addCityAdministrator", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/cities/administrations")]
pub async fn city_administration_add(http_request: HttpRequest, request_body: web::Json<CityAdministrationRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AdministrationInputType::from(request_body).validate()?;
    let administration = app_state.city_participants_service.add_administrator(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(AdministrationResponse::from(administration)))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "editCityAdministrator", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/cities/administrations/{administrationId}")]
pub async fn city_administration_edit(
    path: Path<i64>,
    http_request: HttpRequest,
    request_body: web::Json<CityAdministrationRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AdministrationInputType::from(request_body).validate()?;
    let administration = app_state.city_participants_service.edit_administrator(&user, path.into_inner(), input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationResponse::from(administration)))
}

#[instrument(skip(http_request, app_state), fields(service = "removeCityAdministrator", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/cities/administrations/{administrationId}")]
pub async fn city_administration_remove(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.city_participants_service.remove_administrator(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "setCityAdministrationEndDate", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/cities/administrations/{administrationId}/end-date")]
pub async fn city_administration_end_date(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<EndDateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.city_participants_service.set_end_date(&user, path.into_inner(), request_body.end_date).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "getUserCityAdministrations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/city-administrations")]
pub async fn user_city_administrations(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.city_participants_service.get_administrations_of_user(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}

#[instrument(skip(http_request, app_state), fields(service = "getUserPreviousCityAdministrations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/city-administrations/previous")]
pub async fn user_previous_city_administrations(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.city_participants_service.get_previous_administrations_of_user(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}

#[instrument(skip(http_request, app_state), fields(service = "getUserCityAdministrationStatuses", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/city-administrations/statuses")]
pub async fn user_city_administration_statuses(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.city_participants_service.get_administration_statuses(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}
