use actix_web::{
    HttpRequest, HttpResponse, delete, get, post, put,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{
            AccessResponse, AdministrationListResponse, AdministrationResponse, ClubAdministrationRequest, ClubListResponse, ClubProfileResponse, ClubRequest, EndDateRequest, FollowerRequest, IdResponse,
            NameFilterRequest, PaginationQuery,
        },
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{AdministrationInputType, ClubInputType, PaginationInput},
    },
};

#[instrument(skip(http_request, app_state), fields(service = "listClubs", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/clubs:list")]
pub async fn club_list(http_request: HttpRequest, request_body: web::Json<NameFilterRequest>, pagination: web::Query<PaginationQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let pagination_input = PaginationInput::from(pagination).validate()?;
    let output = app_state.club_service.list(pagination_input, request_body.into_inner().name).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ClubListResponse::from(output)))
}

#[instrument(skip(http_request, app_state), fields(service = "getClubProfile", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/clubs/{clubId}")]
pub async fn club_profile(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let profile = app_state.club_service.get_profile(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(ClubProfileResponse::from(profile)))
}

#[instrument(skip(http_request, app_state), fields(service = "getClubAccess", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/clubs/{clubId}/access")]
pub async fn club_access(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let has_access = app_state.club_service.has_access(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AccessResponse { has_access }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addClub", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/clubs")]
pub async fn club_add(http_request: HttpRequest, request_body: web::Json<ClubRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = ClubInputType::from(request_body).validate()?;
    let id = app_state.club_service.create(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "updateClub", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/clubs/{clubId}")]
pub async fn club_update(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<ClubRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = ClubInputType::from(request_body).validate()?;
    app_state.club_service.update(&user, path.into_inner(), input).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Adds a follower to a club, the caller unless an admin names someone else.
 */
#[instrument(skip(http_request, app_state), fields(service = "addClubFollower", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/clubs/{clubId}/followers")]
pub async fn club_follower_add(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<FollowerRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let id = app_state.club_service.add_follower(&user, path.into_inner(), request_body.into_inner().user_id).instrument(span).await?;
    Ok(HttpResponse::Created().json(IdResponse { id }))
}

#[instrument(skip(http_request, app_state), fields(service = "toggleClubMemberApproval", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/clubs/{clubId}/members/{memberId}/approval")]
pub async fn club_member_toggle_approval(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (club_id, member_id) = path.into_inner();
    app_state.club_service.toggle_is_approved(&user, member_id, club_id).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

/**
 * Removes a follower of a club. Followers may remove themselves.
 */
#[instrument(skip(http_request, app_state), fields(service = "removeClubFollower", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/clubs/{clubId}/followers/{memberId}")]
pub async fn club_follower_remove(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (club_id, member_id) = path.into_inner();
    app_state.club_service.remove_follower(&user, member_id, club_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "removeClubMember", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/clubs/{clubId}/members/{memberId}")]
pub async fn club_member_remove(path: Path<(i64, i64)>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let (club_id, member_id) = path.into_inner();
    app_state.club_service.remove_member(&user, member_id, club_id).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Current administrators of a club.
 */
#[instrument(skip(http_request, app_state), fields(service = "getClubAdministration", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/clubs/{clubId}/administrations")]
pub async fn club_administration_list(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.club_participants_service.get_administration_by_club(path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "addClubAdministrator", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/clubs/administrations")]
pub async fn club_administration_add(http_request: HttpRequest, request_body: web::Json<ClubAdministrationRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AdministrationInputType::from(request_body).validate()?;
    let administration = app_state.club_participants_service.add_administrator(&user, input).instrument(span).await?;
    Ok(HttpResponse::Created().json(AdministrationResponse::from(administration)))
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "editClubAdministrator", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/clubs/administrations/{administrationId}")]
pub async fn club_administration_edit(
    path: Path<i64>,
    http_request: HttpRequest,
    request_body: web::Json<ClubAdministrationRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    let input = AdministrationInputType::from(request_body).validate()?;
    let administration = app_state.club_participants_service.edit_administrator(&user, path.into_inner(), input).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationResponse::from(administration)))
}

#[instrument(skip(http_request, app_state), fields(service = "removeClubAdministrator", trace_id = get_trace_id(&http_request), result))]
#[delete("/api/services/v1_0/clubs/administrations/{administrationId}")]
pub async fn club_administration_remove(path: Path<i64>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.club_participants_service.remove_administrator(&user, path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "setClubAdministrationEndDate", trace_id = get_trace_id(&http_request), result))]
#[put("/api/services/v1_0/clubs/administrations/{administrationId}/end-date")]
pub async fn club_administration_end_date(path: Path<i64>, http_request: HttpRequest, request_body: web::Json<EndDateRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    app_state.club_participants_service.set_end_date(&user, path.into_inner(), request_body.end_date).instrument(span).await?;
    Ok(HttpResponse::Ok().finish())
}

#[instrument(skip(http_request, app_state), fields(service = "getUserClubAdministrations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/club-administrations")]
pub async fn user_club_administrations(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.club_participants_service.get_administrations_of_user(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}

#[instrument(skip(http_request, app_state), fields(service = "getUserPreviousClubAdministrations", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/club-administrations/previous")]
pub async fn user_previous_club_administrations(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.club_participants_service.get_previous_administrations_of_user(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}

/**
 * All club administrations of a user, each flagged as active or not.
 */
#[instrument(skip(http_request, app_state), fields(service = "getUserClubAdministrationStatuses", trace_id = get_trace_id(&http_request), result))]
#[get("/api/services/v1_0/users/{userId}/club-administrations/statuses")]
pub async fn user_club_administration_statuses(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.validate(&http_request)?;
    let administrations = app_state.club_participants_service.get_administration_statuses(&path.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(AdministrationListResponse::from(administrations)))
}
