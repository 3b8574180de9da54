use actix_web::{
    HttpRequest, HttpResponse, post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        endpoints::get_trace_id,
        rest::{RegistrationNotificationRequest, ResetNotificationRequest},
        state::AppState,
    },
    model::apperror::ApplicationError,
};

/**
 * Sends the registration mail. Admin only.
 */
#[instrument(skip(http_request, app_state, request_body), fields(service = "sendRegistration", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/notifications/registration")]
pub async fn notification_registration(http_request: HttpRequest, request_body: web::Json<RegistrationNotificationRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    async {
        app_state.user_service.ensure_admin(&user).await?;
        app_state.notification_service.send_registration(&request_body.email).await
    }
    .instrument(span)
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Reminds a user to join a city. Admin only.
 */
#[instrument(skip(http_request, app_state), fields(service = "sendReminder", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/notifications/reminder/{userId}")]
pub async fn notification_reminder(path: Path<String>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    async {
        app_state.user_service.ensure_admin(&user).await?;
        let recipient = app_state.user_service.find_by_id(&path.into_inner()).await?;
        app_state.notification_service.send_reminder(&app_state.notification_service.cities_url(), &recipient).await
    }
    .instrument(span)
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[instrument(skip(http_request, app_state, request_body), fields(service = "sendReset", trace_id = get_trace_id(&http_request), result))]
#[post("/api/services/v1_0/notifications/reset")]
pub async fn notification_reset(http_request: HttpRequest, request_body: web::Json<ResetNotificationRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let user = app_state.jwt_service.validate(&http_request)?;
    async {
        app_state.user_service.ensure_admin(&user).await?;
        app_state.notification_service.send_reset(&request_body.confirmation_link, &request_body.email).await
    }
    .instrument(span)
    .await?;
    Ok(HttpResponse::NoContent().finish())
}
