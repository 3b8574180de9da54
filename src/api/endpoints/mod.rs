use actix_web::{HttpRequest, web};

pub mod annual_report;
pub mod city;
pub mod club;
pub mod document;
pub mod event;
pub mod notification;
pub mod user;

/**
 * Registers every endpoint of the api.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(annual_report::annual_report_list)
        .service(annual_report::annual_report_get)
        .service(annual_report::annual_report_add)
        .service(annual_report::annual_report_edit)
        .service(annual_report::annual_report_confirm)
        .service(annual_report::annual_report_cancel)
        .service(annual_report::annual_report_delete)
        .service(annual_report::annual_report_check_created)
        .service(city::city_list)
        .service(city::city_accessible)
        .service(city::city_profile)
        .service(city::city_members)
        .service(city::city_followers)
        .service(city::city_admins)
        .service(city::city_access)
        .service(city::city_add)
        .service(city::city_update)
        .service(city::city_delete)
        .service(city::city_follower_add)
        .service(city::city_follower_remove)
        .service(city::city_member_toggle_approval)
        .service(city::city_administration_add)
        .service(city::city_administration_edit)
        .service(city::city_administration_remove)
        .service(city::city_administration_end_date)
        .service(city::user_city_administrations)
        .service(city::user_previous_city_administrations)
        .service(city::user_city_administration_statuses)
        .service(club::club_list)
        .service(club::club_administration_add)
        .service(club::club_administration_edit)
        .service(club::club_administration_remove)
        .service(club::club_administration_end_date)
        .service(club::club_profile)
        .service(club::club_access)
        .service(club::club_add)
        .service(club::club_update)
        .service(club::club_follower_add)
        .service(club::club_member_toggle_approval)
        .service(club::club_follower_remove)
        .service(club::club_member_remove)
        .service(club::club_administration_list)
        .service(club::user_club_administrations)
        .service(club::user_previous_club_administrations)
        .service(club::user_club_administration_statuses)
        .service(document::city_document_types)
        .service(document::city_documents)
        .service(document::city_document_add)
        .service(document::city_document_download)
        .service(document::city_document_delete)
        .service(document::club_document_types)
        .service(document::club_documents)
        .service(document::club_document_add)
        .service(document::club_document_download)
        .service(document::club_document_delete)
        .service(event::event_types)
        .service(event::event_categories)
        .service(event::event_categories_by_type)
        .service(event::event_categories_by_type_page)
        .service(event::event_status_id)
        .service(event::event_list)
        .service(event::event_get)
        .service(event::event_add)
        .service(event::event_approve)
        .service(event::event_delete)
        .service(user::user_get)
        .service(user::user_roles)
        .service(user::user_roles_check)
        .service(user::user_role_add)
        .service(user::user_role_remove)
        .service(notification::notification_registration)
        .service(notification::notification_reminder)
        .service(notification::notification_reset);
}

/**
 * Trace id from the `X-Trace-ID` header, or a fresh uuid.
 */
pub(crate) fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|value| value.to_str().ok()).map_or_else(|| uuid::Uuid::new_v4().to_string(), ToString::to_string)
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::{
        api::{security::JwtSecurityService, state::AppState},
        dao::{admin_type::AdminTypeDao, annual_report::AnnualReportDao, city::CityDao, club::ClubDao, document::DocumentDao, event::EventDao, user::UserDao},
        integration::{blobstorage::FileSystemBlobStorage, email::EmailSender},
        model::apperror::ApplicationError,
        service::{
            access::AccessService, annual_report::AnnualReportService, city::CityService, city_participants::CityParticipantsService, club::ClubService, club_participants::ClubParticipantsService, documents::DocumentsService,
            event::EventService, notification::NotificationService, user::UserService,
        },
    };

    const SECRET: &str = "endpoint-secret";

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, to: &str, _subject: &str, _html_body: String) -> Result<(), ApplicationError> {
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    fn app_state(blob_root: &std::path::Path, sender: Arc<RecordingSender>) -> web::Data<AppState> {
        let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
        web::Data::new(AppState {
            jwt_service: JwtSecurityService::new(SECRET, "HS256").unwrap(),
            annual_report_service: AnnualReportService::new(AnnualReportDao::new(), CityDao::new(), access_service.clone(), None),
            city_service: CityService::new(CityDao::new(), access_service.clone(), None),
            city_participants_service: CityParticipantsService::new(CityDao::new(), AdminTypeDao::new(), access_service.clone(), None),
            club_service: ClubService::new(ClubDao::new(), access_service.clone(), None),
            club_participants_service: ClubParticipantsService::new(ClubDao::new(), AdminTypeDao::new(), UserDao::new(), access_service.clone(), None),
            documents_service: DocumentsService::new(DocumentDao::new(), Arc::new(FileSystemBlobStorage::new(blob_root)), access_service.clone(), None),
            event_service: EventService::new(EventDao::new(), access_service.clone(), None),
            user_service: UserService::new(UserDao::new(), access_service, None),
            notification_service: NotificationService::new(sender, "https://members.example.org".to_string()),
        })
    }

    fn bearer(admin: bool) -> (&'static str, String) {
        let claims = serde_json::json!({ "sub": "user-1", "name": "Jane Doe", "admin": admin, "exp": 1890000000 });
        let token = jsonwebtoken::encode(&jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256), &claims, &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes())).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn test_get_trace_id_exists() {
        let request = test::TestRequest::default().insert_header(("X-Trace-ID", "test")).to_http_request();
        assert_eq!(get_trace_id(&request), "test");
    }

    #[actix_web::test]
    async fn test_get_trace_id_not_exists() {
        let request = test::TestRequest::default().to_http_request();
        assert!(!get_trace_id(&request).is_empty());
    }

    #[actix_web::test]
    async fn test_missing_token_is_unauthorized() {
        let root = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/event-types").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1000);
    }

    #[actix_web::test]
    async fn test_membership_routes_require_token() {
        let root = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let requests = [
            test::TestRequest::post().uri("/api/services/v1_0/cities/7/followers").set_json(serde_json::json!({})).to_request(),
            test::TestRequest::delete().uri("/api/services/v1_0/cities/7/followers/3").to_request(),
            test::TestRequest::put().uri("/api/services/v1_0/cities/administrations/3/end-date").set_json(serde_json::json!({ "endDate": "2030-01-01T00:00:00Z" })).to_request(),
            test::TestRequest::delete().uri("/api/services/v1_0/clubs/7/followers/3").to_request(),
            test::TestRequest::delete().uri("/api/services/v1_0/clubs/7/members/3").to_request(),
        ];
        for request in requests {
            let response = test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[actix_web::test]
    async fn test_city_administration_without_database() {
        let root = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let request = test::TestRequest::post()
            .uri("/api/services/v1_0/cities/administrations")
            .insert_header(bearer(true))
            .set_json(serde_json::json!({ "cityId": 7, "userId": "user-2", "adminTypeName": "City Head" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_invalid_page_size_is_bad_request() {
        let root = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let request = test::TestRequest::post().uri("/api/services/v1_0/cities:list?pageSize=0").insert_header(bearer(false)).set_json(serde_json::json!({})).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_missing_database_is_server_error() {
        let root = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/event-types").insert_header(bearer(false)).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["code"], 1003);
        assert_eq!(body["message"], "No database connection available");
    }

    #[actix_web::test]
    async fn test_registration_notification_for_admin() {
        let root = tempfile::tempdir().unwrap();
        let sender = Arc::new(RecordingSender::default());
        let app = test::init_service(App::new().app_data(app_state(root.path(), sender.clone())).configure(configure)).await;
        let request = test::TestRequest::post()
            .uri("/api/services/v1_0/notifications/registration")
            .insert_header(bearer(true))
            .set_json(serde_json::json!({ "email": "new@example.org" }))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(sender.sent.lock().unwrap().as_slice(), ["new@example.org".to_string()]);
    }

    #[actix_web::test]
    async fn test_download_club_document() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("club-files")).unwrap();
        std::fs::write(root.path().join("club-files").join("statute.pdf"), b"Hello").unwrap();
        let app = test::init_service(App::new().app_data(app_state(root.path(), Arc::default())).configure(configure)).await;
        let request = test::TestRequest::get().uri("/api/services/v1_0/club-documents/files/statute.pdf").insert_header(bearer(false)).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["content"], "SGVsbG8=");
        assert_eq!(body["blobName"], "statute.pdf");
    }
}
