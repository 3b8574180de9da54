use crate::{
    api::security::JwtSecurityService,
    service::{
        annual_report::AnnualReportService, city::CityService, city_participants::CityParticipantsService, club::ClubService, club_participants::ClubParticipantsService, documents::DocumentsService, event::EventService,
        notification::NotificationService, user::UserService,
    },
};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The JWT security service for handling authentication.
     */
    pub jwt_service: JwtSecurityService,
    pub annual_report_service: AnnualReportService,
    pub city_service: CityService,
    pub city_participants_service: CityParticipantsService,
    pub club_service: ClubService,
    pub club_participants_service: ClubParticipantsService,
    pub documents_service: DocumentsService,
    pub event_service: EventService,
    pub user_service: UserService,
    pub notification_service: NotificationService,
}
