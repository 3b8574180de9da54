use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{
        AdministrationDetailType, AdministrationInputType, AnnualReportAddInputType, AnnualReportDetailType, AnnualReportEditInputType, AnnualReportStatus, CityDetailType, CityInputType,
        CityProfileType, ClubDetailType, ClubInputType, ClubProfileType, DEFAULT_PAGE_SIZE, DocumentAddInputType, DocumentDetailType, DocumentType, EventCategoryType, EventDetailType,
        EventFilterType, EventInputType, EventTypeType, ListOutputType, MemberDetailType, MembersStatistic, PaginationInput, PaginationOutput, UserDetailType,
    },
};

/***************** Annual report models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReportAddRequest {
    pub city_id: i64,
    pub new_city_admin_id: Option<String>,
    pub new_city_legal_status: String,
    pub members_statistic: MembersStatistic,
}

impl From<web::Json<AnnualReportAddRequest>> for AnnualReportAddInputType {
    fn from(request: web::Json<AnnualReportAddRequest>) -> Self {
        let request = request.into_inner();
        AnnualReportAddInputType {
            city_id: request.city_id,
            new_city_admin_id: request.new_city_admin_id,
            new_city_legal_status: request.new_city_legal_status,
            members_statistic: request.members_statistic,
        }
    }
}

/**
 * Request for editing an annual report. City, creator and date identify the report being edited.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReportEditRequest {
    pub city_id: i64,
    pub creator_id: String,
    pub date: DateTime<Utc>,
    pub status: AnnualReportStatus,
    pub new_city_admin_id: Option<String>,
    pub new_city_legal_status: String,
    pub members_statistic: MembersStatistic,
}

impl From<web::Json<AnnualReportEditRequest>> for AnnualReportEditInputType {
    fn from(request: web::Json<AnnualReportEditRequest>) -> Self {
        let request = request.into_inner();
        AnnualReportEditInputType {
            city_id: request.city_id,
            creator_id: request.creator_id,
            date: request.date,
            status: request.status,
            new_city_admin_id: request.new_city_admin_id,
            new_city_legal_status: request.new_city_legal_status,
            members_statistic: request.members_statistic,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReportResponse {
    pub id: i64,
    pub city_id: i64,
    pub city_name: String,
    pub creator_id: String,
    pub creator_name: String,
    pub new_city_admin_id: Option<String>,
    pub new_city_legal_status: String,
    pub date: DateTime<Utc>,
    pub status: AnnualReportStatus,
    pub members_statistic: MembersStatistic,
}

impl From<AnnualReportDetailType> for AnnualReportResponse {
    fn from(report: AnnualReportDetailType) -> Self {
        AnnualReportResponse {
            id: report.id,
            city_id: report.city_id,
            city_name: report.city_name,
            creator_id: report.creator_id,
            creator_name: report.creator_name,
            new_city_admin_id: report.new_city_admin_id,
            new_city_legal_status: report.new_city_legal_status,
            date: report.date,
            status: report.status,
            members_statistic: report.members_statistic,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReportListResponse {
    pub annual_reports: Vec<AnnualReportResponse>,
}

impl From<Vec<AnnualReportDetailType>> for AnnualReportListResponse {
    fn from(reports: Vec<AnnualReportDetailType>) -> Self {
        AnnualReportListResponse { annual_reports: reports.into_iter().map(AnnualReportResponse::from).collect() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCreatedResponse {
    pub created: bool,
}

/***************** City models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRequest {
    pub name: String,
    pub region_id: i64,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<web::Json<CityRequest>> for CityInputType {
    fn from(request: web::Json<CityRequest>) -> Self {
        let request = request.into_inner();
        CityInputType { name: request.name, region_id: request.region_id, description: request.description, phone: request.phone, email: request.email }
    }
}

/**
 * Name filter for list requests.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameFilterRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityResponse {
    pub id: i64,
    pub name: String,
    pub region_id: i64,
    pub region_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl From<CityDetailType> for CityResponse {
    fn from(city: CityDetailType) -> Self {
        CityResponse { id: city.id, name: city.name, region_id: city.region_id, region_name: city.region_name, description: city.description, phone: city.phone, email: city.email }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityListResponse {
    pub cities: Vec<CityResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationResponse>,
}

impl From<ListOutputType<CityDetailType>> for CityListResponse {
    fn from(output: ListOutputType<CityDetailType>) -> Self {
        CityListResponse { cities: output.elements.into_iter().map(CityResponse::from).collect(), pagination: Some(PaginationResponse::from(output.pagination)) }
    }
}

impl From<Vec<CityDetailType>> for CityListResponse {
    fn from(cities: Vec<CityDetailType>) -> Self {
        CityListResponse { cities: cities.into_iter().map(CityResponse::from).collect(), pagination: None }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityProfileResponse {
    pub city: CityResponse,
    pub admins: Vec<AdministrationResponse>,
    pub members: Vec<MemberResponse>,
    pub followers: Vec<MemberResponse>,
}

impl From<CityProfileType> for CityProfileResponse {
    fn from(profile: CityProfileType) -> Self {
        CityProfileResponse {
            city: CityResponse::from(profile.city),
            admins: to_administrations(profile.admins),
            members: to_members(profile.members),
            followers: to_members(profile.followers),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub has_access: bool,
}

/***************** Club models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubRequest {
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

impl From<web::Json<ClubRequest>> for ClubInputType {
    fn from(request: web::Json<ClubRequest>) -> Self {
        let request = request.into_inner();
        ClubInputType { name: request.name, description: request.description, logo: request.logo }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

impl From<ClubDetailType> for ClubResponse {
    fn from(club: ClubDetailType) -> Self {
        ClubResponse { id: club.id, name: club.name, description: club.description, logo: club.logo }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubListResponse {
    pub clubs: Vec<ClubResponse>,
    pub pagination: PaginationResponse,
}

impl From<ListOutputType<ClubDetailType>> for ClubListResponse {
    fn from(output: ListOutputType<ClubDetailType>) -> Self {
        ClubListResponse { clubs: output.elements.into_iter().map(ClubResponse::from).collect(), pagination: PaginationResponse::from(output.pagination) }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubProfileResponse {
    pub club: ClubResponse,
    pub admins: Vec<AdministrationResponse>,
    pub members: Vec<MemberResponse>,
    pub followers: Vec<MemberResponse>,
}

impl From<ClubProfileType> for ClubProfileResponse {
    fn from(profile: ClubProfileType) -> Self {
        ClubProfileResponse {
            club: ClubResponse::from(profile.club),
            admins: to_administrations(profile.admins),
            members: to_members(profile.members),
            followers: to_members(profile.followers),
        }
    }
}

/**
 * Request for adding a follower. Without a user id the caller follows the club.
 */
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerRequest {
    pub user_id: Option<String>,
}

/***************** Administration models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubAdministrationRequest {
    pub club_id: i64,
    pub user_id: String,
    pub admin_type_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<web::Json<ClubAdministrationRequest>> for AdministrationInputType {
    fn from(request: web::Json<ClubAdministrationRequest>) -> Self {
        let request = request.into_inner();
        AdministrationInputType {
            owner_id: request.club_id,
            user_id: request.user_id,
            admin_type_name: request.admin_type_name,
            start_date: request.start_date,
            end_date: request.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAdministrationRequest {
    pub city_id: i64,
    pub user_id: String,
    pub admin_type_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<web::Json<CityAdministrationRequest>> for AdministrationInputType {
    fn from(request: web::Json<CityAdministrationRequest>) -> Self {
        let request = request.into_inner();
        AdministrationInputType {
            owner_id: request.city_id,
            user_id: request.user_id,
            admin_type_name: request.admin_type_name,
            start_date: request.start_date,
            end_date: request.end_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndDateRequest {
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationResponse {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub owner_id: i64,
    pub admin_type_id: i64,
    pub admin_type_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<AdministrationDetailType> for AdministrationResponse {
    fn from(administration: AdministrationDetailType) -> Self {
        AdministrationResponse {
            is_active: administration.is_active(Utc::now()),
            id: administration.id,
            user_id: administration.user_id,
            user_name: administration.user_name,
            owner_id: administration.owner_id,
            admin_type_id: administration.admin_type.id,
            admin_type_name: administration.admin_type.name,
            start_date: administration.start_date,
            end_date: administration.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrationListResponse {
    pub administrations: Vec<AdministrationResponse>,
}

impl From<Vec<AdministrationDetailType>> for AdministrationListResponse {
    fn from(administrations: Vec<AdministrationDetailType>) -> Self {
        AdministrationListResponse { administrations: to_administrations(administrations) }
    }
}

fn to_administrations(administrations: Vec<AdministrationDetailType>) -> Vec<AdministrationResponse> {
    administrations.into_iter().map(AdministrationResponse::from).collect()
}

/***************** Member models *********************/

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub is_approved: bool,
}

impl From<MemberDetailType> for MemberResponse {
    fn from(member: MemberDetailType) -> Self {
        MemberResponse { id: member.id, user_id: member.user_id, user_name: member.user_name, is_approved: member.is_approved }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListResponse {
    pub members: Vec<MemberResponse>,
}

impl From<Vec<MemberDetailType>> for MemberListResponse {
    fn from(members: Vec<MemberDetailType>) -> Self {
        MemberListResponse { members: to_members(members) }
    }
}

fn to_members(members: Vec<MemberDetailType>) -> Vec<MemberResponse> {
    members.into_iter().map(MemberResponse::from).collect()
}

/***************** Document models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAddRequest {
    pub file_name: String,
    /**
     * File content as data url.
     */
    pub blob_name: String,
    pub document_type_name: String,
    pub submit_date: Option<DateTime<Utc>>,
}

impl From<web::Json<DocumentAddRequest>> for DocumentAddInputType {
    fn from(request: web::Json<DocumentAddRequest>) -> Self {
        let request = request.into_inner();
        DocumentAddInputType { file_name: request.file_name, blob_name: request.blob_name, document_type_name: request.document_type_name, submit_date: request.submit_date }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeResponse {
    pub id: i64,
    pub name: String,
}

impl From<DocumentType> for DocumentTypeResponse {
    fn from(document_type: DocumentType) -> Self {
        DocumentTypeResponse { id: document_type.id, name: document_type.name }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeListResponse {
    pub document_types: Vec<DocumentTypeResponse>,
}

impl From<Vec<DocumentType>> for DocumentTypeListResponse {
    fn from(document_types: Vec<DocumentType>) -> Self {
        DocumentTypeListResponse { document_types: document_types.into_iter().map(DocumentTypeResponse::from).collect() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: i64,
    pub owner_id: i64,
    pub document_type: DocumentTypeResponse,
    pub blob_name: String,
    pub file_name: String,
    pub submit_date: Option<DateTime<Utc>>,
}

impl From<DocumentDetailType> for DocumentResponse {
    fn from(document: DocumentDetailType) -> Self {
        DocumentResponse {
            id: document.id,
            owner_id: document.owner_id,
            document_type: DocumentTypeResponse::from(document.document_type),
            blob_name: document.blob_name,
            file_name: document.file_name,
            submit_date: document.submit_date,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentResponse>,
}

impl From<Vec<DocumentDetailType>> for DocumentListResponse {
    fn from(documents: Vec<DocumentDetailType>) -> Self {
        DocumentListResponse { documents: documents.into_iter().map(DocumentResponse::from).collect() }
    }
}

/**
 * Downloaded file, base64 encoded.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub blob_name: String,
    pub content: String,
}

/***************** Event models *********************/

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeListResponse {
    pub event_types: Vec<EventTypeResponse>,
}

impl From<Vec<EventTypeType>> for EventTypeListResponse {
    fn from(event_types: Vec<EventTypeType>) -> Self {
        EventTypeListResponse { event_types: event_types.into_iter().map(|event_type| EventTypeResponse { id: event_type.id, name: event_type.name }).collect() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCategoryResponse {
    pub id: i64,
    pub name: String,
    pub event_type_id: i64,
}

impl From<EventCategoryType> for EventCategoryResponse {
    fn from(category: EventCategoryType) -> Self {
        EventCategoryResponse { id: category.id, name: category.name, event_type_id: category.event_type_id }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCategoryListResponse {
    pub categories: Vec<EventCategoryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationResponse>,
}

impl From<Vec<EventCategoryType>> for EventCategoryListResponse {
    fn from(categories: Vec<EventCategoryType>) -> Self {
        EventCategoryListResponse { categories: categories.into_iter().map(EventCategoryResponse::from).collect(), pagination: None }
    }
}

impl From<ListOutputType<EventCategoryType>> for EventCategoryListResponse {
    fn from(output: ListOutputType<EventCategoryType>) -> Self {
        EventCategoryListResponse { categories: output.elements.into_iter().map(EventCategoryResponse::from).collect(), pagination: Some(PaginationResponse::from(output.pagination)) }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusIdResponse {
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListRequest {
    pub event_type_id: Option<i64>,
    pub event_category_id: Option<i64>,
}

impl From<web::Json<EventListRequest>> for EventFilterType {
    fn from(request: web::Json<EventListRequest>) -> Self {
        EventFilterType { event_type_id: request.event_type_id, event_category_id: request.event_category_id }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub name: String,
    pub description: Option<String>,
    pub event_type_id: i64,
    pub event_category_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
}

impl From<web::Json<EventRequest>> for EventInputType {
    fn from(request: web::Json<EventRequest>) -> Self {
        let request = request.into_inner();
        EventInputType {
            name: request.name,
            description: request.description,
            event_type_id: request.event_type_id,
            event_category_id: request.event_category_id,
            start_date: request.start_date,
            end_date: request.end_date,
            location: request.location,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAdminResponse {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub event_type_id: i64,
    pub event_type_name: String,
    pub event_category_id: i64,
    pub event_category_name: String,
    pub event_status: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub admins: Vec<EventAdminResponse>,
}

impl From<EventDetailType> for EventResponse {
    fn from(event: EventDetailType) -> Self {
        EventResponse {
            id: event.id,
            name: event.name,
            description: event.description,
            event_type_id: event.event_type_id,
            event_type_name: event.event_type_name,
            event_category_id: event.event_category_id,
            event_category_name: event.event_category_name,
            event_status: event.event_status,
            start_date: event.start_date,
            end_date: event.end_date,
            location: event.location,
            admins: event.admins.into_iter().map(|admin| EventAdminResponse { user_id: admin.user_id, user_name: admin.user_name }).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub pagination: PaginationResponse,
}

impl From<ListOutputType<EventDetailType>> for EventListResponse {
    fn from(output: ListOutputType<EventDetailType>) -> Self {
        EventListResponse { events: output.elements.into_iter().map(EventResponse::from).collect(), pagination: PaginationResponse::from(output.pagination) }
    }
}

/***************** User models *********************/

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<UserDetailType> for UserResponse {
    fn from(user: UserDetailType) -> Self {
        UserResponse { id: user.id, email: user.email, first_name: user.first_name, last_name: user.last_name }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolesResponse {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheckRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheckResponse {
    pub in_role: bool,
}

/***************** Notification models *********************/

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationNotificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetNotificationRequest {
    pub email: String,
    pub confirmation_link: String,
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type)).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::JwtAuthorization => StatusCode::UNAUTHORIZED,
        ErrorType::Forbidden => StatusCode::FORBIDDEN,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::InvalidOperation | ErrorType::ConstraintViolation => StatusCode::CONFLICT,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::BlobStorage | ErrorType::Email | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::JwtAuthorization => 1000,
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::Forbidden => 1004,
        ErrorType::NotFound => 1005,
        ErrorType::InvalidOperation => 1006,
        ErrorType::ConstraintViolation => 1007,
        ErrorType::BlobStorage => 1008,
        ErrorType::Email => 1009,
        ErrorType::Application => 1010,
    }
}

/***************** Common models *********************/

/**
 * Id of a created entity.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdResponse {
    pub id: i64,
}

/**
 * Pagination query parameters for API requests.
 */
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /**
     * The index of the first item to return.
     */
    pub start_index: Option<i64>,
    /**
     * The size of the page to return.
     */
    pub page_size: Option<i64>,
}

/**
 * Missing values default to the first page of `DEFAULT_PAGE_SIZE` elements. The result still needs validation.
 */
impl From<web::Query<PaginationQuery>> for PaginationInput {
    fn from(query: web::Query<PaginationQuery>) -> Self {
        PaginationInput { start_index: query.start_index.unwrap_or(0), page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE) }
    }
}

/**
 * Pagination response structure.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    /**
     * The starting index of the returned items.
     */
    pub start_index: Option<i64>,
    /**
     * The size of the page.
     */
    pub page_size: Option<i64>,
    /**
     * Indicates if there are more items available.
     */
    pub has_more_elements: bool,
}

impl From<PaginationOutput> for PaginationResponse {
    fn from(pagination_output: PaginationOutput) -> Self {
        PaginationResponse { start_index: Some(pagination_output.start_index), page_size: Some(pagination_output.page_size), has_more_elements: pagination_output.has_more }
    }
}
