use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Largest page size accepted by list operations.
 */
pub const MAX_PAGE_SIZE: i64 = 1000;

/**
 * Page size used when the caller does not specify one.
 */
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/**
 * Role that grants access to everything.
 */
pub const ROLE_ADMIN: &str = "Admin";

/**
 * Role held by every current club head.
 */
pub const ROLE_CLUB_ADMIN: &str = "ClubAdmin";

/**
 * Admin type that owns a club's administration. Only one may be current per club.
 */
pub const ADMIN_TYPE_CLUB_HEAD: &str = "Club Head";

/**
 * Admin type that owns a city's administration. Only one may be current per city.
 */
pub const ADMIN_TYPE_CITY_HEAD: &str = "City Head";

pub const EVENT_STATUS_NOT_APPROVED: &str = "Not approved";
pub const EVENT_STATUS_APPROVED: &str = "Approved";

/***************** Security models *********************/

/**
 * The caller as identified by a validated bearer token.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /**
     * User id, taken from the `sub` claim.
     */
    pub id: String,
    /**
     * Display name, used for audit columns.
     */
    pub name: Option<String>,
    /**
     * Whether the token carries the admin claim.
     */
    pub admin: bool,
}

impl AuthenticatedUser {
    pub fn new(id: String, name: Option<String>, admin: bool) -> Self {
        AuthenticatedUser { id, name, admin }
    }
}

/**
 * Set of entities (cities or clubs) a user may act on.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum AccessScope {
    All,
    Limited(HashSet<i64>),
}

impl AccessScope {
    pub fn permits(&self, id: i64) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Limited(ids) => ids.contains(&id),
        }
    }

    /**
     * Fails with `Forbidden` unless the scope contains the id.
     */
    pub fn ensure(&self, id: i64) -> Result<(), ApplicationError> {
        if self.permits(id) { Ok(()) } else { Err(ApplicationError::forbidden()) }
    }
}

/***************** Pagination models *********************/

/**
 * Validated pagination parameters.
 */
#[derive(Debug, Clone, Copy)]
pub struct PaginationInput {
    pub start_index: i64,
    pub page_size: i64,
}

impl PaginationInput {
    /**
     * Validates the pagination input.
     *
     * # Returns
     * The input itself, or a validation error if start index is negative or page size is out of range.
     */
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.start_index < 0 {
            return Err(ApplicationError::new(ErrorType::Validation, "Start index cannot be negative".to_string()));
        }
        if self.page_size < 1 || self.page_size > MAX_PAGE_SIZE {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Page size must be between 1 and {MAX_PAGE_SIZE}")));
        }
        Ok(self)
    }
}

/**
 * Pagination information returned with a list.
 */
#[derive(Debug, Clone)]
pub struct PaginationOutput {
    pub start_index: i64,
    pub page_size: i64,
    pub has_more: bool,
}

impl PaginationOutput {
    pub fn new(start_index: i64, page_size: i64, has_more: bool) -> Self {
        PaginationOutput { start_index, page_size, has_more }
    }
}

/**
 * One page of elements.
 */
#[derive(Debug, Clone)]
pub struct ListOutputType<T> {
    pub elements: Vec<T>,
    pub pagination: PaginationOutput,
}

impl<T> ListOutputType<T> {
    pub fn new(elements: Vec<T>, pagination: PaginationOutput) -> Self {
        ListOutputType { elements, pagination }
    }
}

/***************** Annual report models *********************/

/**
 * Status of an annual report.
 *
 * Unconfirmed -> Confirmed on confirm, Confirmed -> Unconfirmed on cancel,
 * Confirmed -> Saved when a newer report of the same city is confirmed.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnualReportStatus {
    Unconfirmed,
    Confirmed,
    Saved,
}

impl AnnualReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnualReportStatus::Unconfirmed => "unconfirmed",
            AnnualReportStatus::Confirmed => "confirmed",
            AnnualReportStatus::Saved => "saved",
        }
    }

    /**
     * Status after confirming a report.
     */
    pub fn confirm(self) -> Result<Self, ApplicationError> {
        match self {
            AnnualReportStatus::Unconfirmed => Ok(AnnualReportStatus::Confirmed),
            other => Err(Self::invalid_transition(other, "confirm")),
        }
    }

    /**
     * Status after cancelling a confirmation.
     */
    pub fn cancel(self) -> Result<Self, ApplicationError> {
        match self {
            AnnualReportStatus::Confirmed => Ok(AnnualReportStatus::Unconfirmed),
            other => Err(Self::invalid_transition(other, "cancel")),
        }
    }

    /**
     * Edit and delete are only allowed before confirmation.
     */
    pub fn ensure_unconfirmed(self, operation: &str) -> Result<(), ApplicationError> {
        match self {
            AnnualReportStatus::Unconfirmed => Ok(()),
            other => Err(Self::invalid_transition(other, operation)),
        }
    }

    fn invalid_transition(status: AnnualReportStatus, operation: &str) -> ApplicationError {
        ApplicationError::new(ErrorType::InvalidOperation, format!("Cannot {operation} an annual report with status {}", status.as_str()))
    }
}

impl FromStr for AnnualReportStatus {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unconfirmed" => Ok(AnnualReportStatus::Unconfirmed),
            "confirmed" => Ok(AnnualReportStatus::Confirmed),
            "saved" => Ok(AnnualReportStatus::Saved),
            other => Err(ApplicationError::new(ErrorType::DatabaseError, format!("Unknown annual report status {other}"))),
        }
    }
}

/**
 * Membership counters submitted with an annual report.
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembersStatistic {
    pub number_of_children: i32,
    pub number_of_juniors: i32,
    pub number_of_youth_members: i32,
    pub number_of_youth_followers: i32,
    pub number_of_seniors: i32,
    pub number_of_senior_followers: i32,
}

impl MembersStatistic {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let counters = [
            self.number_of_children,
            self.number_of_juniors,
            self.number_of_youth_members,
            self.number_of_youth_followers,
            self.number_of_seniors,
            self.number_of_senior_followers,
        ];
        if counters.iter().any(|counter| *counter < 0) {
            return Err(ApplicationError::new(ErrorType::Validation, "Member counters cannot be negative".to_string()));
        }
        Ok(())
    }
}

/**
 * An annual report as read from the database.
 */
#[derive(Debug, Clone)]
pub struct AnnualReportDetailType {
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

/**
 * Input for creating an annual report.
 */
#[derive(Debug, Clone)]
pub struct AnnualReportAddInputType {
    pub city_id: i64,
    pub new_city_admin_id: Option<String>,
    pub new_city_legal_status: String,
    pub members_statistic: MembersStatistic,
}

impl AnnualReportAddInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.new_city_legal_status.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Legal status is required".to_string()));
        }
        self.members_statistic.validate()?;
        Ok(self)
    }
}

/**
 * Input for editing an annual report. Identity fields must match the stored report.
 */
#[derive(Debug, Clone)]
pub struct AnnualReportEditInputType {
    pub city_id: i64,
    pub creator_id: String,
    pub date: DateTime<Utc>,
    pub status: AnnualReportStatus,
    pub new_city_admin_id: Option<String>,
    pub new_city_legal_status: String,
    pub members_statistic: MembersStatistic,
}

impl AnnualReportEditInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.new_city_legal_status.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Legal status is required".to_string()));
        }
        self.members_statistic.validate()?;
        Ok(self)
    }

    /**
     * Whether this input addresses the stored report: same city, same creator, same day.
     */
    pub fn matches(&self, report: &AnnualReportDetailType) -> bool {
        self.city_id == report.city_id && self.creator_id == report.creator_id && self.date.date_naive() == report.date.date_naive()
    }
}

/***************** City models *********************/

#[derive(Debug, Clone)]
pub struct CityDetailType {
    pub id: i64,
    pub name: String,
    pub region_id: i64,
    pub region_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CityInputType {
    pub name: String,
    pub region_id: i64,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl CityInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "City name is required".to_string()));
        }
        Ok(self)
    }
}

/**
 * A city together with its current administration and membership.
 */
#[derive(Debug, Clone)]
pub struct CityProfileType {
    pub city: CityDetailType,
    pub admins: Vec<AdministrationDetailType>,
    pub members: Vec<MemberDetailType>,
    pub followers: Vec<MemberDetailType>,
}

/***************** Club models *********************/

#[derive(Debug, Clone)]
pub struct ClubDetailType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClubInputType {
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

impl ClubInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Club name is required".to_string()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ClubProfileType {
    pub club: ClubDetailType,
    pub admins: Vec<AdministrationDetailType>,
    pub members: Vec<MemberDetailType>,
    pub followers: Vec<MemberDetailType>,
}

/***************** Administration models *********************/

#[derive(Debug, Clone, PartialEq)]
pub struct AdminType {
    pub id: i64,
    pub name: String,
}

/**
 * A timed admin role assignment for a club or a city.
 */
#[derive(Debug, Clone)]
pub struct AdministrationDetailType {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    /**
     * Club or city id, depending on where the administration was read from.
     */
    pub owner_id: i64,
    pub admin_type: AdminType,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AdministrationDetailType {
    /**
     * Current when there is no end date or it lies after `now`. An administration closed at its start
     * date never took office.
     */
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.end_date.is_none_or(|end_date| end_date > now.max(self.start_date))
    }
}

/**
 * Input for adding or editing a club or city administrator.
 */
#[derive(Debug, Clone)]
pub struct AdministrationInputType {
    /**
     * Club or city id.
     */
    pub owner_id: i64,
    pub user_id: String,
    pub admin_type_name: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl AdministrationInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.user_id.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "User id is required".to_string()));
        }
        if self.admin_type_name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Admin type is required".to_string()));
        }
        if let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) {
            if end_date < start_date {
                return Err(ApplicationError::new(ErrorType::Validation, "End date cannot be before start date".to_string()));
            }
        }
        Ok(self)
    }

    /**
     * The start date, defaulting to `now` when none was given.
     */
    pub fn start_date_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.start_date.unwrap_or(now)
    }
}

/***************** Member models *********************/

#[derive(Debug, Clone)]
pub struct MemberDetailType {
    pub id: i64,
    pub user_id: String,
    pub user_name: String,
    pub is_approved: bool,
}

/***************** User models *********************/

#[derive(Debug, Clone)]
pub struct UserDetailType {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserDetailType {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/***************** Document models *********************/

/**
 * Which kind of entity a document is attached to.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOwner {
    City,
    Club,
}

impl DocumentOwner {
    /**
     * Blob container holding the files of this owner kind.
     */
    pub fn container(&self) -> &'static str {
        match self {
            DocumentOwner::City => "city-files",
            DocumentOwner::Club => "club-files",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DocumentDetailType {
    pub id: i64,
    pub owner_id: i64,
    pub document_type: DocumentType,
    pub blob_name: String,
    pub file_name: String,
    pub submit_date: Option<DateTime<Utc>>,
}

/**
 * Input for uploading a document.
 */
#[derive(Debug, Clone)]
pub struct DocumentAddInputType {
    pub file_name: String,
    /**
     * Data url, `data:<mime>;base64,<payload>`.
     */
    pub blob_name: String,
    pub document_type_name: String,
    pub submit_date: Option<DateTime<Utc>>,
}

impl DocumentAddInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.file_name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "File name is required".to_string()));
        }
        if self.document_type_name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Document type is required".to_string()));
        }
        self.base64_payload()?;
        Ok(self)
    }

    /**
     * The base64 payload after the first comma of the data url.
     */
    pub fn base64_payload(&self) -> Result<&str, ApplicationError> {
        self.blob_name
            .split_once(',')
            .map(|(_, payload)| payload)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| ApplicationError::new(ErrorType::Validation, "Document content must be a base64 data url".to_string()))
    }

    /**
     * Extension of the uploaded file, including the leading dot. Empty when the name has none.
     */
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, extension)) if !extension.is_empty() => format!(".{extension}"),
            _ => String::new(),
        }
    }
}

/***************** Event models *********************/

#[derive(Debug, Clone)]
pub struct EventTypeType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EventCategoryType {
    pub id: i64,
    pub name: String,
    pub event_type_id: i64,
}

#[derive(Debug, Clone)]
pub struct EventAdminType {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone)]
pub struct EventDetailType {
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
    pub admins: Vec<EventAdminType>,
}

#[derive(Debug, Clone)]
pub struct EventInputType {
    pub name: String,
    pub description: Option<String>,
    pub event_type_id: i64,
    pub event_category_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
}

impl EventInputType {
    pub fn validate(self) -> Result<Self, ApplicationError> {
        if self.name.trim().is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "Event name is required".to_string()));
        }
        if self.end_date < self.start_date {
            return Err(ApplicationError::new(ErrorType::Validation, "Event cannot end before it starts".to_string()));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventFilterType {
    pub event_type_id: Option<i64>,
    pub event_category_id: Option<i64>,
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_pagination_validate() {
        assert!(PaginationInput { start_index: 0, page_size: 10 }.validate().is_ok());
        assert!(PaginationInput { start_index: -1, page_size: 10 }.validate().is_err());
        assert!(PaginationInput { start_index: 0, page_size: 0 }.validate().is_err());
        assert!(PaginationInput { start_index: 0, page_size: MAX_PAGE_SIZE + 1 }.validate().is_err());
    }

    #[test]
    fn test_access_scope() {
        assert!(AccessScope::All.permits(42));
        let scope = AccessScope::Limited(HashSet::from([1, 2]));
        assert!(scope.permits(1));
        assert!(!scope.permits(3));
        assert_eq!(scope.ensure(3).unwrap_err().error_type, ErrorType::Forbidden);
    }

    #[test]
    fn test_annual_report_status_transitions() {
        assert_eq!(AnnualReportStatus::Unconfirmed.confirm().unwrap(), AnnualReportStatus::Confirmed);
        assert_eq!(AnnualReportStatus::Confirmed.cancel().unwrap(), AnnualReportStatus::Unconfirmed);
        assert_eq!(AnnualReportStatus::Confirmed.confirm().unwrap_err().error_type, ErrorType::InvalidOperation);
        assert_eq!(AnnualReportStatus::Saved.confirm().unwrap_err().error_type, ErrorType::InvalidOperation);
        assert_eq!(AnnualReportStatus::Unconfirmed.cancel().unwrap_err().error_type, ErrorType::InvalidOperation);
        assert_eq!(AnnualReportStatus::Saved.cancel().unwrap_err().error_type, ErrorType::InvalidOperation);
        assert!(AnnualReportStatus::Unconfirmed.ensure_unconfirmed("delete").is_ok());
        assert!(AnnualReportStatus::Confirmed.ensure_unconfirmed("delete").is_err());
    }

    #[test]
    fn test_annual_report_status_parse() {
        for status in [AnnualReportStatus::Unconfirmed, AnnualReportStatus::Confirmed, AnnualReportStatus::Saved] {
            assert_eq!(AnnualReportStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(AnnualReportStatus::from_str("deleted").is_err());
    }

    #[test]
    fn test_annual_report_edit_matches_same_day() {
        let date = Utc::now();
        let report = AnnualReportDetailType {
            id: 1,
            city_id: 2,
            city_name: "Lviv".to_string(),
            creator_id: "user".to_string(),
            creator_name: "Test User".to_string(),
            new_city_admin_id: None,
            new_city_legal_status: "registered".to_string(),
            date,
            status: AnnualReportStatus::Unconfirmed,
            members_statistic: MembersStatistic::default(),
        };
        let mut input = AnnualReportEditInputType {
            city_id: 2,
            creator_id: "user".to_string(),
            date,
            status: AnnualReportStatus::Unconfirmed,
            new_city_admin_id: None,
            new_city_legal_status: "registered".to_string(),
            members_statistic: MembersStatistic::default(),
        };
        assert!(input.matches(&report));
        input.date = date + Duration::days(2);
        assert!(!input.matches(&report));
        input.date = date;
        input.city_id = 3;
        assert!(!input.matches(&report));
    }

    #[test]
    fn test_members_statistic_rejects_negative() {
        let statistic = MembersStatistic { number_of_seniors: -1, ..MembersStatistic::default() };
        assert_eq!(statistic.validate().unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_administration_is_active() {
        let now = Utc::now();
        let mut administration = AdministrationDetailType {
            id: 1,
            user_id: "user".to_string(),
            user_name: "Test User".to_string(),
            owner_id: 1,
            admin_type: AdminType { id: 1, name: ADMIN_TYPE_CLUB_HEAD.to_string() },
            start_date: now - Duration::days(10),
            end_date: None,
        };
        assert!(administration.is_active(now));
        administration.end_date = Some(now + Duration::days(1));
        assert!(administration.is_active(now));
        administration.end_date = Some(now - Duration::days(1));
        assert!(!administration.is_active(now));
        administration.start_date = now + Duration::days(10);
        administration.end_date = Some(administration.start_date);
        assert!(!administration.is_active(now));
    }

    #[test]
    fn test_administration_input_validate() {
        let now = Utc::now();
        let input = AdministrationInputType {
            owner_id: 1,
            user_id: "user".to_string(),
            admin_type_name: ADMIN_TYPE_CLUB_HEAD.to_string(),
            start_date: None,
            end_date: None,
        };
        let input = input.validate().unwrap();
        assert_eq!(input.start_date_or(now), now);
        let invalid = AdministrationInputType { start_date: Some(now), end_date: Some(now - Duration::days(1)), ..input };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_document_input_payload_and_extension() {
        let input = DocumentAddInputType {
            file_name: "minutes.final.pdf".to_string(),
            blob_name: "data:application/pdf;base64,SGVsbG8=".to_string(),
            document_type_name: "Minutes".to_string(),
            submit_date: None,
        };
        assert_eq!(input.base64_payload().unwrap(), "SGVsbG8=");
        assert_eq!(input.extension(), ".pdf");
        assert!(input.clone().validate().is_ok());

        let no_extension = DocumentAddInputType { file_name: "README".to_string(), ..input.clone() };
        assert_eq!(no_extension.extension(), "");

        let not_data_url = DocumentAddInputType { blob_name: "SGVsbG8=".to_string(), ..input };
        assert_eq!(not_data_url.validate().unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_event_input_rejects_reversed_dates() {
        let now = Utc::now();
        let input = EventInputType {
            name: "Camp".to_string(),
            description: None,
            event_type_id: 1,
            event_category_id: 1,
            start_date: now,
            end_date: now - Duration::hours(1),
            location: None,
        };
        assert!(input.validate().is_err());
    }
}
