use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{AdminType, AdministrationDetailType, MemberDetailType, PaginationInput, PaginationOutput},
};

/**
 * Database response type for city and club administrations:
 * id, user id, user name, owner id, admin type id, admin type name, start date, end date.
 */
pub type QueryAdministrationDbResp = (i64, String, String, i64, i64, String, DateTime<Utc>, Option<DateTime<Utc>>);

/**
 * Database response type for city and club members: id, user id, user name, approved.
 */
pub type QueryMemberDbResp = (i64, String, String, bool);

/**
 * Which administrations to read, relative to the timestamp bound as `$2`. An administration closed at
 * its own start date never took office and only counts as previous.
 */
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdministrationPeriod {
    Current,
    Previous,
    All,
}

impl AdministrationPeriod {
    pub fn predicate(&self) -> &'static str {
        match self {
            AdministrationPeriod::Current => "(a.end_date IS NULL OR a.end_date > GREATEST($2, a.start_date))",
            AdministrationPeriod::Previous => "(a.end_date IS NOT NULL AND a.end_date <= GREATEST($2, a.start_date))",
            AdministrationPeriod::All => "($2::timestamptz IS NOT NULL)",
        }
    }
}

impl From<QueryAdministrationDbResp> for AdministrationDetailType {
    fn from(row: QueryAdministrationDbResp) -> Self {
        AdministrationDetailType {
            id: row.0,
            user_id: row.1,
            user_name: row.2,
            owner_id: row.3,
            admin_type: AdminType { id: row.4, name: row.5 },
            start_date: row.6,
            end_date: row.7,
        }
    }
}

impl From<QueryMemberDbResp> for MemberDetailType {
    fn from(row: QueryMemberDbResp) -> Self {
        MemberDetailType { id: row.0, user_id: row.1, user_name: row.2, is_approved: row.3 }
    }
}

/**
 * Constructs a `PaginationOutput` based on the pagination input and the number of elements.
 * Queries fetch one row more than the page size so that a following page can be detected.
 *
 * # Arguments
 * `pagination_input`: The input containing pagination parameters.
 * `elements_size`: The number of elements retrieved from the database.
 *
 * # Returns
 * A `PaginationOutput` instance containing pagination details.
 */
pub fn get_pagination_output(pagination_input: &PaginationInput, elements_size: i64) -> PaginationOutput {
    let has_more_elements = elements_size > pagination_input.page_size;
    PaginationOutput::new(pagination_input.start_index, pagination_input.page_size, has_more_elements)
}

/**
 * Cuts the extra lookahead row off a fetched page and computes the pagination output.
 */
pub fn into_page<T>(pagination_input: &PaginationInput, mut elements: Vec<T>) -> Result<(Vec<T>, PaginationOutput), ApplicationError> {
    let pagination_output = get_pagination_output(
        pagination_input,
        i64::try_from(elements.len()).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Failed to get pagination output: {err}")))?,
    );
    elements.truncate(usize::try_from(pagination_input.page_size).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Failed to truncate elements: {err}")))?);
    Ok((elements, pagination_output))
}

/**
 * Handles database errors and maps them to application errors.
 *
 * # Arguments
 * `error`: The sqlx error to handle.
 *
 * # Returns
 * An `ApplicationError` corresponding to the database error.
 */
pub fn handle_database_error(error: &sqlx::Error) -> ApplicationError {
    if let Some(db_error) = error.as_database_error() {
        tracing::debug!("Database error: {}", db_error);
        tracing::info!("Add/Update error: {:?}", db_error.code());
        if db_error.code() == Some(Cow::Borrowed("23505")) {
            // Unique violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Already exists".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("23503")) {
            // Foreign key violation
            return ApplicationError::new(ErrorType::ConstraintViolation, "Missing parent value".to_string());
        } else if db_error.code() == Some(Cow::Borrowed("22001")) {
            // Value too long
            return ApplicationError::new(ErrorType::Validation, "Value too long".to_string());
        }
        tracing::error!("Unhandled database error: {}", db_error);
        return ApplicationError::new(ErrorType::DatabaseError, "Unhandled database error".to_string());
    }
    ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute database operation: {error}"))
}

/**
 * Maps the number of affected rows of a single row update or delete to a result.
 * More than one affected row aborts the surrounding transaction.
 */
pub fn expect_single_row(rows_affected: u64, entity: &str) -> Result<(), ApplicationError> {
    if rows_affected == 0 {
        tracing::debug!("{} not found", entity);
        return Err(ApplicationError::not_found(entity));
    }
    if rows_affected > 1 {
        tracing::warn!("Multiple {} rows affected. Rolled back", entity);
        return Err(ApplicationError::new(ErrorType::Application, format!("Multiple {entity} rows affected. Rolled back")));
    }
    Ok(())
}
