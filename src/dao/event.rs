use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{expect_single_row, handle_database_error, into_page},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{EventAdminType, EventCategoryType, EventDetailType, EventFilterType, EventInputType, EventTypeType, PaginationInput, PaginationOutput},
    },
};

/**
 * Database response type for querying events.
 */
pub type QueryEventDbResp = (i64, String, Option<String>, i64, String, i64, String, String, DateTime<Utc>, DateTime<Utc>, Option<String>);

const QUERY_EVENT_TYPES: &str = "SELECT id, name FROM event_types ORDER BY name";

const QUERY_CATEGORIES: &str = "SELECT id, name, event_type_id FROM event_categories
                                WHERE ($1::bigint IS NULL OR event_type_id = $1) AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
                                ORDER BY name LIMIT $3 OFFSET $4";

const QUERY_ALL_CATEGORIES: &str = "SELECT id, name, event_type_id FROM event_categories WHERE ($1::bigint IS NULL OR event_type_id = $1) ORDER BY name";

const QUERY_STATUS_ID: &str = "SELECT id FROM event_statuses WHERE name = $1";

const SELECT_EVENT: &str = "SELECT e.id, e.name, e.description, e.event_type_id, t.name, e.event_category_id, c.name, s.name, e.start_date, e.end_date, e.location
                            FROM events e
                            JOIN event_types t ON t.id = e.event_type_id
                            JOIN event_categories c ON c.id = e.event_category_id
                            JOIN event_statuses s ON s.id = e.event_status_id";

const QUERY_EVENT_ADMINS: &str = "SELECT a.user_id, u.first_name || ' ' || u.last_name FROM event_admins a JOIN users u ON u.id = a.user_id WHERE a.event_id = $1 ORDER BY u.last_name";

const ADD_EVENT: &str = "INSERT INTO events (name, description, event_type_id, event_category_id, event_status_id, start_date, end_date, location)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id";

const ADD_EVENT_ADMIN: &str = "INSERT INTO event_admins (event_id, user_id) VALUES ($1, $2)";

const QUERY_IS_EVENT_ADMIN: &str = "SELECT EXISTS (SELECT 1 FROM event_admins WHERE event_id = $1 AND user_id = $2)";

const UPDATE_EVENT_STATUS: &str = "UPDATE events SET event_status_id = $1 WHERE id = $2";

const DELETE_EVENT: &str = "DELETE FROM events WHERE id = $1";

impl From<QueryEventDbResp> for EventDetailType {
    fn from(row: QueryEventDbResp) -> Self {
        EventDetailType {
            id: row.0,
            name: row.1,
            description: row.2,
            event_type_id: row.3,
            event_type_name: row.4,
            event_category_id: row.5,
            event_category_name: row.6,
            event_status: row.7,
            start_date: row.8,
            end_date: row.9,
            location: row.10,
            admins: vec![],
        }
    }
}

/**
 * DAO for events and their lookup tables.
 */
pub struct EventDao {}

impl EventDao {
    pub fn new() -> Self {
        EventDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_event_types(&self, connection: &mut PgConnection) -> Result<Vec<EventTypeType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(i64, String)> = sqlx::query_as(QUERY_EVENT_TYPES)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event types: {err}")))?;
        Ok(results.into_iter().map(|(id, name)| EventTypeType { id, name }).collect())
    }

    /**
     * Retrieves a page of event categories, optionally by event type and name fragment.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_categories(
        &self,
        connection: &mut PgConnection,
        event_type_id: Option<i64>,
        name: Option<String>,
        pagination_input: PaginationInput,
    ) -> Result<(Vec<EventCategoryType>, PaginationOutput), ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(i64, String, i64)> = sqlx::query_as(QUERY_CATEGORIES)
            .bind(event_type_id)
            .bind(name)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event categories: {err}")))?;
        into_page(&pagination_input, results.into_iter().map(|(id, name, event_type_id)| EventCategoryType { id, name, event_type_id }).collect())
    }

    /**
     * Retrieves every event category, optionally of one event type.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_all_categories(&self, connection: &mut PgConnection, event_type_id: Option<i64>) -> Result<Vec<EventCategoryType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(i64, String, i64)> = sqlx::query_as(QUERY_ALL_CATEGORIES)
            .bind(event_type_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get all event categories: {err}")))?;
        Ok(results.into_iter().map(|(id, name, event_type_id)| EventCategoryType { id, name, event_type_id }).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_status_id(&self, connection: &mut PgConnection, status_name: &str) -> Result<Option<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<(i64,)> = sqlx::query_as(QUERY_STATUS_ID)
            .bind(status_name)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event status: {err}")))?;
        Ok(result.map(|row| row.0))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_event_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, filter: EventFilterType) -> Result<(Vec<EventDetailType>, PaginationOutput), ApplicationError> {
        let span = tracing::Span::current();
        let query = format!(
            "{SELECT_EVENT} WHERE ($1::bigint IS NULL OR e.event_type_id = $1) AND ($2::bigint IS NULL OR e.event_category_id = $2) ORDER BY e.start_date DESC, e.id LIMIT $3 OFFSET $4"
        );
        let results: Vec<QueryEventDbResp> = sqlx::query_as(&query)
            .bind(filter.event_type_id)
            .bind(filter.event_category_id)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event list: {err}")))?;
        into_page(&pagination_input, results.into_iter().map(EventDetailType::from).collect())
    }

    /**
     * Retrieves an event together with its admins.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_event(&self, connection: &mut PgConnection, event_id: i64) -> Result<Option<EventDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_EVENT} WHERE e.id = $1");
        let result: Option<QueryEventDbResp> = sqlx::query_as(&query)
            .bind(event_id)
            .fetch_optional(&mut *connection)
            .instrument(span.clone())
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event: {err}")))?;
        let Some(row) = result else {
            return Ok(None);
        };
        let admins: Vec<(String, String)> = sqlx::query_as(QUERY_EVENT_ADMINS)
            .bind(event_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get event admins: {err}")))?;
        let mut event = EventDetailType::from(row);
        event.admins = admins.into_iter().map(|(user_id, user_name)| EventAdminType { user_id, user_name }).collect();
        Ok(Some(event))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_event(&self, transaction: &mut PgConnection, input: EventInputType, status_id: i64) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_EVENT)
            .bind(input.name)
            .bind(input.description)
            .bind(input.event_type_id)
            .bind(input.event_category_id)
            .bind(status_id)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(input.location)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_event_admin(&self, transaction: &mut PgConnection, event_id: i64, user_id: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_EVENT_ADMIN)
            .bind(event_id)
            .bind(user_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn is_event_admin(&self, connection: &mut PgConnection, event_id: i64, user_id: &str) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(QUERY_IS_EVENT_ADMIN)
            .bind(event_id)
            .bind(user_id)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to check event admin: {err}")))?;
        Ok(exists.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_status(&self, transaction: &mut PgConnection, event_id: i64, status_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_EVENT_STATUS)
            .bind(status_id)
            .bind(event_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to update event status: {err}")))?;
        expect_single_row(result.rows_affected(), "Event")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete_event(&self, transaction: &mut PgConnection, event_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_EVENT)
            .bind(event_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete event: {err}")))?;
        expect_single_row(result.rows_affected(), "Event")
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::test_support::{init_db, insert_user},
        model::models::{EVENT_STATUS_APPROVED, EVENT_STATUS_NOT_APPROVED, MAX_PAGE_SIZE},
    };

    #[sqlx::test]
    async fn test_add_approve_then_delete_event() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = EventDao::new();
        let user_id = insert_user(&mut transaction, "event-admin").await;
        let type_id: (i64,) = sqlx::query_as("INSERT INTO event_types (name) VALUES ('Camp') RETURNING id").fetch_one(&mut *transaction).await.unwrap();
        let category_id: (i64,) =
            sqlx::query_as("INSERT INTO event_categories (name, event_type_id) VALUES ('Summer camp', $1) RETURNING id").bind(type_id.0).fetch_one(&mut *transaction).await.unwrap();
        let not_approved = dao.get_status_id(&mut transaction, EVENT_STATUS_NOT_APPROVED).await.unwrap().unwrap();
        let now = Utc::now();
        let input = EventInputType {
            name: "Test Camp".to_string(),
            description: None,
            event_type_id: type_id.0,
            event_category_id: category_id.0,
            start_date: now,
            end_date: now + chrono::Duration::days(7),
            location: Some("Forest".to_string()),
        };
        let event_id = dao.add_event(&mut transaction, input, not_approved).await.unwrap();
        dao.add_event_admin(&mut transaction, event_id, &user_id).await.unwrap();
        assert!(dao.is_event_admin(&mut transaction, event_id, &user_id).await.unwrap());

        let approved = dao.get_status_id(&mut transaction, EVENT_STATUS_APPROVED).await.unwrap().unwrap();
        dao.update_status(&mut transaction, event_id, approved).await.unwrap();
        let event = dao.get_event(&mut transaction, event_id).await.unwrap().unwrap();
        assert_eq!(event.event_status, EVENT_STATUS_APPROVED);
        assert_eq!(event.admins.len(), 1);

        let (categories, _) = dao.get_categories(&mut transaction, Some(type_id.0), Some("summer".to_string()), PaginationInput { start_index: 0, page_size: 10 }).await.unwrap();
        assert_eq!(categories.len(), 1);

        dao.delete_event(&mut transaction, event_id).await.unwrap();
        assert!(dao.get_event(&mut transaction, event_id).await.unwrap().is_none());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_all_categories_are_not_paged() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = EventDao::new();
        let type_id: (i64,) = sqlx::query_as("INSERT INTO event_types (name) VALUES ('Course') RETURNING id").fetch_one(&mut *transaction).await.unwrap();
        sqlx::query("INSERT INTO event_categories (name, event_type_id) SELECT 'Course ' || n, $1 FROM generate_series(1, $2) n")
            .bind(type_id.0)
            .bind(MAX_PAGE_SIZE + 5)
            .execute(&mut *transaction)
            .await
            .unwrap();
        let categories = dao.get_all_categories(&mut transaction, Some(type_id.0)).await.unwrap();
        assert_eq!(categories.len(), usize::try_from(MAX_PAGE_SIZE + 5).unwrap());
        assert!(categories.iter().all(|category| category.event_type_id == type_id.0));
        assert!(dao.get_all_categories(&mut transaction, None).await.unwrap().len() >= categories.len());
        transaction.rollback().await.unwrap();
    }
}
