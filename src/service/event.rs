use std::sync::Arc;

use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::event::EventDao,
    model::{
        apperror::ApplicationError,
        models::{
            AuthenticatedUser, EVENT_STATUS_APPROVED, EVENT_STATUS_NOT_APPROVED, EventCategoryType, EventDetailType, EventFilterType, EventInputType, EventTypeType, ListOutputType,
            PaginationInput,
        },
    },
    service::{
        access::AccessService,
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for events, their types, categories and statuses.
 */
pub struct EventService {
    event_dao: EventDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl EventService {
    pub fn new(event_dao: EventDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        EventService { event_dao, access_service, connection_pool }
    }

    pub async fn get_event_types(&self) -> Result<Vec<EventTypeType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.event_dao.get_event_types(&mut connection).await
    }

    pub async fn get_categories(&self) -> Result<Vec<EventCategoryType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.event_dao.get_all_categories(&mut connection, None).await
    }

    pub async fn get_categories_by_type(&self, event_type_id: i64) -> Result<Vec<EventCategoryType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.event_dao.get_all_categories(&mut connection, Some(event_type_id)).await
    }

    /**
     * One page of the categories of an event type, optionally filtered by a name fragment.
     */
    pub async fn get_categories_by_type_page(&self, event_type_id: i64, pagination_input: PaginationInput, name: Option<String>) -> Result<ListOutputType<EventCategoryType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let (categories, pagination) = self.event_dao.get_categories(&mut connection, Some(event_type_id), name, pagination_input).await?;
        Ok(ListOutputType::new(categories, pagination))
    }

    pub async fn get_status_id(&self, status_name: &str) -> Result<i64, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.status_id(&mut connection, status_name).await
    }

    async fn status_id(&self, connection: &mut PgConnection, status_name: &str) -> Result<i64, ApplicationError> {
        self.event_dao.get_status_id(connection, status_name).await?.ok_or_else(|| ApplicationError::not_found(&format!("Event status {status_name}")))
    }

    pub async fn list(&self, pagination_input: PaginationInput, filter: EventFilterType) -> Result<ListOutputType<EventDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let (events, pagination) = self.event_dao.get_event_list(&mut connection, pagination_input, filter).await?;
        Ok(ListOutputType::new(events, pagination))
    }

    pub async fn get_event(&self, event_id: i64) -> Result<EventDetailType, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.event_dao.get_event(&mut connection, event_id).await?.ok_or_else(|| ApplicationError::not_found("Event"))
    }

    /**
     * Creates an event awaiting approval, with the creator as its admin.
     *
     * # Returns
     * The id of the new event.
     */
    #[instrument(skip(self, input))]
    pub async fn create(&self, user: &AuthenticatedUser, input: EventInputType) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            let status_id = self.status_id(&mut transaction, EVENT_STATUS_NOT_APPROVED).await?;
            let event_id = self.event_dao.add_event(&mut transaction, input, status_id).await?;
            self.event_dao.add_event_admin(&mut transaction, event_id, &user.id).await?;
            Ok(event_id)
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Approves an event. Admin only.
     */
    #[instrument(skip(self))]
    pub async fn approve(&self, user: &AuthenticatedUser, event_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            let status_id = self.status_id(&mut transaction, EVENT_STATUS_APPROVED).await?;
            self.event_dao.update_status(&mut transaction, event_id, status_id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Deletes an event. Allowed for its admins and for admins.
     */
    #[instrument(skip(self))]
    pub async fn delete(&self, user: &AuthenticatedUser, event_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            if self.event_dao.get_event(&mut transaction, event_id).await?.is_none() {
                return Err(ApplicationError::not_found("Event"));
            }
            if !self.event_dao.is_event_admin(&mut transaction, event_id, &user.id).await? && !self.access_service.is_admin(&mut transaction, user).await? {
                return Err(ApplicationError::forbidden());
            }
            self.event_dao.delete_event(&mut transaction, event_id).await
        }
        .await;
        finish(transaction, result).await
    }
}
