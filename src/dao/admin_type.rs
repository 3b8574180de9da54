use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::handle_database_error,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::AdminType,
    },
};

const QUERY_ADMIN_TYPE_BY_NAME: &str = "SELECT id, name FROM admin_types WHERE name = $1";

const ADD_ADMIN_TYPE: &str = "INSERT INTO admin_types (name) VALUES ($1) ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id, name";

/**
 * DAO for the admin types shared by region, city and club administrations.
 */
pub struct AdminTypeDao {}

impl AdminTypeDao {
    pub fn new() -> Self {
        AdminTypeDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_by_name(&self, connection: &mut PgConnection, name: &str) -> Result<Option<AdminType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<(i64, String)> = sqlx::query_as(QUERY_ADMIN_TYPE_BY_NAME)
            .bind(name)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get admin type: {err}")))?;
        Ok(result.map(|(id, name)| AdminType { id, name }))
    }

    /**
     * Adds an admin type. Adding an existing name returns the existing type.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add(&self, transaction: &mut PgConnection, name: &str) -> Result<AdminType, ApplicationError> {
        let span = tracing::Span::current();
        let (id, name): (i64, String) = sqlx::query_as(ADD_ADMIN_TYPE)
            .bind(name)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(AdminType { id, name })
    }

    /**
     * Looks up an admin type by name, adding it when missing.
     */
    pub async fn get_or_add(&self, connection: &mut PgConnection, name: &str) -> Result<AdminType, ApplicationError> {
        match self.get_by_name(connection, name).await? {
            Some(admin_type) => Ok(admin_type),
            None => self.add(connection, name).await,
        }
    }
}
