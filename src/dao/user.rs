use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::handle_database_error,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::UserDetailType,
    },
};

/**
 * Database response type for querying a user.
 */
pub type QueryUserDbResp = (String, String, String, String);

const QUERY_USER: &str = "SELECT id, email, first_name, last_name FROM users WHERE id = $1";

const QUERY_ROLES: &str = "SELECT role FROM user_roles WHERE user_id = $1 ORDER BY role";

const QUERY_IN_ROLE: &str = "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = ANY($2))";

const ADD_ROLE: &str = "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING";

const REMOVE_ROLE: &str = "DELETE FROM user_roles WHERE user_id = $1 AND role = $2";

impl From<QueryUserDbResp> for UserDetailType {
    fn from(row: QueryUserDbResp) -> Self {
        UserDetailType { id: row.0, email: row.1, first_name: row.2, last_name: row.3 }
    }
}

/**
 * DAO for users and their roles.
 */
pub struct UserDao {}

impl UserDao {
    pub fn new() -> Self {
        UserDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn find_by_id(&self, connection: &mut PgConnection, user_id: &str) -> Result<Option<UserDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let row: Option<QueryUserDbResp> = sqlx::query_as(QUERY_USER)
            .bind(user_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get user: {err}")))?;
        Ok(row.map(UserDetailType::from))
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_roles(&self, connection: &mut PgConnection, user_id: &str) -> Result<Vec<String>, ApplicationError> {
        let span = tracing::Span::current();
        let rows: Vec<(String,)> = sqlx::query_as(QUERY_ROLES)
            .bind(user_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get roles: {err}")))?;
        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    /**
     * Checks whether the user holds at least one of the roles.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn is_in_role(&self, connection: &mut PgConnection, user_id: &str, roles: &[&str]) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let roles: Vec<String> = roles.iter().map(|role| (*role).to_string()).collect();
        let exists: (bool,) = sqlx::query_as(QUERY_IN_ROLE)
            .bind(user_id)
            .bind(roles)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to check roles: {err}")))?;
        Ok(exists.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_to_role(&self, transaction: &mut PgConnection, user_id: &str, role: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_ROLE)
            .bind(user_id)
            .bind(role)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(())
    }

    /**
     * Removes a role. Removing a role the user does not hold is not an error.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn remove_from_role(&self, transaction: &mut PgConnection, user_id: &str, role: &str) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(REMOVE_ROLE)
            .bind(user_id)
            .bind(role)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to remove role: {err}")))?;
        Ok(())
    }
}
