use sqlx::{Pool, Postgres, Transaction, pool::PoolConnection};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Returns the pool, or an error when the service was created without one.
 */
fn get_pool(connection_pool: &Option<Pool<Postgres>>) -> Result<&Pool<Postgres>, ApplicationError> {
    let Some(connection_pool) = connection_pool else {
        return Err(ApplicationError::new(ErrorType::DatabaseError, "No database connection available".to_string()));
    };
    Ok(connection_pool)
}

/**
 * Acquires a connection for read only work.
 */
pub async fn acquire(connection_pool: &Option<Pool<Postgres>>) -> Result<PoolConnection<Postgres>, ApplicationError> {
    get_pool(connection_pool)?
        .acquire()
        .await
        .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
}

pub async fn begin(connection_pool: &Option<Pool<Postgres>>) -> Result<Transaction<'static, Postgres>, ApplicationError> {
    get_pool(connection_pool)?
        .begin()
        .await
        .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
}

/**
 * Commits the transaction when the work succeeded, rolls it back otherwise.
 *
 * # Arguments
 * `transaction`: The transaction the work ran in.
 * `result`: Outcome of the work.
 *
 * # Returns
 * The outcome of the work, or the commit error.
 */
pub async fn finish<T>(transaction: Transaction<'static, Postgres>, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
    match result {
        Ok(value) => {
            transaction.commit().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to commit transaction: {err}")))?;
            Ok(value)
        }
        Err(err) => {
            transaction.rollback().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to rollback transaction: {err}")))?;
            Err(err)
        }
    }
}

