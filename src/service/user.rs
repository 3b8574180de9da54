use std::sync::Arc;

use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::user::UserDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AuthenticatedUser, UserDetailType},
    },
    service::{
        access::AccessService,
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for users and their roles. Changing roles is admin only.
 */
pub struct UserService {
    user_dao: UserDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl UserService {
    pub fn new(user_dao: UserDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        UserService { user_dao, access_service, connection_pool }
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<UserDetailType, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.user_dao.find_by_id(&mut connection, user_id).await?.ok_or_else(|| ApplicationError::not_found("User"))
    }

    pub async fn get_roles(&self, user_id: &str) -> Result<Vec<String>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.user_dao.get_roles(&mut connection, user_id).await
    }

    /**
     * Whether the user holds any of the roles.
     */
    pub async fn is_in_role(&self, user_id: &str, roles: &[&str]) -> Result<bool, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.user_dao.is_in_role(&mut connection, user_id, roles).await
    }

    /**
     * Fails with `Forbidden` unless the user is an admin.
     */
    pub async fn ensure_admin(&self, user: &AuthenticatedUser) -> Result<(), ApplicationError> {
        if user.admin {
            return Ok(());
        }
        let mut connection = acquire(&self.connection_pool).await?;
        self.access_service.ensure_admin(&mut connection, user).await
    }

    #[instrument(skip(self))]
    pub async fn add_to_role(&self, user: &AuthenticatedUser, user_id: &str, role: &str) -> Result<(), ApplicationError> {
        let role = validate_role(role)?;
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            if self.user_dao.find_by_id(&mut transaction, user_id).await?.is_none() {
                return Err(ApplicationError::not_found("User"));
            }
            self.user_dao.add_to_role(&mut transaction, user_id, role).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn remove_from_role(&self, user: &AuthenticatedUser, user_id: &str, role: &str) -> Result<(), ApplicationError> {
        let role = validate_role(role)?;
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            self.user_dao.remove_from_role(&mut transaction, user_id, role).await
        }
        .await;
        finish(transaction, result).await
    }
}

fn validate_role(role: &str) -> Result<&str, ApplicationError> {
    let role = role.trim();
    if role.is_empty() {
        return Err(ApplicationError::new(ErrorType::Validation, "Role is required".to_string()));
    }
    Ok(role)
}
