use std::collections::HashSet;

use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;

use crate::{
    dao::{city::CityDao, club::ClubDao, user::UserDao},
    model::{
        apperror::ApplicationError,
        models::{AccessScope, AuthenticatedUser, DocumentOwner, ROLE_ADMIN},
    },
};

/**
 * Resolves what part of the city/club hierarchy a user may act on.
 *
 * Admins, by token claim or by the `Admin` role, may act on everything. Other users may act on
 * the cities they currently administer, directly or through their region, and on the clubs they
 * currently head.
 */
pub struct AccessService {
    city_dao: CityDao,
    club_dao: ClubDao,
    user_dao: UserDao,
}

impl AccessService {
    pub fn new(city_dao: CityDao, club_dao: ClubDao, user_dao: UserDao) -> Self {
        AccessService { city_dao, club_dao, user_dao }
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn is_admin(&self, connection: &mut PgConnection, user: &AuthenticatedUser) -> Result<bool, ApplicationError> {
        if user.admin {
            return Ok(true);
        }
        self.user_dao.is_in_role(connection, &user.id, &[ROLE_ADMIN]).await
    }

    /**
     * Fails with `Forbidden` unless the user is an admin.
     */
    pub async fn ensure_admin(&self, connection: &mut PgConnection, user: &AuthenticatedUser) -> Result<(), ApplicationError> {
        if self.is_admin(connection, user).await? { Ok(()) } else { Err(ApplicationError::forbidden()) }
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_city_scope(&self, connection: &mut PgConnection, user: &AuthenticatedUser) -> Result<AccessScope, ApplicationError> {
        if self.is_admin(connection, user).await? {
            return Ok(AccessScope::All);
        }
        let city_ids = self.city_dao.get_administered_city_ids(connection, &user.id, Utc::now()).await?;
        Ok(limited_scope(city_ids))
    }

    pub async fn has_city_access(&self, connection: &mut PgConnection, user: &AuthenticatedUser, city_id: i64) -> Result<bool, ApplicationError> {
        Ok(self.get_city_scope(connection, user).await?.permits(city_id))
    }

    pub async fn ensure_city_access(&self, connection: &mut PgConnection, user: &AuthenticatedUser, city_id: i64) -> Result<(), ApplicationError> {
        self.get_city_scope(connection, user).await?.ensure(city_id)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_club_scope(&self, connection: &mut PgConnection, user: &AuthenticatedUser) -> Result<AccessScope, ApplicationError> {
        if self.is_admin(connection, user).await? {
            return Ok(AccessScope::All);
        }
        let club_ids = self.club_dao.get_headed_club_ids(connection, &user.id, Utc::now()).await?;
        Ok(limited_scope(club_ids))
    }

    pub async fn has_club_access(&self, connection: &mut PgConnection, user: &AuthenticatedUser, club_id: i64) -> Result<bool, ApplicationError> {
        Ok(self.get_club_scope(connection, user).await?.permits(club_id))
    }

    pub async fn ensure_club_access(&self, connection: &mut PgConnection, user: &AuthenticatedUser, club_id: i64) -> Result<(), ApplicationError> {
        self.get_club_scope(connection, user).await?.ensure(club_id)
    }

    /**
     * Checks access to the city or club owning a document, and that the owner exists.
     */
    pub async fn ensure_owner_access(&self, connection: &mut PgConnection, user: &AuthenticatedUser, owner: DocumentOwner, owner_id: i64) -> Result<(), ApplicationError> {
        match owner {
            DocumentOwner::City => {
                if self.city_dao.get_by_id(connection, owner_id).await?.is_none() {
                    return Err(ApplicationError::not_found("City"));
                }
                self.ensure_city_access(connection, user, owner_id).await
            }
            DocumentOwner::Club => {
                if self.club_dao.get_by_id(connection, owner_id).await?.is_none() {
                    return Err(ApplicationError::not_found("Club"));
                }
                self.ensure_club_access(connection, user, owner_id).await
            }
        }
    }
}

/**
 * The user to add as follower of a city or club. Non-admins can only add themselves.
 */
pub fn follower_id(user: &AuthenticatedUser, is_admin: bool, requested: Option<String>) -> Result<String, ApplicationError> {
    match requested {
        None => Ok(user.id.clone()),
        Some(requested) if requested == user.id || is_admin => Ok(requested),
        Some(_) => Err(ApplicationError::forbidden()),
    }
}

fn limited_scope(ids: Vec<i64>) -> AccessScope {
    AccessScope::Limited(ids.into_iter().collect::<HashSet<i64>>())
}

/**
 * Ids to filter a query by, `None` meaning no filter.
 */
pub fn scope_filter(scope: &AccessScope) -> Option<Vec<i64>> {
    match scope {
        AccessScope::All => None,
        AccessScope::Limited(ids) => {
            let mut ids: Vec<i64> = ids.iter().copied().collect();
            ids.sort_unstable();
            Some(ids)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    #[test]
    fn test_follower_id() {
        let user = AuthenticatedUser::new("me".to_string(), None, false);
        assert_eq!(follower_id(&user, false, None).unwrap(), "me");
        assert_eq!(follower_id(&user, false, Some("me".to_string())).unwrap(), "me");
        assert_eq!(follower_id(&user, false, Some("other".to_string())).unwrap_err().error_type, ErrorType::Forbidden);
        assert_eq!(follower_id(&user, true, Some("other".to_string())).unwrap(), "other");
    }

    #[test]
    fn test_scope_filter() {
        assert_eq!(scope_filter(&AccessScope::All), None);
        assert_eq!(scope_filter(&limited_scope(vec![3, 1, 3])), Some(vec![1, 3]));
        assert_eq!(scope_filter(&limited_scope(vec![])), Some(vec![]));
    }

    #[test]
    fn test_limited_scope_permits_only_listed() {
        let scope = limited_scope(vec![5]);
        assert!(scope.permits(5));
        assert!(!scope.permits(6));
    }
}
