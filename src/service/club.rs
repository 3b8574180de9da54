use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::club::ClubDao,
    model::{
        apperror::ApplicationError,
        models::{AuthenticatedUser, ClubDetailType, ClubInputType, ClubProfileType, ListOutputType, PaginationInput},
    },
    service::{
        access::{AccessService, follower_id},
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for clubs and their members.
 */
pub struct ClubService {
    club_dao: ClubDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ClubService {
    pub fn new(club_dao: ClubDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ClubService { club_dao, access_service, connection_pool }
    }

    async fn get_existing(&self, connection: &mut PgConnection, club_id: i64) -> Result<ClubDetailType, ApplicationError> {
        self.club_dao.get_by_id(connection, club_id).await?.ok_or_else(|| ApplicationError::not_found("Club"))
    }

    pub async fn list(&self, pagination_input: PaginationInput, name: Option<String>) -> Result<ListOutputType<ClubDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let (clubs, pagination) = self.club_dao.get_club_list(&mut connection, pagination_input, name).await?;
        Ok(ListOutputType::new(clubs, pagination))
    }

    pub async fn has_access(&self, user: &AuthenticatedUser, club_id: i64) -> Result<bool, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_existing(&mut connection, club_id).await?;
        self.access_service.has_club_access(&mut connection, user, club_id).await
    }

    /**
     * Retrieves a club with its current administration, approved members and followers.
     */
    pub async fn get_profile(&self, club_id: i64) -> Result<ClubProfileType, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let club = self.get_existing(&mut connection, club_id).await?;
        let admins = self.club_dao.get_current_administrations(&mut connection, club_id, None, Utc::now()).await?;
        let members = self.club_dao.get_members(&mut connection, club_id, true).await?;
        let followers = self.club_dao.get_members(&mut connection, club_id, false).await?;
        Ok(ClubProfileType { club, admins, members, followers })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, user: &AuthenticatedUser, input: ClubInputType) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            self.club_dao.add(&mut transaction, input).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, user: &AuthenticatedUser, club_id: i64, input: ClubInputType) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.get_existing(&mut transaction, club_id).await?;
            self.access_service.ensure_club_access(&mut transaction, user, club_id).await?;
            self.club_dao.update(&mut transaction, club_id, input).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Adds a user as follower of a club. Only admins may add someone other than themselves. A user
     * belongs to one club at a time, so earlier memberships of the user are removed.
     *
     * # Returns
     * The id of the new membership.
     */
    #[instrument(skip(self))]
    pub async fn add_follower(&self, user: &AuthenticatedUser, club_id: i64, user_id: Option<String>) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            self.get_existing(&mut transaction, club_id).await?;
            let is_admin = self.access_service.is_admin(&mut transaction, user).await?;
            let follower_id = follower_id(user, is_admin, user_id)?;
            let removed = self.club_dao.remove_memberships_of_user(&mut transaction, &follower_id).await?;
            if removed > 0 {
                tracing::info!("Removed {} earlier club memberships of user {}", removed, follower_id);
            }
            self.club_dao.add_follower(&mut transaction, club_id, &follower_id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Flips a membership between follower and approved member.
     */
    #[instrument(skip(self))]
    pub async fn toggle_is_approved(&self, user: &AuthenticatedUser, member_id: i64, club_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.get_existing(&mut transaction, club_id).await?;
            self.access_service.ensure_club_access(&mut transaction, user, club_id).await?;
            self.club_dao.toggle_is_approved(&mut transaction, member_id, club_id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Removes a follower. Followers may leave on their own; anyone else needs access to the club.
     */
    #[instrument(skip(self))]
    pub async fn remove_follower(&self, user: &AuthenticatedUser, member_id: i64, club_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let member = self.club_dao.get_member(&mut transaction, member_id, club_id).await?.ok_or_else(|| ApplicationError::not_found("Club member"))?;
            if member.user_id != user.id {
                self.access_service.ensure_club_access(&mut transaction, user, club_id).await?;
            }
            self.club_dao.remove_member(&mut transaction, member_id, club_id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Removes a member or follower of a club on behalf of the club's administration.
     */
    #[instrument(skip(self))]
    pub async fn remove_member(&self, user: &AuthenticatedUser, member_id: i64, club_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.get_existing(&mut transaction, club_id).await?;
            self.access_service.ensure_club_access(&mut transaction, user, club_id).await?;
            self.club_dao.remove_member(&mut transaction, member_id, club_id).await
        }
        .await;
        finish(transaction, result).await
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::{
        dao::{
            city::CityDao,
            test_support::{init_db, insert_club, insert_user},
            user::UserDao,
        },
        model::apperror::ErrorType,
    };

    fn club_service(pool: &Pool<Postgres>) -> ClubService {
        let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
        ClubService::new(ClubDao::new(), access_service, Some(pool.clone()))
    }

    #[sqlx::test]
    async fn test_following_another_club_moves_membership() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let suffix = uuid::Uuid::new_v4();
        let user_id = insert_user(&mut connection, &format!("moving-{suffix}")).await;
        let first_club = insert_club(&mut connection, &format!("First {suffix}")).await;
        let second_club = insert_club(&mut connection, &format!("Second {suffix}")).await;
        drop(connection);
        let service = club_service(&pool);
        let user = AuthenticatedUser::new(user_id.clone(), None, false);
        service.add_follower(&user, first_club, None).await.unwrap();
        service.add_follower(&user, second_club, None).await.unwrap();
        assert!(service.get_profile(first_club).await.unwrap().followers.is_empty());
        let followers = service.get_profile(second_club).await.unwrap().followers;
        assert_eq!(followers.iter().map(|follower| follower.user_id.as_str()).collect::<Vec<_>>(), vec![user_id.as_str()]);
    }

    #[sqlx::test]
    async fn test_follower_leaves_but_cannot_remove_others() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let suffix = uuid::Uuid::new_v4();
        let follower = insert_user(&mut connection, &format!("follower-{suffix}")).await;
        let stranger = insert_user(&mut connection, &format!("stranger-{suffix}")).await;
        let club_id = insert_club(&mut connection, &format!("Leaving {suffix}")).await;
        drop(connection);
        let service = club_service(&pool);
        let follower = AuthenticatedUser::new(follower, None, false);
        let stranger = AuthenticatedUser::new(stranger, None, false);
        let member_id = service.add_follower(&follower, club_id, None).await.unwrap();
        assert_eq!(service.remove_follower(&stranger, member_id, club_id).await.unwrap_err().error_type, ErrorType::Forbidden);
        assert_eq!(service.remove_member(&follower, member_id, club_id).await.unwrap_err().error_type, ErrorType::Forbidden);
        service.remove_follower(&follower, member_id, club_id).await.unwrap();
        assert!(service.get_profile(club_id).await.unwrap().followers.is_empty());
    }

    #[sqlx::test]
    async fn test_admin_removes_approved_member() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let suffix = uuid::Uuid::new_v4();
        let user_id = insert_user(&mut connection, &format!("member-{suffix}")).await;
        let club_id = insert_club(&mut connection, &format!("Members {suffix}")).await;
        drop(connection);
        let service = club_service(&pool);
        let admin = AuthenticatedUser::new("admin".to_string(), None, true);
        let member_id = service.add_follower(&admin, club_id, Some(user_id)).await.unwrap();
        service.toggle_is_approved(&admin, member_id, club_id).await.unwrap();
        assert_eq!(service.get_profile(club_id).await.unwrap().members.len(), 1);
        service.remove_member(&admin, member_id, club_id).await.unwrap();
        assert!(service.get_profile(club_id).await.unwrap().members.is_empty());
        assert_eq!(service.remove_member(&admin, member_id, club_id).await.unwrap_err().error_type, ErrorType::NotFound);
    }
}
