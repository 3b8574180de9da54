use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{admin_type::AdminTypeDao, city::CityDao, common::AdministrationPeriod},
    model::{
        apperror::ApplicationError,
        models::{ADMIN_TYPE_CITY_HEAD, AdminType, AdministrationDetailType, AdministrationInputType, AuthenticatedUser},
    },
    service::{
        access::{AccessService, follower_id},
        administration::{closing_date, replaced_heads, runs_after, takeover_date, validate_period},
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for the followers, members and administration of cities.
 *
 * A city has at most one current City Head. Access to a city follows its current administrations,
 * so no role is kept in sync here.
 */
pub struct CityParticipantsService {
    city_dao: CityDao,
    admin_type_dao: AdminTypeDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl CityParticipantsService {
    pub fn new(city_dao: CityDao, admin_type_dao: AdminTypeDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        CityParticipantsService { city_dao, admin_type_dao, access_service, connection_pool }
    }

    async fn ensure_city_exists(&self, connection: &mut PgConnection, city_id: i64) -> Result<(), ApplicationError> {
        match self.city_dao.get_by_id(connection, city_id).await? {
            Some(_) => Ok(()),
            None => Err(ApplicationError::not_found("City")),
        }
    }

    /**
     * Adds a user as follower of a city. Only admins may add someone other than themselves. Earlier
     * city memberships of the user are removed.
     *
     * # Returns
     * The id of the new membership.
     */
    #[instrument(skip(self))]
    pub async fn add_follower(&self, user: &AuthenticatedUser, city_id: i64, user_id: Option<String>) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            self.ensure_city_exists(&mut transaction, city_id).await?;
            let is_admin = self.access_service.is_admin(&mut transaction, user).await?;
            let follower_id = follower_id(user, is_admin, user_id)?;
            let removed = self.city_dao.remove_memberships_of_user(&mut transaction, &follower_id).await?;
            if removed > 0 {
                tracing::info!("Removed {} earlier city memberships of user {}", removed, follower_id);
            }
            self.city_dao.add_follower(&mut transaction, city_id, &follower_id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Removes a follower. Followers may leave on their own; anyone else needs access to the city.
     */
    #[instrument(skip(self))]
    pub async fn remove_follower(&self, user: &AuthenticatedUser, member_id: i64, city_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let member = self.city_dao.get_member(&mut transaction, member_id, city_id).await?.ok_or_else(|| ApplicationError::not_found("City member"))?;
            if member.user_id != user.id {
                self.access_service.ensure_city_access(&mut transaction, user, city_id).await?;
            }
            self.city_dao.remove_member(&mut transaction, member_id, city_id).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn toggle_is_approved(&self, user: &AuthenticatedUser, member_id: i64, city_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.ensure_city_exists(&mut transaction, city_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, city_id).await?;
            self.city_dao.toggle_is_approved(&mut transaction, member_id, city_id).await
        }
        .await;
        finish(transaction, result).await
    }

    pub async fn get_administrations_of_user(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::Current).await
    }

    pub async fn get_previous_administrations_of_user(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::Previous).await
    }

    pub async fn get_administration_statuses(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::All).await
    }

    async fn get_user_administrations(&self, user_id: &str, period: AdministrationPeriod) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.city_dao.get_administrations_of_user(&mut connection, user_id, period, Utc::now()).await
    }

    /**
     * Adds an administrator to a city. The start date defaults to now. A new City Head takes over
     * from the other heads of the city at its start date.
     */
    #[instrument(skip(self, input), fields(city_id = input.owner_id))]
    pub async fn add_administrator(&self, user: &AuthenticatedUser, input: AdministrationInputType) -> Result<AdministrationDetailType, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<AdministrationDetailType, ApplicationError> = async {
            self.ensure_city_exists(&mut transaction, input.owner_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, input.owner_id).await?;
            let now = Utc::now();
            let admin_type = self.admin_type_dao.get_or_add(&mut transaction, &input.admin_type_name).await?;
            let start_date = input.start_date_or(now);
            validate_period(start_date, input.end_date)?;
            if is_city_head(&admin_type) {
                self.end_other_heads(&mut transaction, input.owner_id, &admin_type, None, start_date, input.end_date, now).await?;
            }
            let id = self.city_dao.add_administration(&mut transaction, input.owner_id, &input.user_id, admin_type.id, start_date, input.end_date).await?;
            self.get_existing(&mut transaction, id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Edits an administration. Changing the admin type ends the administration and adds a new one
     * of the requested type.
     */
    #[instrument(skip(self, input))]
    pub async fn edit_administrator(&self, user: &AuthenticatedUser, administration_id: i64, input: AdministrationInputType) -> Result<AdministrationDetailType, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<AdministrationDetailType, ApplicationError> = async {
            let existing = self.get_existing(&mut transaction, administration_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, existing.owner_id).await?;
            let now = Utc::now();
            let admin_type = self.admin_type_dao.get_or_add(&mut transaction, &input.admin_type_name).await?;
            let same_type = admin_type.id == existing.admin_type.id;
            let start_date = if same_type { input.start_date.unwrap_or(existing.start_date) } else { input.start_date_or(now) };
            validate_period(start_date, input.end_date)?;
            if is_city_head(&admin_type) && runs_after(input.end_date, now) {
                self.end_other_heads(&mut transaction, existing.owner_id, &admin_type, Some(administration_id), start_date, input.end_date, now).await?;
            }
            if same_type {
                self.city_dao.update_administration_dates(&mut transaction, administration_id, start_date, input.end_date).await?;
                return self.get_existing(&mut transaction, administration_id).await;
            }
            self.end_administration(&mut transaction, &existing, now).await?;
            let id = self.city_dao.add_administration(&mut transaction, existing.owner_id, &existing.user_id, admin_type.id, start_date, input.end_date).await?;
            self.get_existing(&mut transaction, id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Ends an administration now. A scheduled administration is closed at its start date.
     */
    #[instrument(skip(self))]
    pub async fn remove_administrator(&self, user: &AuthenticatedUser, administration_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let existing = self.get_existing(&mut transaction, administration_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, existing.owner_id).await?;
            self.end_administration(&mut transaction, &existing, Utc::now()).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn set_end_date(&self, user: &AuthenticatedUser, administration_id: i64, end_date: DateTime<Utc>) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let existing = self.get_existing(&mut transaction, administration_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, existing.owner_id).await?;
            validate_period(existing.start_date, Some(end_date))?;
            let now = Utc::now();
            if is_city_head(&existing.admin_type) && runs_after(Some(end_date), now) {
                self.end_other_heads(&mut transaction, existing.owner_id, &existing.admin_type, Some(administration_id), existing.start_date, Some(end_date), now).await?;
            }
            self.city_dao.set_administration_end_date(&mut transaction, administration_id, end_date).await
        }
        .await;
        finish(transaction, result).await
    }

    async fn get_existing(&self, connection: &mut PgConnection, administration_id: i64) -> Result<AdministrationDetailType, ApplicationError> {
        self.city_dao.get_administration(connection, administration_id).await?.ok_or_else(|| ApplicationError::not_found("City administration"))
    }

    #[allow(clippy::too_many_arguments)]
    async fn end_other_heads(
        &self,
        connection: &mut PgConnection,
        city_id: i64,
        head_type: &AdminType,
        except_id: Option<i64>,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let takeover = takeover_date(start_date, now);
        let running = self.city_dao.get_current_administrations(connection, city_id, Some(head_type.id), takeover).await?;
        for previous in replaced_heads(&running, except_id, end_date) {
            tracing::info!("Ending city head administration {} of user {}", previous.id, previous.user_id);
            self.end_administration(connection, &previous, takeover).await?;
        }
        Ok(())
    }

    async fn end_administration(&self, connection: &mut PgConnection, administration: &AdministrationDetailType, at: DateTime<Utc>) -> Result<(), ApplicationError> {
        match closing_date(administration, at) {
            Some(end_date) => self.city_dao.set_administration_end_date(connection, administration.id, end_date).await,
            None => Ok(()),
        }
    }
}

fn is_city_head(admin_type: &AdminType) -> bool {
    admin_type.name == ADMIN_TYPE_CITY_HEAD
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_city_head() {
        assert!(is_city_head(&AdminType { id: 2, name: ADMIN_TYPE_CITY_HEAD.to_string() }));
        assert!(!is_city_head(&AdminType { id: 1, name: "Club Head".to_string() }));
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::Duration;

    use super::*;
    use crate::{
        dao::{
            club::ClubDao,
            test_support::{init_db, insert_city, insert_user},
            user::UserDao,
        },
        model::apperror::ErrorType,
    };

    struct Fixture {
        pool: Pool<Postgres>,
        service: CityParticipantsService,
        access_service: Arc<AccessService>,
        admin: AuthenticatedUser,
        city_id: i64,
        first: String,
        second: String,
    }

    impl Fixture {
        async fn new(name: &str) -> Self {
            let pool = init_db().await;
            let mut connection = pool.acquire().await.unwrap();
            let suffix = uuid::Uuid::new_v4();
            let first = insert_user(&mut connection, &format!("first-{name}-{suffix}")).await;
            let second = insert_user(&mut connection, &format!("second-{name}-{suffix}")).await;
            let city_id = insert_city(&mut connection, &format!("City {name} {suffix}")).await;
            drop(connection);
            let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
            let service = CityParticipantsService::new(CityDao::new(), AdminTypeDao::new(), access_service.clone(), Some(pool.clone()));
            let admin = AuthenticatedUser::new("admin".to_string(), None, true);
            Fixture { pool, service, access_service, admin, city_id, first, second }
        }

        fn head(&self, user_id: &str, start_date: Option<DateTime<Utc>>) -> AdministrationInputType {
            AdministrationInputType { owner_id: self.city_id, user_id: user_id.to_string(), admin_type_name: ADMIN_TYPE_CITY_HEAD.to_string(), start_date, end_date: None }
        }

        async fn current_heads(&self) -> Vec<AdministrationDetailType> {
            let mut connection = self.pool.acquire().await.unwrap();
            self.service.city_dao.get_current_administrations(&mut connection, self.city_id, None, Utc::now()).await.unwrap()
        }

        async fn has_access(&self, user_id: &str) -> bool {
            let mut connection = self.pool.acquire().await.unwrap();
            let user = AuthenticatedUser::new(user_id.to_string(), None, false);
            self.access_service.has_city_access(&mut connection, &user, self.city_id).await.unwrap()
        }
    }

    #[sqlx::test]
    async fn test_new_city_head_replaces_previous() {
        let fixture = Fixture::new("replace").await;
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        let second = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        let current = fixture.current_heads().await;
        assert_eq!(current.iter().map(|head| head.id).collect::<Vec<_>>(), vec![second.id]);
        assert_eq!(fixture.service.get_previous_administrations_of_user(&fixture.first).await.unwrap().len(), 1);
        assert!(!fixture.has_access(&fixture.first).await);
        assert!(fixture.has_access(&fixture.second).await);
    }

    #[sqlx::test]
    async fn test_reopened_city_head_ends_successor() {
        let fixture = Fixture::new("reopen").await;
        let first = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        fixture.service.edit_administrator(&fixture.admin, first.id, fixture.head(&fixture.first, None)).await.unwrap();
        let current = fixture.current_heads().await;
        assert_eq!(current.iter().map(|head| head.id).collect::<Vec<_>>(), vec![first.id]);
        fixture.service.set_end_date(&fixture.admin, first.id, Utc::now() + Duration::days(30)).await.unwrap();
        assert_eq!(fixture.current_heads().await.len(), 1);
    }

    #[sqlx::test]
    async fn test_remove_city_administrator() {
        let fixture = Fixture::new("remove").await;
        let head = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        fixture.service.remove_administrator(&fixture.admin, head.id).await.unwrap();
        assert!(fixture.current_heads().await.is_empty());
        let statuses = fixture.service.get_administration_statuses(&fixture.first).await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(fixture.service.get_administrations_of_user(&fixture.first).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn test_city_administration_requires_access() {
        let fixture = Fixture::new("forbidden").await;
        let stranger = AuthenticatedUser::new(fixture.first.clone(), None, false);
        let result = fixture.service.add_administrator(&stranger, fixture.head(&fixture.first, None)).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::Forbidden);
    }

    #[sqlx::test]
    async fn test_city_follower_approval_and_leaving() {
        let fixture = Fixture::new("follower").await;
        let follower = AuthenticatedUser::new(fixture.first.clone(), None, false);
        let stranger = AuthenticatedUser::new(fixture.second.clone(), None, false);
        let member_id = fixture.service.add_follower(&follower, fixture.city_id, None).await.unwrap();
        assert_eq!(fixture.service.toggle_is_approved(&follower, member_id, fixture.city_id).await.unwrap_err().error_type, ErrorType::Forbidden);
        fixture.service.toggle_is_approved(&fixture.admin, member_id, fixture.city_id).await.unwrap();
        assert_eq!(fixture.service.remove_follower(&stranger, member_id, fixture.city_id).await.unwrap_err().error_type, ErrorType::Forbidden);
        fixture.service.remove_follower(&follower, member_id, fixture.city_id).await.unwrap();
        let mut connection = fixture.pool.acquire().await.unwrap();
        assert!(fixture.service.city_dao.get_member(&mut connection, member_id, fixture.city_id).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn test_following_another_city_moves_membership() {
        let fixture = Fixture::new("moving").await;
        let mut connection = fixture.pool.acquire().await.unwrap();
        let other_city = insert_city(&mut connection, &format!("Other City {}", uuid::Uuid::new_v4())).await;
        drop(connection);
        let follower = AuthenticatedUser::new(fixture.first.clone(), None, false);
        fixture.service.add_follower(&follower, fixture.city_id, None).await.unwrap();
        fixture.service.add_follower(&follower, other_city, None).await.unwrap();
        let mut connection = fixture.pool.acquire().await.unwrap();
        assert!(fixture.service.city_dao.get_members(&mut connection, fixture.city_id, false).await.unwrap().is_empty());
        assert_eq!(fixture.service.city_dao.get_members(&mut connection, other_city, false).await.unwrap().len(), 1);
    }
}
