use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{admin_type::AdminTypeDao, club::ClubDao, common::AdministrationPeriod, user::UserDao},
    model::{
        apperror::ApplicationError,
        models::{ADMIN_TYPE_CLUB_HEAD, AdminType, AdministrationDetailType, AdministrationInputType, AuthenticatedUser, ROLE_CLUB_ADMIN},
    },
    service::{
        access::AccessService,
        administration::{closing_date, replaced_heads, runs_after, takeover_date, validate_period},
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for the administration of clubs.
 *
 * A club has at most one current Club Head. Users heading at least one club hold the `ClubAdmin`
 * role; the role follows every change to a Club Head administration.
 */
pub struct ClubParticipantsService {
    club_dao: ClubDao,
    admin_type_dao: AdminTypeDao,
    user_dao: UserDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl ClubParticipantsService {
    pub fn new(club_dao: ClubDao, admin_type_dao: AdminTypeDao, user_dao: UserDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        ClubParticipantsService { club_dao, admin_type_dao, user_dao, access_service, connection_pool }
    }

    /**
     * Current administrators of a club.
     */
    pub async fn get_administration_by_club(&self, club_id: i64) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        if self.club_dao.get_by_id(&mut connection, club_id).await?.is_none() {
            return Err(ApplicationError::not_found("Club"));
        }
        self.club_dao.get_current_administrations(&mut connection, club_id, None, Utc::now()).await
    }

    pub async fn get_administrations_of_user(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::Current).await
    }

    pub async fn get_previous_administrations_of_user(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::Previous).await
    }

    /**
     * All administrations of a user, current and previous.
     */
    pub async fn get_administration_statuses(&self, user_id: &str) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        self.get_user_administrations(user_id, AdministrationPeriod::All).await
    }

    async fn get_user_administrations(&self, user_id: &str, period: AdministrationPeriod) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.club_dao.get_administrations_of_user(&mut connection, user_id, period, Utc::now()).await
    }

    /**
     * Adds an administrator to a club. The start date defaults to now. A new Club Head takes over
     * from the other heads of the club at its start date.
     *
     * # Returns
     * The new administration.
     */
    #[instrument(skip(self, input), fields(club_id = input.owner_id))]
    pub async fn add_administrator(&self, user: &AuthenticatedUser, input: AdministrationInputType) -> Result<AdministrationDetailType, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<AdministrationDetailType, ApplicationError> = async {
            if self.club_dao.get_by_id(&mut transaction, input.owner_id).await?.is_none() {
                return Err(ApplicationError::not_found("Club"));
            }
            self.access_service.ensure_club_access(&mut transaction, user, input.owner_id).await?;
            let now = Utc::now();
            let admin_type = self.admin_type_dao.get_or_add(&mut transaction, &input.admin_type_name).await?;
            let id = self.add_in_transaction(&mut transaction, input.owner_id, &input.user_id, &admin_type, input.start_date_or(now), input.end_date, now).await?;
            self.get_existing(&mut transaction, id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Edits an administration. Keeping the admin type updates the dates; changing it ends the
     * administration and adds a new one of the requested type. A Club Head left running takes over
     * from the other heads of the club.
     */
    #[instrument(skip(self, input))]
    pub async fn edit_administrator(&self, user: &AuthenticatedUser, administration_id: i64, input: AdministrationInputType) -> Result<AdministrationDetailType, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<AdministrationDetailType, ApplicationError> = async {
            let existing = self.get_existing(&mut transaction, administration_id).await?;
            self.access_service.ensure_club_access(&mut transaction, user, existing.owner_id).await?;
            let now = Utc::now();
            let admin_type = self.admin_type_dao.get_or_add(&mut transaction, &input.admin_type_name).await?;
            if admin_type.id == existing.admin_type.id {
                let start_date = input.start_date.unwrap_or(existing.start_date);
                validate_period(start_date, input.end_date)?;
                self.club_dao.update_administration_dates(&mut transaction, administration_id, start_date, input.end_date).await?;
                if is_club_head(&admin_type) {
                    if runs_after(input.end_date, now) {
                        self.end_other_heads(&mut transaction, existing.owner_id, &admin_type, Some(administration_id), start_date, input.end_date, now).await?;
                    }
                    self.sync_club_admin_role(&mut transaction, &existing.user_id, now).await?;
                }
                return self.get_existing(&mut transaction, administration_id).await;
            }
            self.end_administration(&mut transaction, &existing, now, now).await?;
            let id = self.add_in_transaction(&mut transaction, existing.owner_id, &existing.user_id, &admin_type, input.start_date_or(now), input.end_date, now).await?;
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
            self.access_service.ensure_club_access(&mut transaction, user, existing.owner_id).await?;
            let now = Utc::now();
            self.end_administration(&mut transaction, &existing, now, now).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn set_end_date(&self, user: &AuthenticatedUser, administration_id: i64, end_date: DateTime<Utc>) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let existing = self.get_existing(&mut transaction, administration_id).await?;
            self.access_service.ensure_club_access(&mut transaction, user, existing.owner_id).await?;
            validate_period(existing.start_date, Some(end_date))?;
            self.club_dao.set_administration_end_date(&mut transaction, administration_id, end_date).await?;
            if is_club_head(&existing.admin_type) {
                let now = Utc::now();
                if runs_after(Some(end_date), now) {
                    self.end_other_heads(&mut transaction, existing.owner_id, &existing.admin_type, Some(administration_id), existing.start_date, Some(end_date), now).await?;
                }
                self.sync_club_admin_role(&mut transaction, &existing.user_id, now).await?;
            }
            Ok(())
        }
        .await;
        finish(transaction, result).await
    }

    async fn get_existing(&self, connection: &mut PgConnection, administration_id: i64) -> Result<AdministrationDetailType, ApplicationError> {
        self.club_dao.get_administration(connection, administration_id).await?.ok_or_else(|| ApplicationError::not_found("Club administration"))
    }

    #[allow(clippy::too_many_arguments)]
    async fn add_in_transaction(
        &self,
        connection: &mut PgConnection,
        club_id: i64,
        user_id: &str,
        admin_type: &AdminType,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<i64, ApplicationError> {
        validate_period(start_date, end_date)?;
        if is_club_head(admin_type) {
            self.end_other_heads(connection, club_id, admin_type, None, start_date, end_date, now).await?;
        }
        let id = self.club_dao.add_administration(connection, club_id, user_id, admin_type.id, start_date, end_date).await?;
        if is_club_head(admin_type) {
            self.sync_club_admin_role(connection, user_id, now).await?;
        }
        Ok(id)
    }

    /**
     * Closes the other Club Heads of a club overlapping a head period, at the takeover date of that
     * period. Heads that had not started by then are closed at their own start date.
     */
    #[allow(clippy::too_many_arguments)]
    async fn end_other_heads(
        &self,
        connection: &mut PgConnection,
        club_id: i64,
        head_type: &AdminType,
        except_id: Option<i64>,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let takeover = takeover_date(start_date, now);
        let running = self.club_dao.get_current_administrations(connection, club_id, Some(head_type.id), takeover).await?;
        for previous in replaced_heads(&running, except_id, end_date) {
            tracing::info!("Ending club head administration {} of user {}", previous.id, previous.user_id);
            self.end_administration(connection, &previous, takeover, now).await?;
        }
        Ok(())
    }

    async fn end_administration(&self, connection: &mut PgConnection, administration: &AdministrationDetailType, at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        let Some(end_date) = closing_date(administration, at) else {
            tracing::debug!("Club administration {} already ended", administration.id);
            return Ok(());
        };
        self.club_dao.set_administration_end_date(connection, administration.id, end_date).await?;
        if is_club_head(&administration.admin_type) {
            self.sync_club_admin_role(connection, &administration.user_id, now).await?;
        }
        Ok(())
    }

    /**
     * Grants `ClubAdmin` to a user currently heading a club and revokes it otherwise.
     */
    async fn sync_club_admin_role(&self, connection: &mut PgConnection, user_id: &str, now: DateTime<Utc>) -> Result<(), ApplicationError> {
        let headed_clubs = self.club_dao.get_headed_club_ids(connection, user_id, now).await?;
        if headed_clubs.is_empty() {
            self.user_dao.remove_from_role(connection, user_id, ROLE_CLUB_ADMIN).await
        } else {
            self.user_dao.add_to_role(connection, user_id, ROLE_CLUB_ADMIN).await
        }
    }
}

fn is_club_head(admin_type: &AdminType) -> bool {
    admin_type.name == ADMIN_TYPE_CLUB_HEAD
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_club_head() {
        assert!(is_club_head(&AdminType { id: 1, name: ADMIN_TYPE_CLUB_HEAD.to_string() }));
        assert!(!is_club_head(&AdminType { id: 2, name: "Treasurer".to_string() }));
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::Duration;

    use super::*;
    use crate::dao::{
        city::CityDao,
        test_support::{init_db, insert_club, insert_user},
    };

    struct Fixture {
        pool: Pool<Postgres>,
        service: ClubParticipantsService,
        admin: AuthenticatedUser,
        club_id: i64,
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
            let club_id = insert_club(&mut connection, &format!("Club {name} {suffix}")).await;
            drop(connection);
            let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
            let service = ClubParticipantsService::new(ClubDao::new(), AdminTypeDao::new(), UserDao::new(), access_service, Some(pool.clone()));
            let admin = AuthenticatedUser::new("admin".to_string(), None, true);
            Fixture { pool, service, admin, club_id, first, second }
        }

        fn head(&self, user_id: &str, start_date: Option<DateTime<Utc>>) -> AdministrationInputType {
            AdministrationInputType { owner_id: self.club_id, user_id: user_id.to_string(), admin_type_name: ADMIN_TYPE_CLUB_HEAD.to_string(), start_date, end_date: None }
        }

        async fn stored(&self, administration_id: i64) -> AdministrationDetailType {
            let mut connection = self.pool.acquire().await.unwrap();
            self.service.get_existing(&mut connection, administration_id).await.unwrap()
        }

        async fn is_club_admin(&self, user_id: &str) -> bool {
            let mut connection = self.pool.acquire().await.unwrap();
            UserDao::new().is_in_role(&mut connection, user_id, &[ROLE_CLUB_ADMIN]).await.unwrap()
        }
    }

    #[sqlx::test]
    async fn test_new_club_head_replaces_previous() {
        let fixture = Fixture::new("replace").await;
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        let current = fixture.service.get_administration_by_club(fixture.club_id).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].user_id, fixture.second);
        assert_eq!(fixture.service.get_previous_administrations_of_user(&fixture.first).await.unwrap().len(), 1);
        assert!(!fixture.is_club_admin(&fixture.first).await);
        assert!(fixture.is_club_admin(&fixture.second).await);
    }

    #[sqlx::test]
    async fn test_reopened_head_ends_successor() {
        let fixture = Fixture::new("reopen").await;
        let first = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        fixture.service.edit_administrator(&fixture.admin, first.id, fixture.head(&fixture.first, None)).await.unwrap();
        let current = fixture.service.get_administration_by_club(fixture.club_id).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, first.id);
        assert!(fixture.is_club_admin(&fixture.first).await);
        assert!(!fixture.is_club_admin(&fixture.second).await);
    }

    #[sqlx::test]
    async fn test_extended_end_date_ends_successor() {
        let fixture = Fixture::new("extend").await;
        let first = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        fixture.service.set_end_date(&fixture.admin, first.id, Utc::now() + Duration::days(30)).await.unwrap();
        let current = fixture.service.get_administration_by_club(fixture.club_id).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, first.id);
        assert!(!fixture.is_club_admin(&fixture.second).await);
    }

    #[sqlx::test]
    async fn test_head_replacing_scheduled_head_closes_it_at_its_start() {
        let fixture = Fixture::new("scheduled").await;
        let scheduled = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, Some(Utc::now() + Duration::days(10)))).await.unwrap();
        let current = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, None)).await.unwrap();
        let scheduled = fixture.stored(scheduled.id).await;
        assert!(scheduled.end_date.is_some_and(|end_date| end_date >= scheduled.start_date));
        let heads = fixture.service.get_administration_by_club(fixture.club_id).await.unwrap();
        assert_eq!(heads.iter().map(|head| head.id).collect::<Vec<_>>(), vec![current.id]);
    }

    #[sqlx::test]
    async fn test_scheduled_head_takes_over_at_its_start() {
        let fixture = Fixture::new("takeover").await;
        let current = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, None)).await.unwrap();
        let next = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.second, Some(Utc::now() + Duration::days(10)))).await.unwrap();
        assert_eq!(fixture.stored(current.id).await.end_date, Some(next.start_date));
        assert!(fixture.is_club_admin(&fixture.first).await);
        assert!(!fixture.is_club_admin(&fixture.second).await);
    }

    #[sqlx::test]
    async fn test_remove_scheduled_head_keeps_period_valid() {
        let fixture = Fixture::new("remove").await;
        let scheduled = fixture.service.add_administrator(&fixture.admin, fixture.head(&fixture.first, Some(Utc::now() + Duration::days(5)))).await.unwrap();
        fixture.service.remove_administrator(&fixture.admin, scheduled.id).await.unwrap();
        let removed = fixture.stored(scheduled.id).await;
        assert_eq!(removed.end_date, Some(removed.start_date));
        assert!(fixture.service.get_administration_by_club(fixture.club_id).await.unwrap().is_empty());
    }
}
