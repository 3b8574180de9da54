use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{AdministrationPeriod, QueryAdministrationDbResp, QueryMemberDbResp, expect_single_row, handle_database_error, into_page},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{ADMIN_TYPE_CLUB_HEAD, AdministrationDetailType, ClubDetailType, ClubInputType, MemberDetailType, PaginationInput, PaginationOutput},
    },
};

/**
 * Database response type for querying clubs.
 */
pub type QueryClubDbResp = (i64, String, Option<String>, Option<String>);

const QUERY_CLUB_LIST: &str = "SELECT id, name, description, logo FROM clubs WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%') ORDER BY name LIMIT $2 OFFSET $3";

const QUERY_CLUB: &str = "SELECT id, name, description, logo FROM clubs WHERE id = $1";

const ADD_CLUB: &str = "INSERT INTO clubs (name, description, logo) VALUES ($1, $2, $3) RETURNING id";

const UPDATE_CLUB: &str = "UPDATE clubs SET name = $1, description = $2, logo = $3 WHERE id = $4";

const QUERY_MEMBERS: &str = "SELECT m.id, m.user_id, u.first_name || ' ' || u.last_name, m.is_approved
                             FROM club_members m JOIN users u ON u.id = m.user_id
                             WHERE m.club_id = $1 AND m.is_approved = $2 ORDER BY u.last_name, u.first_name";

const ADD_FOLLOWER: &str = "INSERT INTO club_members (user_id, club_id, is_approved) VALUES ($1, $2, FALSE) RETURNING id";

const QUERY_MEMBER: &str = "SELECT m.id, m.user_id, u.first_name || ' ' || u.last_name, m.is_approved
                            FROM club_members m JOIN users u ON u.id = m.user_id
                            WHERE m.id = $1 AND m.club_id = $2";

const TOGGLE_APPROVED: &str = "UPDATE club_members SET is_approved = NOT is_approved WHERE id = $1 AND club_id = $2";

const DELETE_MEMBER: &str = "DELETE FROM club_members WHERE id = $1 AND club_id = $2";

const DELETE_MEMBERSHIPS_OF_USER: &str = "DELETE FROM club_members WHERE user_id = $1";

const SELECT_ADMINISTRATION: &str = "SELECT a.id, a.user_id, u.first_name || ' ' || u.last_name, a.club_id, t.id, t.name, a.start_date, a.end_date
                                     FROM club_administrations a
                                     JOIN users u ON u.id = a.user_id
                                     JOIN admin_types t ON t.id = a.admin_type_id";

const ADD_ADMINISTRATION: &str = "INSERT INTO club_administrations (user_id, club_id, admin_type_id, start_date, end_date) VALUES ($1, $2, $3, $4, $5) RETURNING id";

const UPDATE_ADMINISTRATION_DATES: &str = "UPDATE club_administrations SET start_date = $1, end_date = $2 WHERE id = $3";

const SET_ADMINISTRATION_END_DATE: &str = "UPDATE club_administrations SET end_date = $1 WHERE id = $2";

const QUERY_HEADED_CLUBS: &str = "SELECT a.club_id FROM club_administrations a JOIN admin_types t ON t.id = a.admin_type_id
                                  WHERE a.user_id = $1 AND t.name = $2 AND a.start_date <= $3 AND (a.end_date IS NULL OR a.end_date > $3)";

impl From<QueryClubDbResp> for ClubDetailType {
    fn from(row: QueryClubDbResp) -> Self {
        ClubDetailType { id: row.0, name: row.1, description: row.2, logo: row.3 }
    }
}

/**
 * DAO for clubs, club members and club administrations.
 */
pub struct ClubDao {}

impl ClubDao {
    pub fn new() -> Self {
        ClubDao {}
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_club_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, name: Option<String>) -> Result<(Vec<ClubDetailType>, PaginationOutput), ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryClubDbResp> = sqlx::query_as(QUERY_CLUB_LIST)
            .bind(name)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club list: {err}")))?;
        into_page(&pagination_input, results.into_iter().map(ClubDetailType::from).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_by_id(&self, connection: &mut PgConnection, club_id: i64) -> Result<Option<ClubDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryClubDbResp> = sqlx::query_as(QUERY_CLUB)
            .bind(club_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club: {err}")))?;
        Ok(result.map(ClubDetailType::from))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add(&self, transaction: &mut PgConnection, input: ClubInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_CLUB)
            .bind(input.name)
            .bind(input.description)
            .bind(input.logo)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update(&self, transaction: &mut PgConnection, club_id: i64, input: ClubInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_CLUB)
            .bind(input.name)
            .bind(input.description)
            .bind(input.logo)
            .bind(club_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "Club")
    }

    /**
     * Retrieves approved members (`approved = true`) or followers (`approved = false`) of a club.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_members(&self, connection: &mut PgConnection, club_id: i64, approved: bool) -> Result<Vec<MemberDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryMemberDbResp> = sqlx::query_as(QUERY_MEMBERS)
            .bind(club_id)
            .bind(approved)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club members: {err}")))?;
        Ok(results.into_iter().map(MemberDetailType::from).collect())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_follower(&self, transaction: &mut PgConnection, club_id: i64, user_id: &str) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_FOLLOWER)
            .bind(user_id)
            .bind(club_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_member(&self, connection: &mut PgConnection, member_id: i64, club_id: i64) -> Result<Option<MemberDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryMemberDbResp> = sqlx::query_as(QUERY_MEMBER)
            .bind(member_id)
            .bind(club_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club member: {err}")))?;
        Ok(result.map(MemberDetailType::from))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn remove_member(&self, transaction: &mut PgConnection, member_id: i64, club_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_MEMBER)
            .bind(member_id)
            .bind(club_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "Club member")
    }

    /**
     * Removes every club membership of a user.
     *
     * # Returns
     * The number of removed memberships.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn remove_memberships_of_user(&self, transaction: &mut PgConnection, user_id: &str) -> Result<u64, ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_MEMBERSHIPS_OF_USER)
            .bind(user_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn toggle_is_approved(&self, transaction: &mut PgConnection, member_id: i64, club_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(TOGGLE_APPROVED)
            .bind(member_id)
            .bind(club_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to toggle club member approval: {err}")))?;
        expect_single_row(result.rows_affected(), "Club member")
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_administration(&self, connection: &mut PgConnection, administration_id: i64) -> Result<Option<AdministrationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ADMINISTRATION} WHERE a.id = $1");
        let result: Option<QueryAdministrationDbResp> = sqlx::query_as(&query)
            .bind(administration_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club administration: {err}")))?;
        Ok(result.map(AdministrationDetailType::from))
    }

    /**
     * Administrations of a club still running at `now`, optionally limited to one admin type.
     * Administrations starting later are included.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_current_administrations(&self, connection: &mut PgConnection, club_id: i64, admin_type_id: Option<i64>, now: DateTime<Utc>) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ADMINISTRATION} WHERE a.club_id = $1 AND {} AND ($3::bigint IS NULL OR a.admin_type_id = $3) ORDER BY a.start_date", AdministrationPeriod::Current.predicate());
        let results: Vec<QueryAdministrationDbResp> = sqlx::query_as(&query)
            .bind(club_id)
            .bind(now)
            .bind(admin_type_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get club administrations: {err}")))?;
        Ok(results.into_iter().map(AdministrationDetailType::from).collect())
    }

    /**
     * Club administrations of a user in the given period, relative to `now`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_administrations_of_user(&self, connection: &mut PgConnection, user_id: &str, period: AdministrationPeriod, now: DateTime<Utc>) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ADMINISTRATION} WHERE a.user_id = $1 AND {} ORDER BY a.start_date DESC", period.predicate());
        let results: Vec<QueryAdministrationDbResp> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(now)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get administrations of user: {err}")))?;
        Ok(results.into_iter().map(AdministrationDetailType::from).collect())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_administration(
        &self,
        transaction: &mut PgConnection,
        club_id: i64,
        user_id: &str,
        admin_type_id: i64,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_ADMINISTRATION)
            .bind(user_id)
            .bind(club_id)
            .bind(admin_type_id)
            .bind(start_date)
            .bind(end_date)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_administration_dates(&self, transaction: &mut PgConnection, administration_id: i64, start_date: DateTime<Utc>, end_date: Option<DateTime<Utc>>) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_ADMINISTRATION_DATES)
            .bind(start_date)
            .bind(end_date)
            .bind(administration_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "Club administration")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn set_administration_end_date(&self, transaction: &mut PgConnection, administration_id: i64, end_date: DateTime<Utc>) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(SET_ADMINISTRATION_END_DATE)
            .bind(end_date)
            .bind(administration_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "Club administration")
    }

    /**
     * Ids of the clubs the user currently heads.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_headed_club_ids(&self, connection: &mut PgConnection, user_id: &str, now: DateTime<Utc>) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(i64,)> = sqlx::query_as(QUERY_HEADED_CLUBS)
            .bind(user_id)
            .bind(ADMIN_TYPE_CLUB_HEAD)
            .bind(now)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get headed clubs: {err}")))?;
        Ok(results.into_iter().map(|row| row.0).collect())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::Duration;

    use super::*;
    use crate::dao::{
        admin_type::AdminTypeDao,
        test_support::{init_db, insert_club, insert_user},
    };

    #[sqlx::test]
    async fn test_administration_periods() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = ClubDao::new();
        let user_id = insert_user(&mut transaction, "club-admin").await;
        let club_id = insert_club(&mut transaction, "Test Club").await;
        let head = AdminTypeDao::new().add(&mut transaction, ADMIN_TYPE_CLUB_HEAD).await.unwrap();
        let now = Utc::now();
        let current = dao.add_administration(&mut transaction, club_id, &user_id, head.id, now - Duration::days(5), None).await.unwrap();
        let previous = dao.add_administration(&mut transaction, club_id, &user_id, head.id, now - Duration::days(50), Some(now - Duration::days(10))).await.unwrap();

        let current_list = dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::Current, now).await.unwrap();
        assert_eq!(current_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![current]);
        let previous_list = dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::Previous, now).await.unwrap();
        assert_eq!(previous_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![previous]);
        let all = dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::All, now).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(dao.get_headed_club_ids(&mut transaction, &user_id, now).await.unwrap(), vec![club_id]);

        dao.set_administration_end_date(&mut transaction, current, now - Duration::seconds(1)).await.unwrap();
        assert!(dao.get_current_administrations(&mut transaction, club_id, Some(head.id), now).await.unwrap().is_empty());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_follower_approval_toggle() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = ClubDao::new();
        let user_id = insert_user(&mut transaction, "club-follower").await;
        let club_id = insert_club(&mut transaction, "Follower Club").await;
        let member_id = dao.add_follower(&mut transaction, club_id, &user_id).await.unwrap();
        assert_eq!(dao.get_members(&mut transaction, club_id, false).await.unwrap().len(), 1);
        dao.toggle_is_approved(&mut transaction, member_id, club_id).await.unwrap();
        assert_eq!(dao.get_members(&mut transaction, club_id, true).await.unwrap().len(), 1);
        let duplicate = dao.add_follower(&mut transaction, club_id, &user_id).await;
        assert_eq!(duplicate.unwrap_err().error_type, ErrorType::ConstraintViolation);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_closed_before_start_is_not_current() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = ClubDao::new();
        let user_id = insert_user(&mut transaction, "never-started").await;
        let club_id = insert_club(&mut transaction, "Scheduled Club").await;
        let head = AdminTypeDao::new().add(&mut transaction, ADMIN_TYPE_CLUB_HEAD).await.unwrap();
        let now = Utc::now();
        let start_date = now + Duration::days(10);
        dao.add_administration(&mut transaction, club_id, &user_id, head.id, start_date, Some(start_date)).await.unwrap();
        assert!(dao.get_current_administrations(&mut transaction, club_id, None, now).await.unwrap().is_empty());
        let previous = dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::Previous, now).await.unwrap();
        assert_eq!(previous.len(), 1);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_remove_member_and_memberships_of_user() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = ClubDao::new();
        let user_id = insert_user(&mut transaction, "leaving-member").await;
        let first_club = insert_club(&mut transaction, "First Club").await;
        let second_club = insert_club(&mut transaction, "Second Club").await;
        let member_id = dao.add_follower(&mut transaction, first_club, &user_id).await.unwrap();
        assert_eq!(dao.get_member(&mut transaction, member_id, first_club).await.unwrap().unwrap().user_id, user_id);
        assert_eq!(dao.remove_member(&mut transaction, member_id, second_club).await.unwrap_err().error_type, ErrorType::NotFound);
        dao.remove_member(&mut transaction, member_id, first_club).await.unwrap();
        assert!(dao.get_member(&mut transaction, member_id, first_club).await.unwrap().is_none());
        dao.add_follower(&mut transaction, first_club, &user_id).await.unwrap();
        dao.add_follower(&mut transaction, second_club, &user_id).await.unwrap();
        assert_eq!(dao.remove_memberships_of_user(&mut transaction, &user_id).await.unwrap(), 2);
        transaction.rollback().await.unwrap();
    }
}
