use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{AdministrationPeriod, QueryAdministrationDbResp, QueryMemberDbResp, expect_single_row, handle_database_error, into_page},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AdministrationDetailType, CityDetailType, CityInputType, MemberDetailType, PaginationInput, PaginationOutput},
    },
};

/**
 * Database response type for querying cities.
 */
pub type QueryCityDbResp = (i64, String, i64, String, Option<String>, Option<String>, Option<String>);

const SELECT_CITY: &str = "SELECT c.id, c.name, c.region_id, r.name AS region_name, c.description, c.phone, c.email FROM cities c JOIN regions r ON r.id = c.region_id";

const ADD_CITY: &str = "INSERT INTO cities (name, region_id, description, phone, email) VALUES ($1, $2, $3, $4, $5) RETURNING id";

const UPDATE_CITY: &str = "UPDATE cities SET name = $1, region_id = $2, description = $3, phone = $4, email = $5 WHERE id = $6";

const DELETE_CITY: &str = "DELETE FROM cities WHERE id = $1";

const QUERY_MEMBERS: &str = "SELECT m.id, m.user_id, u.first_name || ' ' || u.last_name, m.is_approved
                             FROM city_members m JOIN users u ON u.id = m.user_id
                             WHERE m.city_id = $1 AND m.is_approved = $2 ORDER BY u.last_name, u.first_name";

const QUERY_MEMBER: &str = "SELECT m.id, m.user_id, u.first_name || ' ' || u.last_name, m.is_approved
                            FROM city_members m JOIN users u ON u.id = m.user_id
                            WHERE m.id = $1 AND m.city_id = $2";

const ADD_FOLLOWER: &str = "INSERT INTO city_members (user_id, city_id, is_approved) VALUES ($1, $2, FALSE) RETURNING id";

const TOGGLE_APPROVED: &str = "UPDATE city_members SET is_approved = NOT is_approved WHERE id = $1 AND city_id = $2";

const DELETE_MEMBER: &str = "DELETE FROM city_members WHERE id = $1 AND city_id = $2";

const DELETE_MEMBERSHIPS_OF_USER: &str = "DELETE FROM city_members WHERE user_id = $1";

const SELECT_ADMINISTRATION: &str = "SELECT a.id, a.user_id, u.first_name || ' ' || u.last_name, a.city_id, t.id, t.name, a.start_date, a.end_date
                                     FROM city_administrations a
                                     JOIN users u ON u.id = a.user_id
                                     JOIN admin_types t ON t.id = a.admin_type_id";

const ADD_ADMINISTRATION: &str = "INSERT INTO city_administrations (user_id, city_id, admin_type_id, start_date, end_date) VALUES ($1, $2, $3, $4, $5) RETURNING id";

const UPDATE_ADMINISTRATION_DATES: &str = "UPDATE city_administrations SET start_date = $1, end_date = $2 WHERE id = $3";

const SET_ADMINISTRATION_END_DATE: &str = "UPDATE city_administrations SET end_date = $1 WHERE id = $2";

/**
 * Cities a user administers now, directly or through a region.
 */
const QUERY_ADMINISTERED_CITIES: &str = "SELECT a.city_id FROM city_administrations a
                                         WHERE a.user_id = $1 AND a.start_date <= $2 AND (a.end_date IS NULL OR a.end_date > $2)
                                         UNION
                                         SELECT c.id FROM cities c
                                         JOIN region_administrations r ON r.region_id = c.region_id
                                         WHERE r.user_id = $1 AND r.start_date <= $2 AND (r.end_date IS NULL OR r.end_date > $2)";

impl From<QueryCityDbResp> for CityDetailType {
    fn from(row: QueryCityDbResp) -> Self {
        CityDetailType { id: row.0, name: row.1, region_id: row.2, region_name: row.3, description: row.4, phone: row.5, email: row.6 }
    }
}

/**
 * DAO for cities, their members and followers and their administrations.
 */
pub struct CityDao {}

impl CityDao {
    pub fn new() -> Self {
        CityDao {}
    }

    /**
     * Retrieves a page of cities, optionally filtered by a case insensitive name fragment.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_city_list(&self, connection: &mut PgConnection, pagination_input: PaginationInput, name: Option<String>) -> Result<(Vec<CityDetailType>, PaginationOutput), ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_CITY} WHERE ($1::text IS NULL OR c.name ILIKE '%' || $1 || '%') ORDER BY c.name LIMIT $2 OFFSET $3");
        let results: Vec<QueryCityDbResp> = sqlx::query_as(&query)
            .bind(name)
            .bind(pagination_input.page_size + 1)
            .bind(pagination_input.start_index)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city list: {err}")))?;
        into_page(&pagination_input, results.into_iter().map(CityDetailType::from).collect())
    }

    /**
     * Retrieves all cities, optionally limited to a set of ids.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_cities(&self, connection: &mut PgConnection, city_ids: Option<Vec<i64>>) -> Result<Vec<CityDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_CITY} WHERE ($1::bigint[] IS NULL OR c.id = ANY($1)) ORDER BY c.name");
        let results: Vec<QueryCityDbResp> = sqlx::query_as(&query)
            .bind(city_ids)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get cities: {err}")))?;
        Ok(results.into_iter().map(CityDetailType::from).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_by_id(&self, connection: &mut PgConnection, city_id: i64) -> Result<Option<CityDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_CITY} WHERE c.id = $1");
        let result: Option<QueryCityDbResp> = sqlx::query_as(&query)
            .bind(city_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city: {err}")))?;
        Ok(result.map(CityDetailType::from))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add(&self, transaction: &mut PgConnection, input: CityInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_CITY)
            .bind(input.name)
            .bind(input.region_id)
            .bind(input.description)
            .bind(input.phone)
            .bind(input.email)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update(&self, transaction: &mut PgConnection, city_id: i64, input: CityInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_CITY)
            .bind(input.name)
            .bind(input.region_id)
            .bind(input.description)
            .bind(input.phone)
            .bind(input.email)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "City")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete(&self, transaction: &mut PgConnection, city_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_CITY)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "City")
    }

    /**
     * Retrieves approved members (`approved = true`) or followers (`approved = false`) of a city.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_members(&self, connection: &mut PgConnection, city_id: i64, approved: bool) -> Result<Vec<MemberDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryMemberDbResp> = sqlx::query_as(QUERY_MEMBERS)
            .bind(city_id)
            .bind(approved)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city members: {err}")))?;
        Ok(results.into_iter().map(MemberDetailType::from).collect())
    }

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_member(&self, connection: &mut PgConnection, member_id: i64, city_id: i64) -> Result<Option<MemberDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let result: Option<QueryMemberDbResp> = sqlx::query_as(QUERY_MEMBER)
            .bind(member_id)
            .bind(city_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city member: {err}")))?;
        Ok(result.map(MemberDetailType::from))
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_follower(&self, transaction: &mut PgConnection, city_id: i64, user_id: &str) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_FOLLOWER)
            .bind(user_id)
            .bind(city_id)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn toggle_is_approved(&self, transaction: &mut PgConnection, member_id: i64, city_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(TOGGLE_APPROVED)
            .bind(member_id)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to toggle city member approval: {err}")))?;
        expect_single_row(result.rows_affected(), "City member")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn remove_member(&self, transaction: &mut PgConnection, member_id: i64, city_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_MEMBER)
            .bind(member_id)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "City member")
    }

    /**
     * Removes every city membership of a user.
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

    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_administration(&self, connection: &mut PgConnection, administration_id: i64) -> Result<Option<AdministrationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ADMINISTRATION} WHERE a.id = $1");
        let result: Option<QueryAdministrationDbResp> = sqlx::query_as(&query)
            .bind(administration_id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city administration: {err}")))?;
        Ok(result.map(AdministrationDetailType::from))
    }

    /**
     * Administrations of a city still running at `now`, optionally limited to one admin type.
     * Administrations starting later are included.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_current_administrations(&self, connection: &mut PgConnection, city_id: i64, admin_type_id: Option<i64>, now: DateTime<Utc>) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ADMINISTRATION} WHERE a.city_id = $1 AND {} AND ($3::bigint IS NULL OR a.admin_type_id = $3) ORDER BY a.start_date", AdministrationPeriod::Current.predicate());
        let results: Vec<QueryAdministrationDbResp> = sqlx::query_as(&query)
            .bind(city_id)
            .bind(now)
            .bind(admin_type_id)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city administrations: {err}")))?;
        Ok(results.into_iter().map(AdministrationDetailType::from).collect())
    }

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
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get city administrations of user: {err}")))?;
        Ok(results.into_iter().map(AdministrationDetailType::from).collect())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add_administration(
        &self,
        transaction: &mut PgConnection,
        city_id: i64,
        user_id: &str,
        admin_type_id: i64,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let id: (i64,) = sqlx::query_as(ADD_ADMINISTRATION)
            .bind(user_id)
            .bind(city_id)
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
        expect_single_row(result.rows_affected(), "City administration")
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
        expect_single_row(result.rows_affected(), "City administration")
    }

    /**
     * Ids of the cities the user currently administers, directly or as a region administrator.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_administered_city_ids(&self, connection: &mut PgConnection, user_id: &str, now: DateTime<Utc>) -> Result<Vec<i64>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(i64,)> = sqlx::query_as(QUERY_ADMINISTERED_CITIES)
            .bind(user_id)
            .bind(now)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get administered cities: {err}")))?;
        Ok(results.into_iter().map(|row| row.0).collect())
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::Duration;

    use super::*;
    use crate::{
        dao::{
            admin_type::AdminTypeDao,
            test_support::{init_db, insert_city, insert_region, insert_user},
        },
        model::models::ADMIN_TYPE_CITY_HEAD,
    };

    #[sqlx::test]
    async fn test_add_list_update_then_delete_city() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = CityDao::new();
        let region_id = insert_region(&mut transaction, "Test Region").await;
        let input = CityInputType { name: "Test City".to_string(), region_id, description: None, phone: None, email: None };
        let city_id = dao.add(&mut transaction, input.clone()).await.unwrap();
        let (cities, _) = dao.get_city_list(&mut transaction, PaginationInput { start_index: 0, page_size: 10 }, Some("test c".to_string())).await.unwrap();
        assert!(cities.iter().any(|city| city.id == city_id));
        dao.update(&mut transaction, city_id, CityInputType { phone: Some("123".to_string()), ..input }).await.unwrap();
        assert_eq!(dao.get_by_id(&mut transaction, city_id).await.unwrap().unwrap().phone, Some("123".to_string()));
        dao.delete(&mut transaction, city_id).await.unwrap();
        assert!(dao.get_by_id(&mut transaction, city_id).await.unwrap().is_none());
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_region_admin_sees_region_cities() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = CityDao::new();
        let user_id = insert_user(&mut transaction, "region-admin").await;
        let region_id = insert_region(&mut transaction, "Admin Region").await;
        let input = CityInputType { name: "Region City".to_string(), region_id, description: None, phone: None, email: None };
        let city_id = dao.add(&mut transaction, input).await.unwrap();
        sqlx::query("INSERT INTO region_administrations (user_id, region_id, admin_type_id, start_date) SELECT $1, $2, id, now() - interval '1 day' FROM admin_types WHERE name = 'Region Head'")
            .bind(&user_id)
            .bind(region_id)
            .execute(&mut *transaction)
            .await
            .unwrap();
        let ids = dao.get_administered_city_ids(&mut transaction, &user_id, Utc::now()).await.unwrap();
        assert_eq!(ids, vec![city_id]);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_city_follower_lifecycle() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = CityDao::new();
        let user_id = insert_user(&mut transaction, "city-follower").await;
        let city_id = insert_city(&mut transaction, "Follower City").await;
        let member_id = dao.add_follower(&mut transaction, city_id, &user_id).await.unwrap();
        assert_eq!(dao.get_members(&mut transaction, city_id, false).await.unwrap().len(), 1);
        dao.toggle_is_approved(&mut transaction, member_id, city_id).await.unwrap();
        assert!(dao.get_member(&mut transaction, member_id, city_id).await.unwrap().unwrap().is_approved);
        assert_eq!(dao.add_follower(&mut transaction, city_id, &user_id).await.unwrap_err().error_type, ErrorType::ConstraintViolation);
        dao.remove_member(&mut transaction, member_id, city_id).await.unwrap();
        assert!(dao.get_members(&mut transaction, city_id, true).await.unwrap().is_empty());
        dao.add_follower(&mut transaction, city_id, &user_id).await.unwrap();
        assert_eq!(dao.remove_memberships_of_user(&mut transaction, &user_id).await.unwrap(), 1);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_city_administration_periods() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = CityDao::new();
        let user_id = insert_user(&mut transaction, "city-head").await;
        let city_id = insert_city(&mut transaction, "Head City").await;
        let head = AdminTypeDao::new().get_or_add(&mut transaction, ADMIN_TYPE_CITY_HEAD).await.unwrap();
        let now = Utc::now();
        let current = dao.add_administration(&mut transaction, city_id, &user_id, head.id, now - Duration::days(5), None).await.unwrap();
        let previous = dao.add_administration(&mut transaction, city_id, &user_id, head.id, now - Duration::days(50), Some(now - Duration::days(10))).await.unwrap();
        let current_list = dao.get_current_administrations(&mut transaction, city_id, Some(head.id), now).await.unwrap();
        assert_eq!(current_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![current]);
        let previous_list = dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::Previous, now).await.unwrap();
        assert_eq!(previous_list.iter().map(|a| a.id).collect::<Vec<_>>(), vec![previous]);
        assert_eq!(dao.get_administered_city_ids(&mut transaction, &user_id, now).await.unwrap(), vec![city_id]);
        dao.update_administration_dates(&mut transaction, current, now - Duration::days(5), Some(now - Duration::days(1))).await.unwrap();
        assert!(dao.get_administered_city_ids(&mut transaction, &user_id, now).await.unwrap().is_empty());
        dao.set_administration_end_date(&mut transaction, current, now + Duration::days(1)).await.unwrap();
        assert!(dao.get_administration(&mut transaction, current).await.unwrap().unwrap().end_date.is_some());
        assert_eq!(dao.get_administrations_of_user(&mut transaction, &user_id, AdministrationPeriod::Current, now).await.unwrap().len(), 1);
        transaction.rollback().await.unwrap();
    }
}
