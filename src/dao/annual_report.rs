use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::{Instrument, instrument};

use crate::{
    dao::common::{expect_single_row, handle_database_error},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AnnualReportAddInputType, AnnualReportDetailType, AnnualReportEditInputType, AnnualReportStatus, MembersStatistic},
    },
};

/**
 * Columns selected for an annual report, joined with city and creator.
 */
const SELECT_ANNUAL_REPORT: &str = "SELECT a.id, a.city_id, c.name AS city_name, a.creator_id, u.first_name || ' ' || u.last_name AS creator_name,
                                           a.new_city_admin_id, a.new_city_legal_status, a.date, a.status,
                                           a.number_of_children, a.number_of_juniors, a.number_of_youth_members,
                                           a.number_of_youth_followers, a.number_of_seniors, a.number_of_senior_followers
                                    FROM annual_reports a
                                    JOIN cities c ON c.id = a.city_id
                                    JOIN users u ON u.id = a.creator_id";

/**
 * SQL query to check whether a city already has a report blocking the creation of a new one.
 */
const QUERY_REPORT_CREATED: &str =
    "SELECT EXISTS (SELECT 1 FROM annual_reports WHERE city_id = $1 AND (status = 'unconfirmed' OR EXTRACT(YEAR FROM date AT TIME ZONE 'UTC') = $2))";

/**
 * SQL query to add a new annual report.
 */
const ADD_ANNUAL_REPORT: &str = "INSERT INTO annual_reports (city_id, creator_id, new_city_admin_id, new_city_legal_status, date, status,
                                     number_of_children, number_of_juniors, number_of_youth_members, number_of_youth_followers, number_of_seniors, number_of_senior_followers)
                                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id";

/**
 * SQL query to update the editable fields of an annual report.
 */
const UPDATE_ANNUAL_REPORT: &str = "UPDATE annual_reports SET new_city_admin_id = $1, new_city_legal_status = $2,
                                        number_of_children = $3, number_of_juniors = $4, number_of_youth_members = $5,
                                        number_of_youth_followers = $6, number_of_seniors = $7, number_of_senior_followers = $8
                                    WHERE id = $9";

const UPDATE_STATUS: &str = "UPDATE annual_reports SET status = $1 WHERE id = $2";

/**
 * SQL query moving the confirmed report of a city to saved.
 */
const SAVE_LAST_CONFIRMED: &str = "UPDATE annual_reports SET status = 'saved' WHERE city_id = $1 AND status = 'confirmed'";

const DELETE_ANNUAL_REPORT: &str = "DELETE FROM annual_reports WHERE id = $1";

/**
 * Database row for an annual report.
 */
#[derive(sqlx::FromRow)]
struct AnnualReportRow {
    id: i64,
    city_id: i64,
    city_name: String,
    creator_id: String,
    creator_name: String,
    new_city_admin_id: Option<String>,
    new_city_legal_status: String,
    date: DateTime<Utc>,
    status: String,
    number_of_children: i32,
    number_of_juniors: i32,
    number_of_youth_members: i32,
    number_of_youth_followers: i32,
    number_of_seniors: i32,
    number_of_senior_followers: i32,
}

impl TryFrom<AnnualReportRow> for AnnualReportDetailType {
    type Error = ApplicationError;

    fn try_from(row: AnnualReportRow) -> Result<Self, Self::Error> {
        Ok(AnnualReportDetailType {
            id: row.id,
            city_id: row.city_id,
            city_name: row.city_name,
            creator_id: row.creator_id,
            creator_name: row.creator_name,
            new_city_admin_id: row.new_city_admin_id,
            new_city_legal_status: row.new_city_legal_status,
            date: row.date,
            status: AnnualReportStatus::from_str(&row.status)?,
            members_statistic: MembersStatistic {
                number_of_children: row.number_of_children,
                number_of_juniors: row.number_of_juniors,
                number_of_youth_members: row.number_of_youth_members,
                number_of_youth_followers: row.number_of_youth_followers,
                number_of_seniors: row.number_of_seniors,
                number_of_senior_followers: row.number_of_senior_followers,
            },
        })
    }
}

/**
 * DAO for annual report database operations.
 */
pub struct AnnualReportDao {}

impl AnnualReportDao {
    pub fn new() -> Self {
        AnnualReportDao {}
    }

    /**
     * Retrieves an annual report by id.
     *
     * # Returns
     * The report, or `None` if no report has the id.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_by_id(&self, connection: &mut PgConnection, id: i64) -> Result<Option<AnnualReportDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ANNUAL_REPORT} WHERE a.id = $1");
        let row: Option<AnnualReportRow> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get annual report: {err}")))?;
        row.map(AnnualReportDetailType::try_from).transpose()
    }

    /**
     * Retrieves all annual reports, optionally limited to a set of cities.
     *
     * # Arguments
     * `city_ids`: Cities to include, `None` for all cities.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn get_all(&self, connection: &mut PgConnection, city_ids: Option<Vec<i64>>) -> Result<Vec<AnnualReportDetailType>, ApplicationError> {
        let span = tracing::Span::current();
        let query = format!("{SELECT_ANNUAL_REPORT} WHERE ($1::bigint[] IS NULL OR a.city_id = ANY($1)) ORDER BY a.date DESC, a.id DESC");
        let rows: Vec<AnnualReportRow> = sqlx::query_as(&query)
            .bind(city_ids)
            .fetch_all(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get annual reports: {err}")))?;
        rows.into_iter().map(AnnualReportDetailType::try_from).collect()
    }

    /**
     * Checks whether the city has an unconfirmed report or any report dated in `year`.
     */
    #[instrument(skip(self, connection), fields(result))]
    pub async fn is_created(&self, connection: &mut PgConnection, city_id: i64, year: i32) -> Result<bool, ApplicationError> {
        let span = tracing::Span::current();
        let exists: (bool,) = sqlx::query_as(QUERY_REPORT_CREATED)
            .bind(city_id)
            .bind(year)
            .fetch_one(connection)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to check annual report: {err}")))?;
        Ok(exists.0)
    }

    /**
     * Adds a new unconfirmed annual report.
     *
     * # Returns
     * The id of the new report.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn add(&self, transaction: &mut PgConnection, creator_id: &str, date: DateTime<Utc>, input: AnnualReportAddInputType) -> Result<i64, ApplicationError> {
        let span = tracing::Span::current();
        let statistic = input.members_statistic;
        let id: (i64,) = sqlx::query_as(ADD_ANNUAL_REPORT)
            .bind(input.city_id)
            .bind(creator_id)
            .bind(input.new_city_admin_id)
            .bind(input.new_city_legal_status)
            .bind(date)
            .bind(AnnualReportStatus::Unconfirmed.as_str())
            .bind(statistic.number_of_children)
            .bind(statistic.number_of_juniors)
            .bind(statistic.number_of_youth_members)
            .bind(statistic.number_of_youth_followers)
            .bind(statistic.number_of_seniors)
            .bind(statistic.number_of_senior_followers)
            .fetch_one(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        Ok(id.0)
    }

    /**
     * Updates the editable fields of an annual report.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update(&self, transaction: &mut PgConnection, id: i64, input: AnnualReportEditInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let statistic = input.members_statistic;
        let result = sqlx::query(UPDATE_ANNUAL_REPORT)
            .bind(input.new_city_admin_id)
            .bind(input.new_city_legal_status)
            .bind(statistic.number_of_children)
            .bind(statistic.number_of_juniors)
            .bind(statistic.number_of_youth_members)
            .bind(statistic.number_of_youth_followers)
            .bind(statistic.number_of_seniors)
            .bind(statistic.number_of_senior_followers)
            .bind(id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err))?;
        expect_single_row(result.rows_affected(), "Annual report")
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn update_status(&self, transaction: &mut PgConnection, id: i64, status: AnnualReportStatus) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(UPDATE_STATUS)
            .bind(status.as_str())
            .bind(id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to update annual report status: {err}")))?;
        expect_single_row(result.rows_affected(), "Annual report")
    }

    /**
     * Moves the currently confirmed report of a city, if any, to saved.
     */
    #[instrument(skip(self, transaction), fields(result))]
    pub async fn save_last_confirmed(&self, transaction: &mut PgConnection, city_id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(SAVE_LAST_CONFIRMED)
            .bind(city_id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to save confirmed annual report: {err}")))?;
        tracing::debug!("Saved {} confirmed annual reports for city {}", result.rows_affected(), city_id);
        Ok(())
    }

    #[instrument(skip(self, transaction), fields(result))]
    pub async fn delete(&self, transaction: &mut PgConnection, id: i64) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let result = sqlx::query(DELETE_ANNUAL_REPORT)
            .bind(id)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to delete annual report: {err}")))?;
        expect_single_row(result.rows_affected(), "Annual report")
    }
}

#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use chrono::Datelike;
    use sqlx::PgPool;

    use super::*;
    use crate::dao::test_support::{init_db, insert_city, insert_user};

    #[sqlx::test]
    async fn test_add_confirm_and_save_annual_report() {
        let pool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let dao = AnnualReportDao::new();
        let user_id = insert_user(&mut transaction, "report-user").await;
        let city_id = insert_city(&mut transaction, "Report City").await;
        let now = Utc::now();
        let input = AnnualReportAddInputType { city_id, new_city_admin_id: None, new_city_legal_status: "registered".to_string(), members_statistic: MembersStatistic::default() };

        assert!(!dao.is_created(&mut transaction, city_id, now.year()).await.unwrap());
        let first = dao.add(&mut transaction, &user_id, now, input.clone()).await.unwrap();
        assert!(dao.is_created(&mut transaction, city_id, now.year()).await.unwrap());

        dao.update_status(&mut transaction, first, AnnualReportStatus::Confirmed).await.unwrap();
        let second = dao.add(&mut transaction, &user_id, now - chrono::Duration::days(400), input).await.unwrap();
        dao.save_last_confirmed(&mut transaction, city_id).await.unwrap();
        dao.update_status(&mut transaction, second, AnnualReportStatus::Confirmed).await.unwrap();

        let first_report = dao.get_by_id(&mut transaction, first).await.unwrap().unwrap();
        assert_eq!(first_report.status, AnnualReportStatus::Saved);
        let all = dao.get_all(&mut transaction, Some(vec![city_id])).await.unwrap();
        assert_eq!(all.len(), 2);
        transaction.rollback().await.unwrap();
    }

    #[sqlx::test]
    async fn test_delete_missing_annual_report() {
        let pool: PgPool = init_db().await;
        let mut transaction = pool.begin().await.unwrap();
        let result = AnnualReportDao::new().delete(&mut transaction, -1).await;
        assert_eq!(result.unwrap_err().error_type, ErrorType::NotFound);
        transaction.rollback().await.unwrap();
    }
}
