use std::sync::Arc;

use chrono::{Datelike, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::{annual_report::AnnualReportDao, city::CityDao},
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{AnnualReportAddInputType, AnnualReportDetailType, AnnualReportEditInputType, AuthenticatedUser},
    },
    service::{
        access::{AccessService, scope_filter},
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for annual reports of cities.
 *
 * Every operation is limited to reports of cities the user has access to.
 */
pub struct AnnualReportService {
    annual_report_dao: AnnualReportDao,
    city_dao: CityDao,
    access_service: Arc<AccessService>,
    /**
     * Optional connection pool for database operations. Optional for test purposes.
     */
    connection_pool: Option<Pool<Postgres>>,
}

impl AnnualReportService {
    pub fn new(annual_report_dao: AnnualReportDao, city_dao: CityDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        AnnualReportService { annual_report_dao, city_dao, access_service, connection_pool }
    }

    /**
     * Fetches a report and checks access to its city.
     */
    async fn get_accessible(&self, connection: &mut PgConnection, user: &AuthenticatedUser, id: i64) -> Result<AnnualReportDetailType, ApplicationError> {
        let report = self.annual_report_dao.get_by_id(connection, id).await?.ok_or_else(|| ApplicationError::not_found("Annual report"))?;
        self.access_service.ensure_city_access(connection, user, report.city_id).await?;
        Ok(report)
    }

    pub async fn get_by_id(&self, user: &AuthenticatedUser, id: i64) -> Result<AnnualReportDetailType, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_accessible(&mut connection, user, id).await
    }

    /**
     * Retrieves the reports of all cities the user has access to.
     */
    pub async fn get_all(&self, user: &AuthenticatedUser) -> Result<Vec<AnnualReportDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let scope = self.access_service.get_city_scope(&mut connection, user).await?;
        self.annual_report_dao.get_all(&mut connection, scope_filter(&scope)).await
    }

    /**
     * Creates an unconfirmed report for a city, dated now, with the user as creator.
     *
     * # Returns
     * The id of the new report, or `InvalidOperation` when the city already has an unconfirmed report or a report this year.
     */
    #[instrument(skip(self, input), fields(city_id = input.city_id))]
    pub async fn create(&self, user: &AuthenticatedUser, input: AnnualReportAddInputType) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            let now = Utc::now();
            if self.city_dao.get_by_id(&mut transaction, input.city_id).await?.is_none() {
                return Err(ApplicationError::not_found("City"));
            }
            self.access_service.ensure_city_access(&mut transaction, user, input.city_id).await?;
            if self.annual_report_dao.is_created(&mut transaction, input.city_id, now.year()).await? {
                return Err(ApplicationError::new(ErrorType::InvalidOperation, "An annual report for this city has already been created".to_string()));
            }
            self.annual_report_dao.add(&mut transaction, &user.id, now, input).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Edits an unconfirmed report. City, creator and date of the input must match the stored report.
     */
    #[instrument(skip(self, input))]
    pub async fn edit(&self, user: &AuthenticatedUser, id: i64, input: AnnualReportEditInputType) -> Result<(), ApplicationError> {
        input.status.ensure_unconfirmed("edit")?;
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let report = self.get_accessible(&mut transaction, user, id).await?;
            report.status.ensure_unconfirmed("edit")?;
            if !input.matches(&report) {
                return Err(ApplicationError::new(ErrorType::InvalidOperation, "Annual report does not match the edited report".to_string()));
            }
            self.annual_report_dao.update(&mut transaction, id, input).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Confirms a report. The previously confirmed report of the city is moved to saved.
     */
    #[instrument(skip(self))]
    pub async fn confirm(&self, user: &AuthenticatedUser, id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let report = self.get_accessible(&mut transaction, user, id).await?;
            let status = report.status.confirm()?;
            self.annual_report_dao.save_last_confirmed(&mut transaction, report.city_id).await?;
            self.annual_report_dao.update_status(&mut transaction, id, status).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, user: &AuthenticatedUser, id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let report = self.get_accessible(&mut transaction, user, id).await?;
            let status = report.status.cancel()?;
            self.annual_report_dao.update_status(&mut transaction, id, status).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user: &AuthenticatedUser, id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            let report = self.get_accessible(&mut transaction, user, id).await?;
            report.status.ensure_unconfirmed("delete")?;
            self.annual_report_dao.delete(&mut transaction, id).await
        }
        .await;
        finish(transaction, result).await
    }

    /**
     * Whether a new report for the city would be rejected.
     */
    pub async fn check_created(&self, user: &AuthenticatedUser, city_id: i64) -> Result<bool, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        if self.city_dao.get_by_id(&mut connection, city_id).await?.is_none() {
            return Err(ApplicationError::not_found("City"));
        }
        self.access_service.ensure_city_access(&mut connection, user, city_id).await?;
        self.annual_report_dao.is_created(&mut connection, city_id, Utc::now().year()).await
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use crate::dao::{
        club::ClubDao,
        test_support::{init_db, insert_city, insert_user},
        user::UserDao,
    };
    use crate::model::models::MembersStatistic;

    #[sqlx::test]
    async fn test_second_report_in_same_year_is_rejected() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let user_id = insert_user(&mut connection, &format!("report-creator-{}", uuid::Uuid::new_v4())).await;
        let city_id = insert_city(&mut connection, &format!("Report City {}", uuid::Uuid::new_v4())).await;
        drop(connection);
        let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
        let service = AnnualReportService::new(AnnualReportDao::new(), CityDao::new(), access_service, Some(pool.clone()));
        let user = AuthenticatedUser::new(user_id, None, true);
        let input = AnnualReportAddInputType { city_id, new_city_admin_id: None, new_city_legal_status: "Registered".to_string(), members_statistic: MembersStatistic::default() };
        let id = service.create(&user, input.clone()).await.unwrap();
        assert!(service.check_created(&user, city_id).await.unwrap());
        assert_eq!(service.create(&user, input).await.unwrap_err().error_type, ErrorType::InvalidOperation);
        service.confirm(&user, id).await.unwrap();
        assert_eq!(service.delete(&user, id).await.unwrap_err().error_type, ErrorType::InvalidOperation);
        service.cancel(&user, id).await.unwrap();
        service.delete(&user, id).await.unwrap();
    }

    async fn insert_city_head(connection: &mut PgConnection, user_id: &str, city_id: i64) {
        sqlx::query("INSERT INTO city_administrations (user_id, city_id, admin_type_id, start_date) SELECT $1, $2, id, now() - interval '1 day' FROM admin_types WHERE name = 'City Head'")
            .bind(user_id)
            .bind(city_id)
            .execute(connection)
            .await
            .unwrap();
    }

    #[sqlx::test]
    async fn test_reports_limited_to_city_administration() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let suffix = uuid::Uuid::new_v4();
        let head_id = insert_user(&mut connection, &format!("report-head-{suffix}")).await;
        let stranger_id = insert_user(&mut connection, &format!("report-stranger-{suffix}")).await;
        let city_id = insert_city(&mut connection, &format!("Administered City {suffix}")).await;
        insert_city_head(&mut connection, &head_id, city_id).await;
        drop(connection);
        let access_service = Arc::new(AccessService::new(CityDao::new(), ClubDao::new(), UserDao::new()));
        let service = AnnualReportService::new(AnnualReportDao::new(), CityDao::new(), access_service, Some(pool.clone()));
        let head = AuthenticatedUser::new(head_id, None, false);
        let stranger = AuthenticatedUser::new(stranger_id, None, false);
        let input = AnnualReportAddInputType { city_id, new_city_admin_id: None, new_city_legal_status: "Registered".to_string(), members_statistic: MembersStatistic::default() };

        assert_eq!(service.create(&stranger, input.clone()).await.unwrap_err().error_type, ErrorType::Forbidden);
        let id = service.create(&head, input).await.unwrap();
        assert_eq!(service.get_by_id(&head, id).await.unwrap().city_id, city_id);
        assert!(service.get_all(&head).await.unwrap().iter().any(|report| report.id == id));

        assert_eq!(service.get_by_id(&stranger, id).await.unwrap_err().error_type, ErrorType::Forbidden);
        assert!(service.get_all(&stranger).await.unwrap().iter().all(|report| report.id != id));
        assert_eq!(service.check_created(&stranger, city_id).await.unwrap_err().error_type, ErrorType::Forbidden);
        assert_eq!(service.confirm(&stranger, id).await.unwrap_err().error_type, ErrorType::Forbidden);
        assert_eq!(service.delete(&stranger, id).await.unwrap_err().error_type, ErrorType::Forbidden);

        service.confirm(&head, id).await.unwrap();
        assert_eq!(service.cancel(&stranger, id).await.unwrap_err().error_type, ErrorType::Forbidden);
        service.cancel(&head, id).await.unwrap();
        service.delete(&head, id).await.unwrap();
    }
}
