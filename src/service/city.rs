use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use tracing::instrument;

use crate::{
    dao::city::CityDao,
    model::{
        apperror::ApplicationError,
        models::{AdministrationDetailType, AuthenticatedUser, CityDetailType, CityInputType, CityProfileType, ListOutputType, MemberDetailType, PaginationInput},
    },
    service::{
        access::{AccessService, scope_filter},
        transaction::{acquire, begin, finish},
    },
};

/**
 * Service for cities and their members.
 */
pub struct CityService {
    city_dao: CityDao,
    access_service: Arc<AccessService>,
    connection_pool: Option<Pool<Postgres>>,
}

impl CityService {
    pub fn new(city_dao: CityDao, access_service: Arc<AccessService>, connection_pool: Option<Pool<Postgres>>) -> Self {
        CityService { city_dao, access_service, connection_pool }
    }

    async fn get_existing(&self, connection: &mut PgConnection, city_id: i64) -> Result<CityDetailType, ApplicationError> {
        self.city_dao.get_by_id(connection, city_id).await?.ok_or_else(|| ApplicationError::not_found("City"))
    }

    pub async fn list(&self, pagination_input: PaginationInput, name: Option<String>) -> Result<ListOutputType<CityDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let (cities, pagination) = self.city_dao.get_city_list(&mut connection, pagination_input, name).await?;
        Ok(ListOutputType::new(cities, pagination))
    }

    /**
     * Cities the user has access to.
     */
    pub async fn get_cities(&self, user: &AuthenticatedUser) -> Result<Vec<CityDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let scope = self.access_service.get_city_scope(&mut connection, user).await?;
        self.city_dao.get_cities(&mut connection, scope_filter(&scope)).await
    }

    pub async fn has_access(&self, user: &AuthenticatedUser, city_id: i64) -> Result<bool, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_existing(&mut connection, city_id).await?;
        self.access_service.has_city_access(&mut connection, user, city_id).await
    }

    /**
     * Retrieves a city with its current administration, members and followers.
     */
    pub async fn get_profile(&self, city_id: i64) -> Result<CityProfileType, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        let city = self.get_existing(&mut connection, city_id).await?;
        let admins = self.city_dao.get_current_administrations(&mut connection, city_id, None, Utc::now()).await?;
        let members = self.city_dao.get_members(&mut connection, city_id, true).await?;
        let followers = self.city_dao.get_members(&mut connection, city_id, false).await?;
        Ok(CityProfileType { city, admins, members, followers })
    }

    pub async fn get_members(&self, city_id: i64) -> Result<Vec<MemberDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_existing(&mut connection, city_id).await?;
        self.city_dao.get_members(&mut connection, city_id, true).await
    }

    pub async fn get_followers(&self, city_id: i64) -> Result<Vec<MemberDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_existing(&mut connection, city_id).await?;
        self.city_dao.get_members(&mut connection, city_id, false).await
    }

    pub async fn get_admins(&self, city_id: i64) -> Result<Vec<AdministrationDetailType>, ApplicationError> {
        let mut connection = acquire(&self.connection_pool).await?;
        self.get_existing(&mut connection, city_id).await?;
        self.city_dao.get_current_administrations(&mut connection, city_id, None, Utc::now()).await
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, user: &AuthenticatedUser, input: CityInputType) -> Result<i64, ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<i64, ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            self.city_dao.add(&mut transaction, input).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, user: &AuthenticatedUser, city_id: i64, input: CityInputType) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.get_existing(&mut transaction, city_id).await?;
            self.access_service.ensure_city_access(&mut transaction, user, city_id).await?;
            self.city_dao.update(&mut transaction, city_id, input).await
        }
        .await;
        finish(transaction, result).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, user: &AuthenticatedUser, city_id: i64) -> Result<(), ApplicationError> {
        let mut transaction = begin(&self.connection_pool).await?;
        let result: Result<(), ApplicationError> = async {
            self.access_service.ensure_admin(&mut transaction, user).await?;
            self.city_dao.delete(&mut transaction, city_id).await
        }
        .await;
        finish(transaction, result).await
    }
}
