use sqlx::{PgConnection, PgPool};

/**
 * Initialize the database connection pool.
 */
pub async fn init_db() -> PgPool {
    dotenv::from_filename("./sqlx-postgresql-migration/.env-test").ok();
    let pool = PgPool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap();
    sqlx::migrate!("./sqlx-postgresql-migration/migrations").run(&pool).await.unwrap();
    pool
}

pub async fn insert_user(connection: &mut PgConnection, id: &str) -> String {
    sqlx::query("INSERT INTO users (id, email, first_name, last_name) VALUES ($1, $2, 'Test', 'User')")
        .bind(id)
        .bind(format!("{id}@example.org"))
        .execute(connection)
        .await
        .unwrap();
    id.to_string()
}

pub async fn insert_region(connection: &mut PgConnection, name: &str) -> i64 {
    let id: (i64,) = sqlx::query_as("INSERT INTO regions (name) VALUES ($1) RETURNING id").bind(name).fetch_one(connection).await.unwrap();
    id.0
}

pub async fn insert_city(connection: &mut PgConnection, name: &str) -> i64 {
    let region_id = insert_region(&mut *connection, &format!("{name} Region")).await;
    let id: (i64,) = sqlx::query_as("INSERT INTO cities (name, region_id) VALUES ($1, $2) RETURNING id").bind(name).bind(region_id).fetch_one(connection).await.unwrap();
    id.0
}

pub async fn insert_club(connection: &mut PgConnection, name: &str) -> i64 {
    let id: (i64,) = sqlx::query_as("INSERT INTO clubs (name) VALUES ($1) RETURNING id").bind(name).fetch_one(connection).await.unwrap();
    id.0
}
