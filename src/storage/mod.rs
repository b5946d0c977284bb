use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub mod device_repo;
pub mod notification_repo;
pub mod records;
pub mod registry;
pub mod service_repo;

pub type DbPool = Pool<Postgres>;

/// Initializes the database connection pool.
///
/// # Errors
/// Returns `sqlx::Error` if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(20).connect(database_url).await
}

/// Applies pending migrations.
///
/// # Errors
/// Returns a migration error if the schema cannot be brought up to date.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(pool).await
}
